/// Capture module
///
/// Turns whatever a render surface currently shows into encoded bytes:
/// - Output format resolution (format.rs)
/// - The render surface capability and the CPU raster surface (surface.rs)
/// - Readback, downscaling and encoding (engine.rs)

pub mod engine;
pub mod format;
pub mod surface;
