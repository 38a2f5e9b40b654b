/// Photo editor core
///
/// Session lifecycle and capture/export pipeline for an image editor embedded
/// in a host application:
/// - Editing session state machine with confirmation gates (state/)
/// - Capture of the rendered surface into an encoded image (capture/)
/// - Synthesis of the capture into a new asset (asset.rs)
/// - Export configuration (config.rs) and error taxonomy (error.rs)

pub mod asset;
pub mod capture;
pub mod config;
pub mod error;
pub mod state;

pub use capture::engine::{Blob, CaptureOutput};
pub use capture::surface::{RasterSurface, RenderSurface};
pub use config::{Dimensions, EditorConfig, Quality};
pub use error::{CaptureError, ErrorKind, PhotoEditorError, RetryAction, SurfaceError};
pub use state::data::{EditorPanel, LoadingState, PhotoEditAsset, PhotoEditSession};
pub use state::edit::{EditOperation, EditingHistory, Transform};
pub use state::gate::{ConfirmationPrompt, PromptVariant};
pub use state::session::{
    AppStore, CloseOutcome, EditorMessage, EditorProjection, EditorState, MemoryStore,
    PendingAction, PhotoEditor, SaveOutcome,
};
