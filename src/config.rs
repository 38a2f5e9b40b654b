/// Export configuration for the photo editor
///
/// The config is an immutable snapshot: the session clones it once at the
/// start of every save attempt, so edits made while a save is running only
/// affect the next save.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default encoder quality, in percent
pub const DEFAULT_QUALITY: u8 = 90;

/// Encoder quality as an integer percentage (1-100)
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(try_from = "u8", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub fn new(percent: u32) -> Result<Self, ConfigError> {
        match percent {
            1..=100 => Ok(Self(percent as u8)),
            _ => Err(ConfigError::QualityOutOfRange(percent)),
        }
    }

    pub fn percent(self) -> u8 {
        self.0
    }

    /// The 0-1 fraction encoders work with
    pub fn as_fraction(self) -> f32 {
        self.0 as f32 / 100.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl TryFrom<u8> for Quality {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value as u32)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

/// A width/height pair in pixels
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Output settings consulted once per save
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    /// Preferred output MIME type; `None` derives it from the source URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_mime: Option<String>,

    #[serde(default)]
    pub quality: Quality,

    /// Bounding box the output is downscaled into, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_dimensions: Option<Dimensions>,
}

impl EditorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_mime(mut self, mime: impl Into<String>) -> Self {
        self.output_mime = Some(mime.into());
        self
    }

    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_max_dimensions(mut self, width: u32, height: u32) -> Self {
        self.max_dimensions = Some(Dimensions::new(width, height));
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from JSON string, validating quality
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_bounds() {
        assert!(Quality::new(0).is_err());
        assert!(Quality::new(101).is_err());
        assert_eq!(Quality::new(1).unwrap().percent(), 1);
        assert_eq!(Quality::new(100).unwrap().as_fraction(), 1.0);
        assert_eq!(Quality::default().percent(), DEFAULT_QUALITY);
    }

    #[test]
    fn test_config_json() {
        let config = EditorConfig::new()
            .with_output_mime("image/png")
            .with_quality(Quality::new(75).unwrap())
            .with_max_dimensions(1920, 1080);

        let json = config.to_json().unwrap();
        assert!(json.contains("\"outputMime\":\"image/png\""));
        assert!(json.contains("\"maxDimensions\""));

        let restored = EditorConfig::from_json(&json).unwrap();
        assert_eq!(config, restored);
    }

    #[test]
    fn test_config_json_rejects_bad_quality() {
        let err = EditorConfig::from_json(r#"{"quality": 0}"#).unwrap_err();
        assert!(err.to_string().contains("quality"));
    }

    #[test]
    fn test_config_json_defaults() {
        let config = EditorConfig::from_json("{}").unwrap();
        assert_eq!(config, EditorConfig::default());
    }
}
