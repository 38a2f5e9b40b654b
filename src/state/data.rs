/// Shared data structures for the editor state
///
/// These structs represent the data model that flows between the session
/// state machine and the UI layer reading its projection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::edit::EditOperation;

/// An immutable, URL-addressable image artifact
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: String,
    /// Locally-resolvable handle to the encoded bitmap
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// Marker for the asset type tag
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetKind {
    #[default]
    #[serde(rename = "photo-edit")]
    PhotoEdit,
}

/// Metadata describing one successful save
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoEditSession {
    pub original_image_url: String,
    pub final_image_url: String,
    /// Snapshot of the history at save time
    pub operations: Vec<EditOperation>,
    /// Time between the first recorded operation and the save
    pub duration: Duration,
}

/// An asset produced by saving a photo edit
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoEditAsset {
    #[serde(flatten)]
    pub asset: Asset,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub photo_edit_metadata: PhotoEditSession,
    /// MIME type of the encoded payload
    pub mime_type: String,
    /// The surface had no bitmap and the payload is an empty image
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub blank_capture: bool,
}

impl PhotoEditAsset {
    pub fn id(&self) -> &str {
        &self.asset.id
    }

    pub fn url(&self) -> &str {
        &self.asset.url
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Progress overlay shown while a save or reset runs
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoadingState {
    pub is_loading: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Percentage, 0-100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl LoadingState {
    /// Not loading
    pub fn idle() -> Self {
        Self::default()
    }

    /// Start a new operation at 0%
    pub fn begin(message: impl Into<String>) -> Self {
        Self {
            is_loading: true,
            message: Some(message.into()),
            progress: Some(0),
        }
    }

    /// Move to a later checkpoint. Progress never goes backwards within one
    /// operation; a lower value keeps the current percentage.
    pub fn advance(&mut self, message: impl Into<String>, progress: u8) {
        let progress = progress.min(100);
        let current = self.progress.unwrap_or(0);
        if progress < current {
            tracing::warn!(current, requested = progress, "ignoring loading progress regression");
        }
        self.is_loading = true;
        self.message = Some(message.into());
        self.progress = Some(progress.max(current));
    }

    pub fn is_complete(&self) -> bool {
        self.is_loading && self.progress == Some(100)
    }
}

/// Control panel shown beside the edit surface
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EditorPanel {
    #[default]
    Color,
    Transform,
    Filters,
    Export,
}

impl EditorPanel {
    /// Panel order used when cycling
    pub const ALL: [EditorPanel; 4] = [
        EditorPanel::Color,
        EditorPanel::Transform,
        EditorPanel::Filters,
        EditorPanel::Export,
    ];

    fn index(self) -> usize {
        match self {
            EditorPanel::Color => 0,
            EditorPanel::Transform => 1,
            EditorPanel::Filters => 2,
            EditorPanel::Export => 3,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_progress_is_monotonic() {
        let mut loading = LoadingState::begin("Saving edited image...");
        loading.advance("Capturing edited image...", 40);
        loading.advance("Late checkpoint", 20);

        assert_eq!(loading.progress, Some(40));
        assert_eq!(loading.message.as_deref(), Some("Late checkpoint"));
        assert!(!loading.is_complete());

        loading.advance("Save complete!", 100);
        assert!(loading.is_complete());
    }

    #[test]
    fn test_idle_loading_serializes_flat() {
        let json = serde_json::to_value(LoadingState::idle()).unwrap();
        assert_eq!(json, serde_json::json!({ "isLoading": false }));
    }

    #[test]
    fn test_panel_cycle() {
        assert_eq!(EditorPanel::default(), EditorPanel::Color);
        assert_eq!(EditorPanel::Export.next(), EditorPanel::Color);
        assert_eq!(EditorPanel::Color.previous(), EditorPanel::Export);
        assert_eq!(EditorPanel::Transform.next(), EditorPanel::Filters);
    }

    #[test]
    fn test_photo_edit_asset_json_shape() {
        let asset = PhotoEditAsset {
            asset: Asset {
                id: "edited-a-1-0".to_string(),
                url: "blob:photo-editor/1".to_string(),
                created_at: Utc::now(),
            },
            kind: AssetKind::PhotoEdit,
            photo_edit_metadata: PhotoEditSession {
                original_image_url: "photo.png".to_string(),
                final_image_url: "blob:photo-editor/1".to_string(),
                operations: Vec::new(),
                duration: Duration::ZERO,
            },
            mime_type: "image/png".to_string(),
            blank_capture: false,
        };

        let json: serde_json::Value = serde_json::from_str(&asset.to_json().unwrap()).unwrap();
        assert_eq!(json["type"], "photo-edit");
        assert_eq!(json["id"], "edited-a-1-0");
        assert_eq!(json["photoEditMetadata"]["originalImageUrl"], "photo.png");
    }
}
