/// Asset Synthesizer
///
/// Turns an encoded capture into a new, independently addressable
/// `PhotoEditAsset`. The encoded bytes live in a `BlobStore` behind a
/// `blob:` handle that stays valid until it is explicitly revoked.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::capture::engine::Blob;
use crate::state::data::{Asset, AssetKind, PhotoEditAsset, PhotoEditSession};
use crate::state::edit::EditingHistory;

/// Prefix of the handles handed out by `BlobStore`
pub const BLOB_URL_PREFIX: &str = "blob:photo-editor/";

/// Process-wide sequence appended to asset ids
static ASSET_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Owner of encoded payloads addressed by `blob:` URLs
///
/// Nothing is freed implicitly: a payload stays alive until `revoke` is called
/// for its URL.
#[derive(Debug, Default)]
pub struct BlobStore {
    blobs: HashMap<String, Blob>,
    next_handle: u64,
}

impl BlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `blob` and return a URL resolving to it
    pub fn create_object_url(&mut self, blob: Blob) -> String {
        self.next_handle += 1;
        let url = format!("{}{}", BLOB_URL_PREFIX, self.next_handle);
        self.blobs.insert(url.clone(), blob);
        url
    }

    pub fn resolve(&self, url: &str) -> Option<&Blob> {
        self.blobs.get(url)
    }

    /// Release the payload behind `url`. Returns false if it was not live.
    pub fn revoke(&mut self, url: &str) -> bool {
        self.blobs.remove(url).is_some()
    }

    /// Number of live payloads
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

/// Derive the id of an edited asset
///
/// `edited-{original}-{unix millis}-{sequence}`: the sequence keeps ids unique
/// when several saves land in the same millisecond.
pub fn derive_asset_id(original_asset_id: &str, created_at: DateTime<Utc>) -> String {
    let sequence = ASSET_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "edited-{}-{}-{}",
        original_asset_id,
        created_at.timestamp_millis(),
        sequence
    )
}

/// Wrap an encoded payload and the current history into a new asset
///
/// The history is copied, so later changes to the live history never reach
/// the returned asset. `original_image_url` and `duration` are left empty for
/// the caller to fill in.
pub fn synthesize(
    store: &mut BlobStore,
    original_asset_id: &str,
    blob: Blob,
    history: &EditingHistory,
    output_mime: &str,
) -> PhotoEditAsset {
    let created_at = Utc::now();
    let id = derive_asset_id(original_asset_id, created_at);
    let url = store.create_object_url(blob);

    tracing::debug!(asset_id = %id, url = %url, operations = history.len(), "synthesized asset");

    PhotoEditAsset {
        asset: Asset {
            id,
            url: url.clone(),
            created_at,
        },
        kind: AssetKind::PhotoEdit,
        photo_edit_metadata: PhotoEditSession {
            original_image_url: String::new(),
            final_image_url: url,
            operations: history.snapshot(),
            duration: Duration::ZERO,
        },
        mime_type: output_mime.to_string(),
        blank_capture: false,
    }
}
