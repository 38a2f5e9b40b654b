/// Photo-edit session state machine
///
/// `PhotoEditor` owns everything about one open-edit-close cycle: the edit
/// history, the unsaved-changes flag, the current error and the loading
/// overlay. UI code sends it events (directly or as `EditorMessage`s) and
/// reads back an immutable `EditorProjection`; it never touches fields.
///
/// Save and reset are the only long-running transitions. They take `&mut self`,
/// so at most one of them can be in flight, and both refuse to start while the
/// loading overlay from a previous run is still showing.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::{Duration, Instant};

use super::data::{EditorPanel, LoadingState, PhotoEditAsset, PhotoEditSession};
use super::edit::{EditOperation, EditingHistory};
use super::gate::{ConfirmationGate, ConfirmationPrompt, Outcome};
use crate::asset::{self, BlobStore};
use crate::capture::engine::{self, Blob};
use crate::capture::format::{resolve_output_mime, OutputFormat};
use crate::capture::surface::RenderSurface;
use crate::config::{Dimensions, EditorConfig, Quality};
use crate::error::{PhotoEditorError, RetryAction, SaveError, SurfaceError};

/// How long the "complete" overlay stays up after a save or reset
pub const LOADING_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Originating id used when the opened image has no asset id
pub const UNKNOWN_ASSET_ID: &str = "unknown";

/// Global application state the editor reports saved assets to
pub trait AppStore {
    /// Replace the image currently displayed by the app with `asset`
    fn replace_canvas_image(&mut self, asset: &PhotoEditAsset);
}

/// In-memory `AppStore` holding the displayed image and saved asset ids
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    canvas_image: Option<String>,
    asset_ids: Vec<String>,
}

impl MemoryStore {
    pub fn canvas_image(&self) -> Option<&str> {
        self.canvas_image.as_deref()
    }

    pub fn asset_ids(&self) -> &[String] {
        &self.asset_ids
    }
}

impl AppStore for MemoryStore {
    fn replace_canvas_image(&mut self, asset: &PhotoEditAsset) {
        self.canvas_image = Some(asset.url().to_string());
        self.asset_ids.push(asset.id().to_string());
    }
}

/// Called once per successful save with the final URL and session metadata
pub type SaveCallback = Box<dyn FnMut(&str, &PhotoEditSession) + Send>;

/// Destructive transition waiting on the confirmation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    Close,
    Reset,
}

/// Coarse state of the editor, derived from its fields
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EditorState {
    Closed,
    Clean,
    Dirty,
    Saving,
    Resetting,
    ConfirmClose,
    ConfirmReset,
}

/// Long-running transition owning the loading overlay
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Activity {
    Saving,
    Resetting,
}

/// Result of a save request
#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    /// Check `PhotoEditAsset::blank_capture` before showing the result
    Saved(PhotoEditAsset),
    /// An error is now current: `save-failure`, or the mount error that
    /// left the surface unusable
    Failed,
    /// A save or reset overlay is still showing; nothing happened
    Busy,
}

/// Result of a close request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    NeedsConfirmation,
    AlreadyClosed,
}

/// UI events the editor understands
#[derive(Debug, Clone, PartialEq)]
pub enum EditorMessage {
    Open {
        image_url: String,
        asset_id: Option<String>,
    },
    Record(EditOperation),
    SelectPanel(EditorPanel),
    NextPanel,
    PreviousPanel,
    Save,
    RequestReset,
    RequestClose,
    Confirm,
    Cancel,
    Retry,
    DismissError,
}

/// Immutable view of the editor for the UI layer
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EditorProjection {
    pub state: EditorState,
    pub is_open: bool,
    pub current_image_url: Option<String>,
    pub has_unsaved_changes: bool,
    pub operation_count: usize,
    pub active_panel: EditorPanel,
    pub error: Option<PhotoEditorError>,
    pub loading: LoadingState,
    pub confirmation: Option<ConfirmationPrompt>,
}

#[derive(Debug, Clone)]
struct CurrentError {
    error: PhotoEditorError,
    raised_at: Instant,
}

/// The photo-edit session
pub struct PhotoEditor<S: AppStore> {
    store: S,
    config: EditorConfig,
    is_open: bool,
    /// URL the session was opened with
    source_url: Option<String>,
    /// URL currently displayed; swapped to the asset URL after each save
    image_url: Option<String>,
    asset_id: Option<String>,
    history: EditingHistory,
    has_unsaved_changes: bool,
    active_panel: EditorPanel,
    gate: ConfirmationGate<PendingAction>,
    error: Option<CurrentError>,
    loading: LoadingState,
    activity: Option<Activity>,
    loading_settles_at: Option<Instant>,
    surface: Option<Box<dyn RenderSurface>>,
    surface_mounted: bool,
    blobs: BlobStore,
    saved_assets: Vec<PhotoEditAsset>,
    on_save: Option<SaveCallback>,
    /// Every checkpoint of the current loading run
    #[cfg(test)]
    progress_log: Vec<u8>,
}

impl<S: AppStore> PhotoEditor<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            config: EditorConfig::default(),
            is_open: false,
            source_url: None,
            image_url: None,
            asset_id: None,
            history: EditingHistory::new(),
            has_unsaved_changes: false,
            active_panel: EditorPanel::default(),
            gate: ConfirmationGate::new(),
            error: None,
            loading: LoadingState::idle(),
            activity: None,
            loading_settles_at: None,
            surface: None,
            surface_mounted: false,
            blobs: BlobStore::new(),
            saved_assets: Vec::new(),
            on_save: None,
            #[cfg(test)]
            progress_log: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: EditorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_save(mut self, callback: impl FnMut(&str, &PhotoEditSession) + Send + 'static) -> Self {
        self.on_save = Some(Box::new(callback));
        self
    }

    // ========== Read access ==========

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn history(&self) -> &EditingHistory {
        &self.history
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    pub fn current_image_url(&self) -> Option<&str> {
        self.image_url.as_deref()
    }

    pub fn current_error(&self) -> Option<&PhotoEditorError> {
        self.error.as_ref().map(|current| &current.error)
    }

    pub fn loading(&self) -> &LoadingState {
        &self.loading
    }

    pub fn active_panel(&self) -> EditorPanel {
        self.active_panel
    }

    pub fn pending_confirmation(&self) -> Option<PendingAction> {
        self.gate.pending().copied()
    }

    /// Assets saved by this editor and not yet released
    pub fn saved_assets(&self) -> &[PhotoEditAsset] {
        &self.saved_assets
    }

    /// Encoded payload behind a saved asset's URL
    pub fn resolve_blob(&self, url: &str) -> Option<&Blob> {
        self.blobs.resolve(url)
    }

    pub fn state(&self) -> EditorState {
        if !self.is_open {
            return EditorState::Closed;
        }
        match (self.gate.pending(), self.activity) {
            (Some(PendingAction::Close), _) => EditorState::ConfirmClose,
            (Some(PendingAction::Reset), _) => EditorState::ConfirmReset,
            (None, Some(Activity::Saving)) => EditorState::Saving,
            (None, Some(Activity::Resetting)) => EditorState::Resetting,
            (None, None) if self.has_unsaved_changes => EditorState::Dirty,
            (None, None) => EditorState::Clean,
        }
    }

    pub fn projection(&self) -> EditorProjection {
        EditorProjection {
            state: self.state(),
            is_open: self.is_open,
            current_image_url: self.image_url.clone(),
            has_unsaved_changes: self.has_unsaved_changes,
            operation_count: self.history.len(),
            active_panel: self.active_panel,
            error: self.current_error().cloned(),
            loading: self.loading.clone(),
            confirmation: self.gate.prompt().cloned(),
        }
    }

    // ========== Session lifecycle ==========

    /// Open the editor on `image_url`
    pub fn open(&mut self, image_url: impl Into<String>, asset_id: Option<String>) {
        let image_url = image_url.into();
        tracing::info!(image_url = %image_url, asset_id = ?asset_id, "opening photo editor");

        self.is_open = true;
        self.source_url = Some(image_url.clone());
        self.image_url = Some(image_url);
        self.asset_id = asset_id;
        self.history.clear();
        self.has_unsaved_changes = false;
        self.active_panel = EditorPanel::default();
        self.gate.cancel();
        self.error = None;
        self.clear_loading();

        if self.surface.is_some() {
            self.mount_surface();
        }
    }

    /// Attach the render surface the editor captures from, mounting it if a
    /// session is open
    pub fn attach_surface(&mut self, surface: Box<dyn RenderSurface>) {
        self.surface = Some(surface);
        self.surface_mounted = false;
        if self.is_open {
            self.mount_surface();
        }
    }

    pub fn detach_surface(&mut self) -> Option<Box<dyn RenderSurface>> {
        self.surface_mounted = false;
        self.surface.take()
    }

    fn mount_surface(&mut self) {
        let Some(source_url) = self.source_url.clone().filter(|url| !url.is_empty()) else {
            return;
        };
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        match surface.mount(&source_url, self.config.output_mime.as_deref()) {
            Ok(()) => {
                // Bring a remounted surface back in line with the history
                for operation in self.history.operations() {
                    if let Err(err) = surface.apply_adjustment(operation) {
                        tracing::warn!(%err, kind = %operation.kind, "could not replay adjustment");
                    }
                }
                self.surface_mounted = true;
            }
            Err(SurfaceError::Initialization(details)) => {
                tracing::error!(%details, "render surface failed to initialize");
                self.surface_mounted = false;
                self.raise(PhotoEditorError::sdk_load(details));
            }
            Err(err) => {
                tracing::error!(%err, source_url = %source_url, "source image failed to load");
                self.surface_mounted = false;
                self.raise(PhotoEditorError::image_load(&source_url));
            }
        }
    }

    /// Append an adjustment from a control panel
    ///
    /// Returns false when the event is ignored (editor closed or busy).
    pub fn record_operation(&mut self, operation: EditOperation) -> bool {
        if !self.is_open {
            tracing::debug!(kind = %operation.kind, "ignoring operation, editor is closed");
            return false;
        }
        if self.loading.is_loading {
            tracing::debug!(kind = %operation.kind, "ignoring operation while loading");
            return false;
        }

        if self.surface_mounted {
            if let Some(surface) = self.surface.as_mut() {
                if let Err(err) = surface.apply_adjustment(&operation) {
                    tracing::warn!(%err, kind = %operation.kind, "render surface rejected adjustment");
                }
            }
        }

        self.history.push(operation);
        self.has_unsaved_changes = true;
        true
    }

    pub fn select_panel(&mut self, panel: EditorPanel) {
        if self.loading.is_loading {
            return;
        }
        self.active_panel = panel;
    }

    pub fn next_panel(&mut self) {
        self.select_panel(self.active_panel.next());
    }

    pub fn previous_panel(&mut self) {
        self.select_panel(self.active_panel.previous());
    }

    // ========== Export options ==========

    pub fn set_output_mime(&mut self, mime: Option<String>) -> bool {
        let value = mime.clone().map_or(serde_json::Value::Null, serde_json::Value::from);
        self.update_config(EditOperation::export_config("outputMime", value), |config| {
            config.output_mime = mime
        })
    }

    pub fn set_quality(&mut self, quality: Quality) -> bool {
        self.update_config(
            EditOperation::export_config("quality", quality.percent()),
            |config| config.quality = quality,
        )
    }

    pub fn set_max_dimensions(&mut self, max: Option<Dimensions>) -> bool {
        let value = serde_json::to_value(max).unwrap_or(serde_json::Value::Null);
        self.update_config(EditOperation::export_config("maxDimensions", value), |config| {
            config.max_dimensions = max
        })
    }

    fn update_config(&mut self, operation: EditOperation, apply: impl FnOnce(&mut EditorConfig)) -> bool {
        if !self.record_operation(operation) {
            return false;
        }
        apply(&mut self.config);
        true
    }

    // ========== Save ==========

    /// Capture the edit surface and commit it as a new asset
    ///
    /// Failures never escape: they become the current `save-failure` error.
    pub async fn save(&mut self) -> SaveOutcome {
        self.tick(Instant::now());
        if self.loading.is_loading {
            tracing::debug!("ignoring save while loading");
            return SaveOutcome::Busy;
        }

        let image_url = match self.image_url.clone().filter(|url| !url.is_empty()) {
            Some(url) => url,
            None => return self.save_not_ready("Missing image URL"),
        };
        if self.surface.is_none() {
            return self.save_not_ready("Missing render surface");
        }
        if !self.surface_mounted {
            // A failed mount already raised the error that explains this
            if self.error.is_some() {
                tracing::warn!("render surface is not mounted, refusing to save");
                return SaveOutcome::Failed;
            }
            return self.save_not_ready("Render surface not mounted");
        }
        let source_url = self.source_url.clone().unwrap_or_else(|| image_url.clone());

        self.begin(Activity::Saving, "Saving edited image...");

        match self.run_save(&source_url).await {
            Ok(asset) => {
                self.commit_save(asset.clone());
                SaveOutcome::Saved(asset)
            }
            Err(err) => {
                tracing::error!(%err, "failed to save edited image");
                self.raise(PhotoEditorError::save_failure(
                    "Failed to save the edited image. Please try again.",
                    err.to_string(),
                ));
                self.clear_loading();
                SaveOutcome::Failed
            }
        }
    }

    fn save_not_ready(&mut self, details: &str) -> SaveOutcome {
        tracing::warn!(details, "photo editor is not ready for saving");
        self.raise(PhotoEditorError::save_failure(
            "Photo editor is not ready for saving",
            details,
        ));
        SaveOutcome::Failed
    }

    async fn run_save(&mut self, source_url: &str) -> Result<PhotoEditAsset, SaveError> {
        let config = self.config.clone();

        self.progress("Processing image format...", 20);
        let mime = resolve_output_mime(source_url, config.output_mime.as_deref());
        let format = OutputFormat::from_mime(&mime)?;

        self.progress("Capturing edited image...", 40);
        let pixels = {
            let surface = self
                .surface
                .as_deref()
                .ok_or(SaveError::NotReady("Missing render surface"))?;
            engine::resolve_pixel_source(surface)
        };
        let output = tokio::task::spawn_blocking(move || {
            engine::capture_pixels(pixels, format.mime(), config.quality, config.max_dimensions)
        })
        .await??;
        let blank_capture = output.blank_fallback;
        if blank_capture {
            tracing::warn!("surface had no bitmap, saving a blank image");
        }
        tracing::debug!(
            width = output.final_dimensions.width,
            height = output.final_dimensions.height,
            bytes = output.blob.len(),
            "captured edited image"
        );

        self.progress("Creating asset...", 70);
        let original_asset_id = self.asset_id.as_deref().unwrap_or(UNKNOWN_ASSET_ID);
        let mut asset = asset::synthesize(
            &mut self.blobs,
            original_asset_id,
            output.blob,
            &self.history,
            format.mime(),
        );

        self.progress("Finalizing save...", 90);
        asset.photo_edit_metadata.original_image_url = source_url.to_string();
        asset.photo_edit_metadata.duration = session_duration(&self.history, Utc::now());
        asset.blank_capture = blank_capture;

        Ok(asset)
    }

    fn commit_save(&mut self, asset: PhotoEditAsset) {
        self.image_url = Some(asset.url().to_string());
        self.has_unsaved_changes = false;
        self.error = None;
        self.store.replace_canvas_image(&asset);

        self.progress("Save complete!", 100);
        self.loading_settles_at = Some(Instant::now() + LOADING_SETTLE_DELAY);

        tracing::info!(asset_id = %asset.id(), url = %asset.url(), "photo edit saved");

        if let Some(callback) = self.on_save.as_mut() {
            callback(asset.url(), &asset.photo_edit_metadata);
        }
        self.saved_assets.push(asset);
    }

    /// Drop a saved asset and release its encoded payload
    pub fn release_asset(&mut self, asset_id: &str) -> bool {
        let Some(index) = self.saved_assets.iter().position(|a| a.id() == asset_id) else {
            return false;
        };
        let asset = self.saved_assets.remove(index);
        self.blobs.revoke(asset.url())
    }

    // ========== Reset / close ==========

    /// Ask to discard the edit history. Returns true if the gate is now showing.
    pub fn request_reset(&mut self) -> bool {
        if !self.is_open || !self.has_unsaved_changes || self.loading.is_loading {
            return false;
        }
        self.gate.request(ConfirmationPrompt::reset_changes(), PendingAction::Reset);
        true
    }

    /// Ask to close the editor
    pub fn request_close(&mut self) -> CloseOutcome {
        if !self.is_open {
            return CloseOutcome::AlreadyClosed;
        }
        if self.has_unsaved_changes && !self.loading.is_loading {
            self.gate.request(ConfirmationPrompt::unsaved_changes(), PendingAction::Close);
            return CloseOutcome::NeedsConfirmation;
        }
        self.close_now();
        CloseOutcome::Closed
    }

    /// Confirm the gate, running whatever it was guarding
    pub fn confirm(&mut self) -> Option<PendingAction> {
        self.tick(Instant::now());
        if self.loading.is_loading {
            tracing::debug!("ignoring confirmation while loading");
            return None;
        }
        match self.gate.confirm() {
            Outcome::Confirmed(PendingAction::Close) => {
                self.close_now();
                Some(PendingAction::Close)
            }
            Outcome::Confirmed(PendingAction::Reset) => {
                self.confirm_reset();
                Some(PendingAction::Reset)
            }
            Outcome::Cancelled => None,
        }
    }

    /// Dismiss the gate; the editor stays as it was
    pub fn cancel(&mut self) {
        self.gate.cancel();
    }

    fn confirm_reset(&mut self) -> bool {
        self.begin(Activity::Resetting, "Resetting changes...");

        if let Some(surface) = self.surface.as_mut() {
            if let Err(err) = surface.clear_adjustments() {
                tracing::error!(%err, "failed to reset editor");
                self.raise(PhotoEditorError::reset_failure(err.to_string()));
                self.clear_loading();
                return false;
            }
        }

        self.history.clear();
        self.has_unsaved_changes = false;
        self.progress("Reset complete!", 100);
        self.loading_settles_at = Some(Instant::now() + LOADING_SETTLE_DELAY);

        tracing::info!("editor reset, editing history cleared");
        true
    }

    fn close_now(&mut self) {
        tracing::info!(saved_assets = self.saved_assets.len(), "closing photo editor");

        self.is_open = false;
        self.source_url = None;
        self.image_url = None;
        self.asset_id = None;
        self.history.clear();
        self.has_unsaved_changes = false;
        self.active_panel = EditorPanel::default();
        self.gate.cancel();
        self.error = None;
        self.clear_loading();
        self.detach_surface();
    }

    // ========== Errors ==========

    /// Make `error` the current one, replacing any previous error
    pub fn report_error(&mut self, error: PhotoEditorError) {
        self.raise(error);
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Re-run whatever the current error's retry action points at
    pub async fn retry(&mut self) -> Option<RetryAction> {
        let action = self.current_error()?.retry_action()?;
        self.error = None;
        tracing::info!(?action, "retrying after error");

        match action {
            RetryAction::Save => {
                self.save().await;
            }
            RetryAction::ConfirmReset => {
                self.tick(Instant::now());
                if !self.loading.is_loading {
                    self.confirm_reset();
                }
            }
            RetryAction::RemountSurface => self.mount_surface(),
            RetryAction::Reopen => self.close_now(),
        }
        Some(action)
    }

    fn raise(&mut self, error: PhotoEditorError) {
        self.error = Some(CurrentError {
            error,
            raised_at: Instant::now(),
        });
    }

    // ========== Loading overlay ==========

    fn begin(&mut self, activity: Activity, message: &str) {
        self.activity = Some(activity);
        self.loading = LoadingState::begin(message);
        self.loading_settles_at = None;
        #[cfg(test)]
        {
            self.progress_log = vec![0];
        }
    }

    fn progress(&mut self, message: &str, progress: u8) {
        tracing::debug!(progress, step = message, "loading progress");
        self.loading.advance(message, progress);
        #[cfg(test)]
        self.progress_log.push(progress);
    }

    fn clear_loading(&mut self) {
        self.activity = None;
        self.loading = LoadingState::idle();
        self.loading_settles_at = None;
    }

    /// Advance timers: clear a settled "complete" overlay and auto-dismiss
    /// expired non-recoverable errors
    pub fn tick(&mut self, now: Instant) {
        if self.loading_settles_at.is_some_and(|at| now >= at) {
            self.clear_loading();
        }

        let expired = self.error.as_ref().is_some_and(|current| {
            current
                .error
                .auto_dismiss_after()
                .is_some_and(|after| now >= current.raised_at + after)
        });
        if expired {
            self.error = None;
        }
    }

    // ========== Message dispatch ==========

    /// Route a UI event to the matching transition
    pub async fn update(&mut self, message: EditorMessage) {
        match message {
            EditorMessage::Open { image_url, asset_id } => self.open(image_url, asset_id),
            EditorMessage::Record(operation) => {
                self.record_operation(operation);
            }
            EditorMessage::SelectPanel(panel) => self.select_panel(panel),
            EditorMessage::NextPanel => self.next_panel(),
            EditorMessage::PreviousPanel => self.previous_panel(),
            EditorMessage::Save => {
                self.save().await;
            }
            EditorMessage::RequestReset => {
                self.request_reset();
            }
            EditorMessage::RequestClose => {
                self.request_close();
            }
            EditorMessage::Confirm => {
                self.confirm();
            }
            EditorMessage::Cancel => self.cancel(),
            EditorMessage::Retry => {
                self.retry().await;
            }
            EditorMessage::DismissError => self.dismiss_error(),
        }
    }
}

/// Time from the first recorded operation to `now`; zero for an empty history
pub fn session_duration(history: &EditingHistory, now: DateTime<Utc>) -> Duration {
    history
        .first()
        .and_then(|first| (now - first.timestamp).to_std().ok())
        .unwrap_or(Duration::ZERO)
}

impl<S: AppStore + std::fmt::Debug> std::fmt::Debug for PhotoEditor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoEditor")
            .field("state", &self.state())
            .field("image_url", &self.image_url)
            .field("operations", &self.history.len())
            .field("store", &self.store)
            .finish()
    }
}
