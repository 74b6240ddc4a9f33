//! The avatar editor facade.

use std::fmt;

use crate::config::EditorConfig;
use crate::error::{CaptureError, ConfigError, PickerError, SaveError};
use crate::gesture::{GestureEvent, GestureOutcome, GestureReducer, GestureSet};
use crate::layer::{Compositor, Scene};
use crate::options::{CaptureOptions, PickerMode, PickerOptions};
use crate::services::{
    AlwaysGranted, GalleryDirectory, ImagePicker, MediaStore, PermissionGate, Rasterizer,
    SaveReceipt,
};
use crate::source::ImageSource;
use crate::transform::{ComposedTransform, LiveDelta, TransformState};

type AvatarCallback = Box<dyn Fn(&ImageSource)>;
type CapturedCallback = Box<dyn Fn(&str)>;
type SavedCallback = Box<dyn Fn(&SaveReceipt)>;

/// Caller-supplied notifications. None of their results are consulted.
#[derive(Default)]
struct Callbacks {
    avatar_selected: Option<AvatarCallback>,
    image_captured: Option<CapturedCallback>,
    image_saved: Option<SavedCallback>,
}

/// Editor state that does not depend on the host services.
struct EditorState {
    config: EditorConfig,
    background: [u8; 4],
    default_avatar: ImageSource,
    avatar: ImageSource,
    frame: Option<ImageSource>,
    reducer: GestureReducer,
    surface_ready: bool,
    callbacks: Callbacks,
}

// ============================================================================
// AvatarEditor
// ============================================================================

/// Pick, transform, capture and save an avatar.
///
/// `AvatarEditor` owns the avatar source and the gesture transform state.
/// Everything platform-specific goes through the collaborators:
///
/// - `P`: [`ImagePicker`], always supplied by the host
/// - `R`: [`Rasterizer`], defaults to the built-in [`Compositor`]
/// - `M`: [`MediaStore`], defaults to a [`GalleryDirectory`] under the
///   artifact directory
/// - `G`: [`PermissionGate`], defaults to [`AlwaysGranted`]
///
/// Gesture events are fed in with [`handle_gesture`](Self::handle_gesture);
/// the host renders [`composed_transform`](Self::composed_transform) on every
/// frame.
///
/// # Example
///
/// ```no_run
/// use avatar_editor::{
///     AvatarEditor, CaptureOptions, EditorConfig, GestureEvent, GesturePhase, ImagePicker,
///     ImageSource, PickedImage, PickerError, PickerOptions,
/// };
///
/// struct HostPicker;
///
/// impl ImagePicker for HostPicker {
///     async fn show(&self, _options: &PickerOptions) -> Result<Vec<PickedImage>, PickerError> {
///         Ok(vec![PickedImage::new("file:///sdcard/DCIM/me.jpg")])
///     }
/// }
///
/// # pollster::block_on(async {
/// let mut editor = AvatarEditor::new(
///     EditorConfig::default(),
///     ImageSource::from_uri("file:///app/assets/default-avatar.png"),
///     HostPicker,
/// )
/// .unwrap()
/// .with_frame(ImageSource::from_uri("file:///app/assets/frame.png"));
///
/// editor.select_avatar(&PickerOptions::default()).await;
/// editor.handle_gesture(GestureEvent::pinch(1.5, GesturePhase::Active));
/// editor.handle_gesture(GestureEvent::pinch(1.5, GesturePhase::Ended));
///
/// editor.attach_surface();
/// let artifact = editor.capture_image(&CaptureOptions::default()).await.unwrap();
/// let receipt = editor.save_to_gallery(&artifact).await.unwrap();
/// println!("saved to {}", receipt.uri);
/// # });
/// ```
pub struct AvatarEditor<P, R = Compositor, M = GalleryDirectory, G = AlwaysGranted> {
    state: EditorState,
    picker: P,
    rasterizer: R,
    media_store: M,
    permissions: G,
}

impl<P: ImagePicker> AvatarEditor<P> {
    /// Creates an editor showing `default_avatar`, with the built-in
    /// rasterizer and media store.
    pub fn new(
        config: EditorConfig,
        default_avatar: ImageSource,
        picker: P,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let background = config.background_rgba()?;
        let artifact_dir = config.artifact_dir();

        let reducer = GestureReducer::new(GestureSet::standard())
            .with_cancel_policy(config.cancel_policy)
            .with_scale_bounds(config.scale_bounds);

        Ok(Self {
            state: EditorState {
                config,
                background,
                avatar: default_avatar.clone(),
                default_avatar,
                frame: None,
                reducer,
                surface_ready: false,
                callbacks: Callbacks::default(),
            },
            picker,
            rasterizer: Compositor::new(&artifact_dir),
            media_store: GalleryDirectory::new(artifact_dir.join("gallery")),
            permissions: AlwaysGranted,
        })
    }
}

impl<P, R, M, G> AvatarEditor<P, R, M, G> {
    /// Sets the decorative frame drawn over the avatar. Gestures never
    /// move it.
    pub fn with_frame(mut self, frame: ImageSource) -> Self {
        self.state.frame = Some(frame);
        self
    }

    /// Replaces the recognizer set. Transform state is reset.
    pub fn with_gestures(mut self, gestures: GestureSet) -> Self {
        self.state.reducer = GestureReducer::new(gestures)
            .with_cancel_policy(self.state.config.cancel_policy)
            .with_scale_bounds(self.state.config.scale_bounds);
        self
    }

    /// Swaps in a host rasterizer, e.g. a native view snapshotter.
    pub fn with_rasterizer<R2: Rasterizer>(self, rasterizer: R2) -> AvatarEditor<P, R2, M, G> {
        AvatarEditor {
            state: self.state,
            picker: self.picker,
            rasterizer,
            media_store: self.media_store,
            permissions: self.permissions,
        }
    }

    /// Swaps in a host media store.
    pub fn with_media_store<M2: MediaStore>(self, media_store: M2) -> AvatarEditor<P, R, M2, G> {
        AvatarEditor {
            state: self.state,
            picker: self.picker,
            rasterizer: self.rasterizer,
            media_store,
            permissions: self.permissions,
        }
    }

    /// Swaps in the host's permission prompt. Only consulted on platforms
    /// where [`Platform::requires_write_permission`](crate::Platform::requires_write_permission)
    /// holds.
    pub fn with_permission_gate<G2: PermissionGate>(
        self,
        permissions: G2,
    ) -> AvatarEditor<P, R, M, G2> {
        AvatarEditor {
            state: self.state,
            picker: self.picker,
            rasterizer: self.rasterizer,
            media_store: self.media_store,
            permissions,
        }
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    /// Called after a picked image replaces the avatar. Not called on reset.
    pub fn on_avatar_selected(&mut self, callback: impl Fn(&ImageSource) + 'static) {
        self.state.callbacks.avatar_selected = Some(Box::new(callback));
    }

    /// Called with every artifact reference `capture_image` returns.
    pub fn on_image_captured(&mut self, callback: impl Fn(&str) + 'static) {
        self.state.callbacks.image_captured = Some(Box::new(callback));
    }

    /// Called once the media store has accepted an artifact.
    pub fn on_image_saved(&mut self, callback: impl Fn(&SaveReceipt) + 'static) {
        self.state.callbacks.image_saved = Some(Box::new(callback));
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    pub fn config(&self) -> &EditorConfig {
        &self.state.config
    }

    /// The avatar currently shown: the default, or the last picked image.
    pub fn current_avatar(&self) -> &ImageSource {
        &self.state.avatar
    }

    pub fn default_avatar(&self) -> &ImageSource {
        &self.state.default_avatar
    }

    /// The frame overlay, if one was set.
    pub fn frame(&self) -> Option<&ImageSource> {
        self.state.frame.as_ref()
    }

    pub fn gestures(&self) -> &GestureSet {
        self.state.reducer.gestures()
    }

    pub fn transform_state(&self) -> &TransformState {
        self.state.reducer.state()
    }

    pub fn live_delta(&self) -> &LiveDelta {
        self.state.reducer.live()
    }

    /// The transform to render the avatar layer with right now.
    pub fn composed_transform(&self) -> ComposedTransform {
        self.state.reducer.composed()
    }

    // ------------------------------------------------------------------------
    // Gestures and surface
    // ------------------------------------------------------------------------

    pub fn handle_gesture(&mut self, event: GestureEvent) -> GestureOutcome {
        self.state.reducer.handle(event)
    }

    /// Restores the default avatar and an identity transform, dropping any
    /// in-flight gesture.
    pub fn reset_avatar(&mut self) {
        self.state.avatar = self.state.default_avatar.clone();
        self.state.reducer.reset();
        tracing::debug!(avatar = %self.state.avatar, "avatar reset");
    }

    /// Marks the host render surface as laid out and capturable.
    pub fn attach_surface(&mut self) {
        self.state.surface_ready = true;
    }

    pub fn detach_surface(&mut self) {
        self.state.surface_ready = false;
    }

    pub fn is_surface_ready(&self) -> bool {
        self.state.surface_ready
    }

    /// Snapshot of everything the rasterizer needs.
    pub fn scene(&self) -> Scene<'_> {
        let s = &self.state;
        Scene {
            avatar: &s.avatar,
            frame: s.frame.as_ref(),
            transform: s.reducer.composed(),
            width: s.config.width,
            height: s.config.height,
            avatar_fraction: s.config.avatar_fraction,
            clip: s.config.clip,
            background: s.background,
        }
    }
}

impl<P, R, M, G> AvatarEditor<P, R, M, G>
where
    P: ImagePicker,
    R: Rasterizer,
    M: MediaStore,
    G: PermissionGate,
{
    /// Lets the user take a photo or choose one from the gallery.
    ///
    /// Picker failures are logged and otherwise ignored; the avatar only
    /// changes, and `on_avatar_selected` only fires, on success.
    pub async fn select_avatar(&mut self, options: &PickerOptions) {
        self.pick(PickerMode::Any, options).await;
    }

    /// Like [`select_avatar`](Self::select_avatar), gallery only.
    pub async fn select_avatar_from_gallery(&mut self, options: &PickerOptions) {
        self.pick(PickerMode::Gallery, options).await;
    }

    /// Like [`select_avatar`](Self::select_avatar), camera only.
    pub async fn take_avatar_photo(&mut self, options: &PickerOptions) {
        self.pick(PickerMode::Camera, options).await;
    }

    async fn pick(&mut self, mode: PickerMode, options: &PickerOptions) {
        let options = mode.resolve(options);
        let result = match mode {
            PickerMode::Camera => self.picker.open_camera(&options).await,
            PickerMode::Any | PickerMode::Gallery => self.picker.show(&options).await,
        };

        let picked = match result {
            Ok(images) => images,
            Err(PickerError::Cancelled) => {
                tracing::debug!(?mode, "image picking cancelled");
                return;
            }
            Err(e) => {
                tracing::warn!(?mode, error = %e, "image picking failed");
                return;
            }
        };

        let Some(first) = picked.into_iter().next() else {
            tracing::debug!(?mode, "picker returned no images");
            return;
        };

        self.state.avatar = ImageSource::from_uri(first.uri);
        tracing::info!(?mode, avatar = %self.state.avatar, "avatar selected");
        if let Some(callback) = &self.state.callbacks.avatar_selected {
            callback(&self.state.avatar);
        }
    }

    /// Flattens avatar, transform and frame into one image artifact.
    ///
    /// Returns the artifact reference in the form `options.result` asks for.
    /// Fails with [`CaptureError::SurfaceNotReady`] before
    /// [`attach_surface`](Self::attach_surface).
    pub async fn capture_image(&self, options: &CaptureOptions) -> Result<String, CaptureError> {
        if !self.state.surface_ready {
            tracing::error!("capture requested before the render surface was attached");
            return Err(CaptureError::SurfaceNotReady);
        }

        let config = options.resolve();
        let scene = self.scene();
        match self.rasterizer.capture(&scene, &config).await {
            Ok(artifact) => {
                tracing::info!(
                    format = ?config.format,
                    result = ?config.result,
                    "image captured"
                );
                if let Some(callback) = &self.state.callbacks.image_captured {
                    callback(&artifact);
                }
                Ok(artifact)
            }
            Err(e) => {
                tracing::error!(error = %e, "capture failed");
                Err(e)
            }
        }
    }

    /// Saves a captured artifact to the media store, asking for write
    /// permission first on platforms that need it.
    pub async fn save_to_gallery(&self, artifact: &str) -> Result<SaveReceipt, SaveError> {
        if self.state.config.platform.requires_write_permission() {
            let granted = match self.permissions.request_write_permission().await {
                Ok(granted) => granted,
                Err(e) => {
                    tracing::warn!(error = %e, "write permission request failed");
                    false
                }
            };
            if !granted {
                tracing::error!("write permission denied");
                return Err(SaveError::PermissionDenied);
            }
        }

        match self.media_store.save(artifact).await {
            Ok(receipt) => {
                tracing::info!(uri = %receipt.uri, "image saved to gallery");
                if let Some(callback) = &self.state.callbacks.image_saved {
                    callback(&receipt);
                }
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(error = %e, "saving to gallery failed");
                Err(e)
            }
        }
    }
}

impl<P, R, M, G> fmt::Debug for AvatarEditor<P, R, M, G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvatarEditor")
            .field("config", &self.state.config)
            .field("avatar", &self.state.avatar)
            .field("frame", &self.state.frame)
            .field("transform", &self.state.reducer.composed())
            .field("surface_ready", &self.state.surface_ready)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Platform;
    use crate::error::PermissionError;
    use crate::gesture::GesturePhase::{Active, Cancelled, Ended};
    use crate::layer::tests::{BAND_FRAME, assert_close, solid_png};
    use crate::options::{CaptureConfig, CaptureFormat, CaptureResult};
    use crate::services::PickedImage;
    use pollster::block_on;
    use std::cell::{Cell, RefCell};
    use std::f64::consts::FRAC_PI_4;
    use std::rc::Rc;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    }

    // ------------------------------------------------------------------------
    // Fakes
    // ------------------------------------------------------------------------

    struct FakePicker {
        result: Result<Vec<PickedImage>, PickerError>,
        calls: RefCell<Vec<(&'static str, PickerOptions)>>,
    }

    impl FakePicker {
        fn returning(uris: &[&str]) -> Self {
            Self {
                result: Ok(uris.iter().map(|u| PickedImage::new(*u)).collect()),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn failing(err: PickerError) -> Self {
            Self {
                result: Err(err),
                calls: RefCell::new(Vec::new()),
            }
        }
    }

    impl ImagePicker for FakePicker {
        async fn show(&self, options: &PickerOptions) -> Result<Vec<PickedImage>, PickerError> {
            self.calls.borrow_mut().push(("show", options.clone()));
            self.result.clone()
        }

        async fn open_camera(&self, options: &PickerOptions) -> Result<Vec<PickedImage>, PickerError> {
            self.calls.borrow_mut().push(("camera", options.clone()));
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct FakeRasterizer {
        fail: bool,
        captured: RefCell<Vec<(ComposedTransform, CaptureConfig)>>,
    }

    impl Rasterizer for FakeRasterizer {
        async fn capture(&self, scene: &Scene<'_>, options: &CaptureConfig) -> Result<String, CaptureError> {
            if self.fail {
                return Err(CaptureError::render("boom"));
            }
            self.captured.borrow_mut().push((scene.transform, *options));
            Ok(format!("/tmp/capture-{}.png", self.captured.borrow().len()))
        }
    }

    #[derive(Default)]
    struct FakeStore {
        saved: RefCell<Vec<String>>,
    }

    impl MediaStore for FakeStore {
        async fn save(&self, artifact: &str) -> Result<SaveReceipt, SaveError> {
            self.saved.borrow_mut().push(artifact.to_string());
            Ok(SaveReceipt {
                uri: format!("content://media/{}", self.saved.borrow().len()),
            })
        }
    }

    struct FakeGate {
        answer: Result<bool, PermissionError>,
        asked: Cell<u32>,
    }

    impl FakeGate {
        fn answering(answer: Result<bool, PermissionError>) -> Self {
            Self {
                answer,
                asked: Cell::new(0),
            }
        }
    }

    impl PermissionGate for FakeGate {
        async fn request_write_permission(&self) -> Result<bool, PermissionError> {
            self.asked.set(self.asked.get() + 1);
            self.answer.clone()
        }
    }

    const DEFAULT_URI: &str = "file:///assets/default.png";

    fn editor(picker: FakePicker) -> AvatarEditor<FakePicker, FakeRasterizer, FakeStore> {
        init_tracing();
        AvatarEditor::new(EditorConfig::default(), ImageSource::from_uri(DEFAULT_URI), picker)
            .unwrap()
            .with_rasterizer(FakeRasterizer::default())
            .with_media_store(FakeStore::default())
    }

    fn android(gate: FakeGate) -> AvatarEditor<FakePicker, FakeRasterizer, FakeStore, FakeGate> {
        init_tracing();
        AvatarEditor::new(
            EditorConfig::new().with_platform(Platform::Android),
            ImageSource::from_uri(DEFAULT_URI),
            FakePicker::returning(&[]),
        )
        .unwrap()
        .with_rasterizer(FakeRasterizer::default())
        .with_media_store(FakeStore::default())
        .with_permission_gate(gate)
    }

    // ------------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------------

    #[test]
    fn starts_with_default_avatar_and_identity() {
        let editor = editor(FakePicker::returning(&[]));
        assert_eq!(editor.current_avatar().uri(), Some(DEFAULT_URI));
        assert_eq!(editor.composed_transform(), ComposedTransform::IDENTITY);
        assert!(!editor.is_surface_ready());
        assert!(editor.frame().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = AvatarEditor::new(
            EditorConfig::new().with_background("nope"),
            ImageSource::from_uri(DEFAULT_URI),
            FakePicker::returning(&[]),
        );
        assert!(matches!(result, Err(ConfigError::InvalidColor(_))));
    }

    // ------------------------------------------------------------------------
    // Picking
    // ------------------------------------------------------------------------

    #[test]
    fn select_replaces_avatar_and_notifies() {
        let mut editor = editor(FakePicker::returning(&["file:///dcim/a.jpg", "file:///dcim/b.jpg"]));
        let selected = Rc::new(RefCell::new(Vec::new()));
        let sink = selected.clone();
        editor.on_avatar_selected(move |source| sink.borrow_mut().push(source.to_string()));

        block_on(editor.select_avatar(&PickerOptions::default()));

        assert_eq!(editor.current_avatar().uri(), Some("file:///dcim/a.jpg"));
        assert_eq!(*selected.borrow(), vec!["file:///dcim/a.jpg".to_string()]);
    }

    #[test]
    fn each_entry_point_uses_its_mode() {
        let mut editor = editor(FakePicker::returning(&["file:///x.jpg"]));
        let custom = PickerOptions {
            quality: Some(50),
            ..PickerOptions::default()
        };

        block_on(editor.select_avatar(&custom));
        block_on(editor.select_avatar_from_gallery(&custom));
        block_on(editor.take_avatar_photo(&custom));

        let calls = editor.picker.calls.borrow();
        assert_eq!(calls.len(), 3);

        assert_eq!(calls[0].0, "show");
        assert_eq!(calls[0].1.is_camera, Some(true));
        assert_eq!(calls[0].1.allow_picking_photo, Some(true));

        assert_eq!(calls[1].0, "show");
        assert_eq!(calls[1].1.is_camera, Some(false));

        assert_eq!(calls[2].0, "camera");
        assert_eq!(calls[2].1.allow_picking_photo, Some(false));

        // Caller keys survive every merge.
        assert!(calls.iter().all(|(_, o)| o.quality == Some(50)));
        assert!(calls.iter().all(|(_, o)| o.crop_w == Some(300)));
    }

    #[test]
    fn picker_failures_leave_avatar_untouched() {
        for err in [
            PickerError::Cancelled,
            PickerError::Unavailable("no camera".into()),
            PickerError::Backend("crashed".into()),
        ] {
            let mut editor = editor(FakePicker::failing(err));
            let fired = Rc::new(Cell::new(false));
            let flag = fired.clone();
            editor.on_avatar_selected(move |_| flag.set(true));

            block_on(editor.select_avatar(&PickerOptions::default()));
            block_on(editor.take_avatar_photo(&PickerOptions::default()));

            assert_eq!(editor.current_avatar().uri(), Some(DEFAULT_URI));
            assert!(!fired.get());
        }
    }

    #[test]
    fn empty_pick_is_ignored() {
        let mut editor = editor(FakePicker::returning(&[]));
        block_on(editor.select_avatar_from_gallery(&PickerOptions::default()));
        assert_eq!(editor.current_avatar().uri(), Some(DEFAULT_URI));
    }

    #[test]
    fn picking_keeps_the_transform() {
        let mut editor = editor(FakePicker::returning(&["file:///x.jpg"]));
        editor.handle_gesture(GestureEvent::pinch(2.0, Active));
        editor.handle_gesture(GestureEvent::pinch(2.0, Ended));

        block_on(editor.select_avatar(&PickerOptions::default()));
        assert_eq!(editor.transform_state().base_scale, 2.0);
    }

    // ------------------------------------------------------------------------
    // Gestures and reset
    // ------------------------------------------------------------------------

    #[test]
    fn successive_pinches_multiply() {
        let mut editor = editor(FakePicker::returning(&[]));

        editor.handle_gesture(GestureEvent::pinch(1.5, Active));
        assert_eq!(editor.handle_gesture(GestureEvent::pinch(1.5, Ended)), GestureOutcome::Committed);
        assert_eq!(editor.transform_state().base_scale, 1.5);

        editor.handle_gesture(GestureEvent::pinch(2.0, Active));
        editor.handle_gesture(GestureEvent::pinch(2.0, Ended));
        assert_eq!(editor.transform_state().base_scale, 3.0);
    }

    #[test]
    fn pan_then_rotate() {
        let mut editor = editor(FakePicker::returning(&[]));

        editor.handle_gesture(GestureEvent::pan(10.0, -5.0, Active));
        editor.handle_gesture(GestureEvent::pan(10.0, -5.0, Ended));
        editor.handle_gesture(GestureEvent::rotate(FRAC_PI_4, Active));
        editor.handle_gesture(GestureEvent::rotate(FRAC_PI_4, Ended));

        assert_eq!(
            editor.composed_transform(),
            ComposedTransform {
                translate_x: 10.0,
                translate_y: -5.0,
                scale: 1.0,
                rotate: FRAC_PI_4,
            }
        );
    }

    #[test]
    fn reset_mid_gesture_returns_to_identity() {
        let mut editor = editor(FakePicker::returning(&["file:///x.jpg"]));
        block_on(editor.select_avatar(&PickerOptions::default()));
        editor.handle_gesture(GestureEvent::pinch(2.0, Active));
        editor.handle_gesture(GestureEvent::pinch(2.0, Ended));
        editor.handle_gesture(GestureEvent::pan(30.0, 0.0, Active));
        assert!(!editor.live_delta().is_identity());

        editor.reset_avatar();

        assert_eq!(editor.current_avatar().uri(), Some(DEFAULT_URI));
        assert!(editor.transform_state().is_identity());
        assert!(editor.live_delta().is_identity());
        assert_eq!(editor.composed_transform(), ComposedTransform::IDENTITY);

        // The interrupted pan ending afterwards has nothing to commit.
        assert_eq!(editor.handle_gesture(GestureEvent::pan(30.0, 0.0, Ended)), GestureOutcome::Idle);
        assert!(editor.transform_state().is_identity());
    }

    #[test]
    fn reset_is_idempotent() {
        let mut editor = editor(FakePicker::returning(&[]));
        editor.handle_gesture(GestureEvent::rotate(1.0, Active));
        editor.handle_gesture(GestureEvent::rotate(1.0, Ended));

        editor.reset_avatar();
        let once = (editor.current_avatar().clone(), *editor.transform_state());
        editor.reset_avatar();
        assert_eq!((editor.current_avatar().clone(), *editor.transform_state()), once);
    }

    #[test]
    fn config_policies_reach_the_reducer() {
        init_tracing();
        let mut editor = AvatarEditor::new(
            EditorConfig::new().with_cancel_policy(crate::gesture::CancelPolicy::Discard),
            ImageSource::from_uri(DEFAULT_URI),
            FakePicker::returning(&[]),
        )
        .unwrap();

        editor.handle_gesture(GestureEvent::pinch(4.0, Active));
        assert_eq!(
            editor.handle_gesture(GestureEvent::pinch(4.0, Cancelled)),
            GestureOutcome::Discarded
        );
        assert_eq!(editor.transform_state().base_scale, 1.0);
    }

    #[test]
    fn custom_gesture_set_applies() {
        let mut editor = editor(FakePicker::returning(&[])).with_gestures(GestureSet::exclusive());

        editor.handle_gesture(GestureEvent::pinch(2.0, Active));
        assert_eq!(
            editor.handle_gesture(GestureEvent::rotate(1.0, Active)),
            GestureOutcome::Rejected
        );
    }

    // ------------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------------

    #[test]
    fn capture_before_surface_is_ready_fails_without_side_effects() {
        let mut editor = editor(FakePicker::returning(&[]));
        editor.handle_gesture(GestureEvent::pinch(2.0, Active));
        editor.handle_gesture(GestureEvent::pinch(2.0, Ended));
        let before = *editor.transform_state();

        let result = block_on(editor.capture_image(&CaptureOptions::default()));

        assert!(matches!(result, Err(CaptureError::SurfaceNotReady)));
        assert!(editor.rasterizer.captured.borrow().is_empty());
        assert_eq!(*editor.transform_state(), before);
        assert_eq!(editor.current_avatar().uri(), Some(DEFAULT_URI));
    }

    #[test]
    fn capture_uses_composed_transform_and_merged_options() {
        let mut editor = editor(FakePicker::returning(&[]));
        let captured = Rc::new(RefCell::new(Vec::new()));
        let sink = captured.clone();
        editor.on_image_captured(move |uri| sink.borrow_mut().push(uri.to_string()));

        editor.handle_gesture(GestureEvent::pinch(1.5, Active));
        editor.handle_gesture(GestureEvent::pinch(1.5, Ended));
        editor.handle_gesture(GestureEvent::pan(5.0, 0.0, Active));
        editor.attach_surface();

        let options = CaptureOptions::new().with_format(CaptureFormat::Jpg);
        let artifact = block_on(editor.capture_image(&options)).unwrap();

        assert_eq!(*captured.borrow(), vec![artifact]);
        let calls = editor.rasterizer.captured.borrow();
        let (transform, config) = calls[0];
        // Live deltas are included in what gets captured.
        assert_eq!(transform.scale, 1.5);
        assert_eq!(transform.translate_x, 5.0);
        assert_eq!(config.format, CaptureFormat::Jpg);
        assert_eq!(config.quality, 1.0);
    }

    #[test]
    fn capture_failure_is_returned() {
        let mut editor = editor(FakePicker::returning(&[])).with_rasterizer(FakeRasterizer {
            fail: true,
            ..FakeRasterizer::default()
        });
        let fired = Rc::new(Cell::new(false));
        let flag = fired.clone();
        editor.on_image_captured(move |_| flag.set(true));
        editor.attach_surface();

        let result = block_on(editor.capture_image(&CaptureOptions::default()));
        assert!(matches!(result, Err(CaptureError::Render(_))));
        assert!(!fired.get());
    }

    #[test]
    fn detaching_blocks_capture_again() {
        let mut editor = editor(FakePicker::returning(&[]));
        editor.attach_surface();
        assert!(block_on(editor.capture_image(&CaptureOptions::default())).is_ok());

        editor.detach_surface();
        assert!(matches!(
            block_on(editor.capture_image(&CaptureOptions::default())),
            Err(CaptureError::SurfaceNotReady)
        ));
    }

    // ------------------------------------------------------------------------
    // Save
    // ------------------------------------------------------------------------

    #[test]
    fn save_skips_permission_off_android() {
        let mut editor = editor(FakePicker::returning(&[]));
        let saved = Rc::new(RefCell::new(Vec::new()));
        let sink = saved.clone();
        editor.on_image_saved(move |receipt| sink.borrow_mut().push(receipt.uri.clone()));

        let receipt = block_on(editor.save_to_gallery("/tmp/capture-1.png")).unwrap();

        assert_eq!(receipt.uri, "content://media/1");
        assert_eq!(*saved.borrow(), vec!["content://media/1".to_string()]);
        assert_eq!(*editor.media_store.saved.borrow(), vec!["/tmp/capture-1.png".to_string()]);
    }

    #[test]
    fn android_save_with_permission() {
        let editor = android(FakeGate::answering(Ok(true)));
        assert!(block_on(editor.save_to_gallery("/tmp/a.png")).is_ok());
        assert_eq!(editor.permissions.asked.get(), 1);
    }

    #[test]
    fn android_denied_permission() {
        let editor = android(FakeGate::answering(Ok(false)));
        let result = block_on(editor.save_to_gallery("/tmp/a.png"));

        assert!(matches!(result, Err(SaveError::PermissionDenied)));
        assert!(editor.media_store.saved.borrow().is_empty());
    }

    #[test]
    fn failed_permission_request_counts_as_denied() {
        let editor = android(FakeGate::answering(Err(PermissionError("no activity".into()))));
        assert!(matches!(
            block_on(editor.save_to_gallery("/tmp/a.png")),
            Err(SaveError::PermissionDenied)
        ));
    }

    // ------------------------------------------------------------------------
    // End to end
    // ------------------------------------------------------------------------

    #[test]
    fn capture_and_save_with_builtin_services() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let config = EditorConfig::new()
            .with_size(100.0, 100.0)
            .with_platform(Platform::Android)
            .with_artifact_dir(dir.path().join("tmp"));

        let mut editor = AvatarEditor::new(
            config,
            solid_png(10, 10, [255, 0, 0, 255]),
            FakePicker::returning(&[]),
        )
        .unwrap()
        .with_frame(ImageSource::from_svg(BAND_FRAME));

        editor.handle_gesture(GestureEvent::pinch(0.5, Active));
        editor.handle_gesture(GestureEvent::pinch(0.5, Ended));
        editor.attach_surface();

        let artifact = block_on(editor.capture_image(&CaptureOptions::default())).unwrap();
        assert!(artifact.starts_with(dir.path().join("tmp").to_str().unwrap()));

        let image = image::open(&artifact).unwrap().to_rgba8();
        assert_eq!(image.dimensions(), (100, 100));
        assert_eq!(image.get_pixel(50, 5).0, [0, 0, 255, 255]);
        assert_eq!(image.get_pixel(15, 50).0, [240, 240, 240, 255]);
        assert_close(image.get_pixel(50, 50).0, [255, 0, 0, 255]);

        let receipt = block_on(editor.save_to_gallery(&artifact)).unwrap();
        let saved = receipt.uri.strip_prefix("file://").unwrap();
        assert!(saved.starts_with(dir.path().join("tmp").join("gallery").to_str().unwrap()));
        assert_eq!(std::fs::read(saved).unwrap(), std::fs::read(&artifact).unwrap());
    }

    #[test]
    fn capture_as_data_uri() {
        init_tracing();
        let mut editor = AvatarEditor::new(
            EditorConfig::new().with_size(40.0, 40.0),
            solid_png(4, 4, [0, 0, 0, 255]),
            FakePicker::returning(&[]),
        )
        .unwrap();
        editor.attach_surface();

        let options = CaptureOptions::new().with_result(CaptureResult::DataUri);
        let artifact = block_on(editor.capture_image(&options)).unwrap();
        assert!(artifact.starts_with("data:image/png;base64,"));
    }
}
