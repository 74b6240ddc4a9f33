//! avatar-editor: pick, transform, frame and capture a profile picture.
//!
//! The crate holds the state and compute core of an avatar editor widget.
//! The host platform supplies gesture events and the native services
//! (picker, media store, permission prompt); the crate accumulates the
//! gestures into a transform, flattens avatar and frame into an image, and
//! hands artifacts back.
//!
//! # Gestures
//!
//! Pinch, rotate and pan each report a delta relative to the start of the
//! gesture. While a gesture is active its delta is only shown; when it ends
//! the delta is committed (scales multiply, rotations and translations add).
//!
//! ```
//! use avatar_editor::{GestureEvent, GesturePhase, GestureReducer};
//!
//! let mut reducer = GestureReducer::default();
//!
//! reducer.handle(GestureEvent::pinch(1.5, GesturePhase::Active));
//! reducer.handle(GestureEvent::pinch(1.5, GesturePhase::Ended));
//! reducer.handle(GestureEvent::pinch(2.0, GesturePhase::Active));
//!
//! // Committed 1.5, live 2.0.
//! assert_eq!(reducer.state().base_scale, 1.5);
//! assert_eq!(reducer.composed().scale, 3.0);
//! ```
//!
//! # Editor
//!
//! [`AvatarEditor`] wraps the reducer with the avatar source, the frame and
//! the host services. See its documentation for a full example.
//!
//! # Configuration
//!
//! Editor settings are plain data and round-trip through JSON:
//!
//! ```
//! use avatar_editor::{ClipStyle, EditorConfig, Platform};
//!
//! let config = EditorConfig::new()
//!     .with_size(320.0, 320.0)
//!     .with_clip(ClipStyle::Circle)
//!     .with_platform(Platform::Android);
//!
//! let json = config.to_json().unwrap();
//! assert_eq!(EditorConfig::from_json(&json).unwrap(), config);
//! ```

mod config;
mod editor;
mod error;
mod gesture;
mod layer;
mod options;
mod services;
mod source;
mod transform;

pub use config::{ClipStyle, DEFAULT_AVATAR_FRACTION, DEFAULT_BACKGROUND, DEFAULT_SIZE, EditorConfig, MAX_SIZE, Platform};
pub use editor::AvatarEditor;
pub use error::{CaptureError, ConfigError, PermissionError, PickerError, SaveError};
pub use gesture::{
    CancelPolicy, GestureEvent, GestureKind, GestureOutcome, GesturePayload, GesturePhase,
    GestureReducer, GestureSet, Recognizer,
};
pub use layer::{AvatarLayer, Compositor, FrameLayer, LayerEffect, RenderContext, Scene, flatten};
pub use layer::compositor::encode;
pub use options::{CaptureConfig, CaptureFormat, CaptureOptions, CaptureResult, PickerMode, PickerOptions};
pub use services::{
    AlwaysGranted, GalleryDirectory, ImagePicker, MediaStore, PermissionGate, PickedImage,
    Rasterizer, SaveReceipt,
};
pub use source::ImageSource;
pub use transform::{ComposedTransform, LiveDelta, ScaleBounds, TransformState, project};
