//! Accumulated avatar transform and its per-frame projection.
//!
//! The transform is split in two halves:
//!
//! - [`TransformState`] holds the committed ("base") values. It only changes
//!   when a gesture ends or the editor is reset.
//! - [`LiveDelta`] holds the uncommitted part of gestures that are still in
//!   flight.
//!
//! [`project`] folds both into the [`ComposedTransform`] applied to the
//! avatar layer. Scale combines multiplicatively, everything else additively.

use kurbo::{Affine, Point, Vec2};
use serde::{Deserialize, Serialize};

// ============================================================================
// ScaleBounds
// ============================================================================

/// Optional clamp for the committed scale.
///
/// Editors are unbounded by default; extreme pinches are accepted as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleBounds {
    pub min: f64,
    pub max: f64,
}

impl ScaleBounds {
    /// Creates bounds without checking them; see [`is_valid`](Self::is_valid).
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Returns true if the bounds describe a usable, strictly positive range.
    pub fn is_valid(&self) -> bool {
        self.min > 0.0 && self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }

    /// Limits `scale` to `[min, max]`.
    ///
    /// Never panics: a NaN bound is ignored, and inverted bounds resolve to
    /// `max`.
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.max(self.min).min(self.max)
    }
}

// ============================================================================
// TransformState
// ============================================================================

/// Committed transform of the avatar layer.
///
/// Rotation is in radians. `base_scale` starts at 1 and is only ever
/// multiplied by pinch factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformState {
    pub base_scale: f64,
    pub base_rotation: f64,
    pub base_translate_x: f64,
    pub base_translate_y: f64,
}

impl TransformState {
    pub const IDENTITY: Self = Self {
        base_scale: 1.0,
        base_rotation: 0.0,
        base_translate_x: 0.0,
        base_translate_y: 0.0,
    };

    /// Folds a finished pinch into the committed scale.
    pub fn commit_scale(&mut self, factor: f64, bounds: Option<ScaleBounds>) {
        let scale = self.base_scale * factor;
        self.base_scale = match bounds {
            Some(b) => b.clamp(scale),
            None => scale,
        };
    }

    /// Folds a finished rotation (radians) into the committed rotation.
    pub fn commit_rotation(&mut self, radians: f64) {
        self.base_rotation += radians;
    }

    /// Folds a finished pan into the committed translation.
    pub fn commit_translation(&mut self, dx: f64, dy: f64) {
        self.base_translate_x += dx;
        self.base_translate_y += dy;
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for TransformState {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================================================
// LiveDelta
// ============================================================================

/// In-flight portion of the current gestures.
///
/// Each axis is reset to its identity independently once the gesture that
/// drives it commits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveDelta {
    pub scale: f64,
    pub rotation: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl LiveDelta {
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        rotation: 0.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    pub fn reset_scale(&mut self) {
        self.scale = 1.0;
    }

    pub fn reset_rotation(&mut self) {
        self.rotation = 0.0;
    }

    pub fn reset_translation(&mut self) {
        self.translate_x = 0.0;
        self.translate_y = 0.0;
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Default for LiveDelta {
    fn default() -> Self {
        Self::IDENTITY
    }
}

// ============================================================================
// ComposedTransform
// ============================================================================

/// The instantaneous transform applied to the avatar layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedTransform {
    pub translate_x: f64,
    pub translate_y: f64,
    pub scale: f64,
    /// Rotation in radians.
    pub rotate: f64,
}

impl ComposedTransform {
    pub const IDENTITY: Self = Self {
        translate_x: 0.0,
        translate_y: 0.0,
        scale: 1.0,
        rotate: 0.0,
    };

    /// Rotation mapped to degrees, for hosts that express angles that way.
    pub fn rotate_degrees(&self) -> f64 {
        self.rotate.to_degrees()
    }

    /// Builds the layer-space affine for this transform.
    ///
    /// Operations are applied about `center` in list order: translate, then
    /// scale, then rotate. A point `p` on the untransformed layer maps to
    /// `center + t + s * R(p - center)`.
    pub fn to_affine(&self, center: Point) -> Affine {
        let c = center.to_vec2();
        Affine::translate(c)
            * Affine::translate(Vec2::new(self.translate_x, self.translate_y))
            * Affine::scale(self.scale)
            * Affine::rotate(self.rotate)
            * Affine::translate(-c)
    }
}

impl Default for ComposedTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Projects committed and live state into the render transform.
///
/// Pure: identical inputs always give identical output. Idle axes carry an
/// identity delta and therefore contribute only their base value.
pub fn project(state: &TransformState, live: &LiveDelta) -> ComposedTransform {
    ComposedTransform {
        translate_x: live.translate_x + state.base_translate_x,
        translate_y: live.translate_y + state.base_translate_y,
        scale: live.scale * state.base_scale,
        rotate: live.rotation + state.base_rotation,
    }
}

// ============================================================================
// Tests
// ============================================================================
