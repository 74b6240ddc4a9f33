//! Gesture commit reducer.
//!
//! Host recognizers report pinch, rotate and pan progress as
//! [`GestureEvent`]s. While a gesture is active its value only feeds the
//! [`LiveDelta`]; the committed [`TransformState`] changes exactly once, when
//! the gesture leaves the active phase.
//!
//! Which gestures may be active at the same time is declared up front with a
//! [`GestureSet`] rather than by cross-referencing handler identities.

use serde::{Deserialize, Serialize};

use crate::transform::{ComposedTransform, LiveDelta, ScaleBounds, TransformState, project};

// ============================================================================
// Gesture vocabulary
// ============================================================================

/// The three recognizers the editor listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GestureKind {
    Pinch,
    Rotate,
    Pan,
}

impl GestureKind {
    pub const ALL: [GestureKind; 3] = [GestureKind::Pinch, GestureKind::Rotate, GestureKind::Pan];

    fn index(self) -> usize {
        match self {
            GestureKind::Pinch => 0,
            GestureKind::Rotate => 1,
            GestureKind::Pan => 2,
        }
    }
}

/// Recognizer state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GesturePhase {
    #[default]
    Undetermined,
    Began,
    Active,
    Ended,
    Cancelled,
    Failed,
}

impl GesturePhase {
    /// Endings that are not a normal completion.
    pub fn is_abort(self) -> bool {
        matches!(self, GesturePhase::Cancelled | GesturePhase::Failed)
    }
}

/// Gesture-native incremental value, relative to the start of the gesture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum GesturePayload {
    /// Scale factor; 1 means unchanged.
    Pinch { scale: f64 },
    /// Rotation in radians.
    Rotate { rotation: f64 },
    /// Translation in layout points.
    Pan { dx: f64, dy: f64 },
}

impl GesturePayload {
    pub fn kind(&self) -> GestureKind {
        match self {
            GesturePayload::Pinch { .. } => GestureKind::Pinch,
            GesturePayload::Rotate { .. } => GestureKind::Rotate,
            GesturePayload::Pan { .. } => GestureKind::Pan,
        }
    }
}

/// A single progress or state-change report from a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub payload: GesturePayload,
    pub phase: GesturePhase,
}

impl GestureEvent {
    pub fn new(payload: GesturePayload, phase: GesturePhase) -> Self {
        Self { payload, phase }
    }

    pub fn pinch(scale: f64, phase: GesturePhase) -> Self {
        Self::new(GesturePayload::Pinch { scale }, phase)
    }

    pub fn rotate(rotation: f64, phase: GesturePhase) -> Self {
        Self::new(GesturePayload::Rotate { rotation }, phase)
    }

    pub fn pan(dx: f64, dy: f64, phase: GesturePhase) -> Self {
        Self::new(GesturePayload::Pan { dx, dy }, phase)
    }
}

/// What to do with the live delta when a gesture is cancelled or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CancelPolicy {
    /// Treat an aborted gesture like a completed one.
    #[default]
    Commit,
    /// Throw the in-flight delta away.
    Discard,
}

// ============================================================================
// Recognizer declarations
// ============================================================================

/// A named recognizer and the kinds it may run alongside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recognizer {
    pub kind: GestureKind,
    pub simultaneous_with: Vec<GestureKind>,
    /// Movement the host should require before activating, in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_distance: Option<f64>,
}

impl Recognizer {
    pub fn new(kind: GestureKind) -> Self {
        Self {
            kind,
            simultaneous_with: Vec::new(),
            min_distance: None,
        }
    }

    /// Declares the kinds this recognizer may be active alongside. Its own
    /// kind is ignored.
    pub fn with_simultaneous(mut self, kinds: impl IntoIterator<Item = GestureKind>) -> Self {
        self.simultaneous_with = kinds.into_iter().filter(|k| *k != self.kind).collect();
        self
    }

    /// Sets the activation distance the host recognizer should use.
    pub fn with_min_distance(mut self, distance: f64) -> Self {
        self.min_distance = Some(distance);
        self
    }
}

/// The recognizers registered with an editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GestureSet {
    recognizers: Vec<Recognizer>,
}

impl GestureSet {
    pub fn new(recognizers: Vec<Recognizer>) -> Self {
        Self { recognizers }
    }

    /// Pinch, rotate and pan, all mutually simultaneous. Pan waits for 10
    /// points of movement before activating.
    pub fn standard() -> Self {
        use GestureKind::*;
        Self::new(vec![
            Recognizer::new(Pinch).with_simultaneous([Rotate, Pan]),
            Recognizer::new(Rotate).with_simultaneous([Pinch, Pan]),
            Recognizer::new(Pan).with_simultaneous([Pinch, Rotate]).with_min_distance(10.0),
        ])
    }

    /// Same kinds as [`standard`](Self::standard), but each must run alone.
    pub fn exclusive() -> Self {
        Self::new(GestureKind::ALL.iter().map(|k| Recognizer::new(*k)).collect())
    }

    pub fn recognizer(&self, kind: GestureKind) -> Option<&Recognizer> {
        self.recognizers.iter().find(|r| r.kind == kind)
    }

    pub fn is_registered(&self, kind: GestureKind) -> bool {
        self.recognizer(kind).is_some()
    }

    /// Returns true if `a` and `b` may be active at once.
    ///
    /// A declaration on either side is enough.
    pub fn can_run_together(&self, a: GestureKind, b: GestureKind) -> bool {
        let declares = |from: GestureKind, to: GestureKind| {
            self.recognizer(from)
                .is_some_and(|r| r.simultaneous_with.contains(&to))
        };
        declares(a, b) || declares(b, a)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Recognizer> {
        self.recognizers.iter()
    }
}

impl Default for GestureSet {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// GestureReducer
// ============================================================================

/// Result of feeding one event to the reducer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureOutcome {
    /// The live delta was updated.
    Live,
    /// The gesture ended and its delta was folded into the base state.
    Committed,
    /// The gesture was aborted and its delta dropped.
    Discarded,
    /// A phase change with nothing to commit.
    Idle,
    /// The kind is unregistered, or a non-simultaneous gesture holds the surface.
    Rejected,
}

/// Accumulates gesture deltas into a persistent [`TransformState`].
#[derive(Debug, Clone)]
pub struct GestureReducer {
    state: TransformState,
    live: LiveDelta,
    phases: [GesturePhase; 3],
    gestures: GestureSet,
    cancel_policy: CancelPolicy,
    scale_bounds: Option<ScaleBounds>,
}

impl Default for GestureReducer {
    fn default() -> Self {
        Self::new(GestureSet::standard())
    }
}

impl GestureReducer {
    /// Creates a reducer at identity, committing cancelled gestures and
    /// leaving scale unbounded.
    pub fn new(gestures: GestureSet) -> Self {
        Self {
            state: TransformState::IDENTITY,
            live: LiveDelta::IDENTITY,
            phases: [GesturePhase::Undetermined; 3],
            gestures,
            cancel_policy: CancelPolicy::default(),
            scale_bounds: None,
        }
    }

    /// Sets what happens to a gesture that is cancelled or fails mid-flight.
    pub fn with_cancel_policy(mut self, policy: CancelPolicy) -> Self {
        self.cancel_policy = policy;
        self
    }

    /// Clamps committed scale to `bounds`.
    ///
    /// Bounds that fail [`ScaleBounds::is_valid`] are dropped with a warning
    /// and scale stays unbounded.
    pub fn with_scale_bounds(mut self, bounds: Option<ScaleBounds>) -> Self {
        self.scale_bounds = match bounds {
            Some(b) if !b.is_valid() => {
                tracing::warn!(min = b.min, max = b.max, "ignoring invalid scale bounds");
                None
            }
            other => other,
        };
        self
    }

    /// Committed transform.
    pub fn state(&self) -> &TransformState {
        &self.state
    }

    /// Uncommitted deltas of gestures still in flight.
    pub fn live(&self) -> &LiveDelta {
        &self.live
    }

    pub fn gestures(&self) -> &GestureSet {
        &self.gestures
    }

    /// Bounds applied to the committed scale, if any survived validation.
    pub fn scale_bounds(&self) -> Option<ScaleBounds> {
        self.scale_bounds
    }

    /// Last phase reported for `kind`.
    pub fn phase(&self, kind: GestureKind) -> GesturePhase {
        self.phases[kind.index()]
    }

    pub fn is_active(&self, kind: GestureKind) -> bool {
        self.phase(kind) == GesturePhase::Active
    }

    /// Whether any recognizer is mid-gesture, so the preview differs from
    /// the committed state.
    pub fn any_active(&self) -> bool {
        GestureKind::ALL.iter().any(|k| self.is_active(*k))
    }

    /// The transform to render right now.
    pub fn composed(&self) -> ComposedTransform {
        project(&self.state, &self.live)
    }

    /// Feeds one recognizer report into the reducer.
    pub fn handle(&mut self, event: GestureEvent) -> GestureOutcome {
        let kind = event.payload.kind();
        if !self.gestures.is_registered(kind) {
            return GestureOutcome::Rejected;
        }

        let previous = self.phase(kind);

        if event.phase == GesturePhase::Active {
            if previous != GesturePhase::Active && self.blocked(kind) {
                return GestureOutcome::Rejected;
            }
            self.phases[kind.index()] = GesturePhase::Active;
            self.apply_live(event.payload);
            return GestureOutcome::Live;
        }

        self.phases[kind.index()] = event.phase;
        if previous != GesturePhase::Active {
            return GestureOutcome::Idle;
        }

        let outcome = if event.phase.is_abort() && self.cancel_policy == CancelPolicy::Discard {
            GestureOutcome::Discarded
        } else {
            self.commit(event.payload);
            GestureOutcome::Committed
        };
        self.reset_live(kind);

        tracing::debug!(
            ?kind,
            phase = ?event.phase,
            ?outcome,
            scale = self.state.base_scale,
            rotation = self.state.base_rotation,
            translate_x = self.state.base_translate_x,
            translate_y = self.state.base_translate_y,
            "gesture ended"
        );
        outcome
    }

    /// Returns base and live state to identity and forgets in-flight gestures.
    pub fn reset(&mut self) {
        self.state = TransformState::IDENTITY;
        self.live = LiveDelta::IDENTITY;
        self.phases = [GesturePhase::Undetermined; 3];
    }

    fn blocked(&self, kind: GestureKind) -> bool {
        GestureKind::ALL
            .iter()
            .filter(|other| **other != kind && self.is_active(**other))
            .any(|other| !self.gestures.can_run_together(kind, *other))
    }

    fn apply_live(&mut self, payload: GesturePayload) {
        match payload {
            GesturePayload::Pinch { scale } => self.live.scale = scale,
            GesturePayload::Rotate { rotation } => self.live.rotation = rotation,
            GesturePayload::Pan { dx, dy } => {
                self.live.translate_x = dx;
                self.live.translate_y = dy;
            }
        }
    }

    fn commit(&mut self, payload: GesturePayload) {
        match payload {
            GesturePayload::Pinch { scale } => self.state.commit_scale(scale, self.scale_bounds),
            GesturePayload::Rotate { rotation } => self.state.commit_rotation(rotation),
            GesturePayload::Pan { dx, dy } => self.state.commit_translation(dx, dy),
        }
    }

    fn reset_live(&mut self, kind: GestureKind) {
        match kind {
            GestureKind::Pinch => self.live.reset_scale(),
            GestureKind::Rotate => self.live.reset_rotation(),
            GestureKind::Pan => self.live.reset_translation(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
