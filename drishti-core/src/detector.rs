//! The contract every detection module implements

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::frame::Frame;
use crate::kinds::{ModuleKind, ParamKind};
use crate::payload::{Emotion, PersonInfo, Point2D, Rect};
use crate::signal::EventChannel;

/// Lifecycle state of a detection module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleState {
    Uninitialized,
    Ready,
    /// The last detect call failed
    Failed,
}

/// A detector's own result channel, tagged by payload shape.
#[derive(Debug, Clone, Copy)]
pub enum ResultChannel<'a> {
    Objects(&'a EventChannel<Vec<String>>),
    Poses(&'a EventChannel<Vec<Point2D>>),
    Faces(&'a EventChannel<Vec<Rect>>),
    Compare(&'a EventChannel<bool>),
    Persons(&'a EventChannel<Vec<PersonInfo>>),
    Landmarks(&'a EventChannel<Vec<Point2D>>),
    Emotions(&'a EventChannel<Vec<Emotion>>),
}

/// Result payload a detector can publish.
pub trait Payload: Send + Sync + Sized + 'static {
    /// Tag `channel` with its shape. `kind` disambiguates payloads shared by
    /// several module kinds.
    fn tag(kind: ModuleKind, channel: &EventChannel<Self>) -> ResultChannel<'_>;

    /// Whether the payload reports at least one finding.
    fn is_hit(&self) -> bool;
}

impl Payload for Vec<String> {
    fn tag(_kind: ModuleKind, channel: &EventChannel<Self>) -> ResultChannel<'_> {
        ResultChannel::Objects(channel)
    }

    fn is_hit(&self) -> bool {
        !self.is_empty()
    }
}

impl Payload for Vec<Point2D> {
    fn tag(kind: ModuleKind, channel: &EventChannel<Self>) -> ResultChannel<'_> {
        match kind {
            ModuleKind::Pose => ResultChannel::Poses(channel),
            _ => ResultChannel::Landmarks(channel),
        }
    }

    fn is_hit(&self) -> bool {
        !self.is_empty()
    }
}

impl Payload for Vec<Rect> {
    fn tag(_kind: ModuleKind, channel: &EventChannel<Self>) -> ResultChannel<'_> {
        ResultChannel::Faces(channel)
    }

    fn is_hit(&self) -> bool {
        !self.is_empty()
    }
}

impl Payload for bool {
    fn tag(_kind: ModuleKind, channel: &EventChannel<Self>) -> ResultChannel<'_> {
        ResultChannel::Compare(channel)
    }

    fn is_hit(&self) -> bool {
        *self
    }
}

impl Payload for Vec<PersonInfo> {
    fn tag(_kind: ModuleKind, channel: &EventChannel<Self>) -> ResultChannel<'_> {
        ResultChannel::Persons(channel)
    }

    fn is_hit(&self) -> bool {
        !self.is_empty()
    }
}

impl Payload for Vec<Emotion> {
    fn tag(_kind: ModuleKind, channel: &EventChannel<Self>) -> ResultChannel<'_> {
        ResultChannel::Emotions(channel)
    }

    fn is_hit(&self) -> bool {
        !self.is_empty()
    }
}

/// Uniform lifecycle and detection interface over heterogeneous engines.
///
/// Rules every implementation follows:
/// - `init` is not re-entrant; a second call before `shutdown` returns
///   `AlreadyInitialized` and leaves the instance untouched.
/// - `detect` before a successful `init` returns `NotInitialized`.
/// - `detect` never modifies `input`. An empty `input` returns `ImageEmpty`.
///   An empty `display` means "do not draw"; results are still published.
pub trait Detector: Send {
    fn module_kind(&self) -> ModuleKind;

    fn state(&self) -> ModuleState;

    fn init(&mut self) -> Result<()>;

    fn shutdown(&mut self) -> Result<()>;

    fn set_param(&mut self, param: ParamKind, value: f32) -> Result<()>;

    /// Run detection on `input`, optionally annotating `display`, and publish
    /// the result on this detector's channel.
    fn detect(&mut self, input: &Frame, display: &mut Frame) -> Result<()>;

    /// Replace the parameter table with the one saved at `path`.
    fn load_config(&mut self, path: &Path) -> Result<()>;

    /// Write the parameter table back to the path it was loaded from.
    fn save_config(&self) -> Result<()>;

    fn result_channel(&self) -> ResultChannel<'_>;

    /// Version of the underlying engine
    fn version(&self) -> &str {
        "0.0.0"
    }
}

impl fmt::Debug for dyn Detector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Detector")
            .field("kind", &self.module_kind())
            .field("state", &self.state())
            .field("version", &self.version())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_payload_tag_depends_on_kind() {
        let channel: EventChannel<Vec<Point2D>> = EventChannel::new();
        assert!(matches!(
            Payload::tag(ModuleKind::Pose, &channel),
            ResultChannel::Poses(_)
        ));
        assert!(matches!(
            Payload::tag(ModuleKind::FaceLandmark, &channel),
            ResultChannel::Landmarks(_)
        ));
    }

    #[test]
    fn test_payload_hits() {
        assert!(!Vec::<Rect>::new().is_hit());
        assert!(vec![Rect::new(0, 0, 1, 1)].is_hit());
        assert!(true.is_hit());
        assert!(!false.is_hit());
    }
}
