//! drishti-eye: multi-model vision orchestration
//!
//! Runs independently built detection engines (objects, pose, faces,
//! recognition, landmarks, emotion) over a shared video frame each tick and
//! republishes their results to subscribers.
//!
//! Engines plug in through [`engine::Engine`] and are registered with a
//! [`DetectorFactory`]; the [`Vision`] facade drives everything else.

pub mod capture;
pub mod engine;
pub mod factory;
pub mod orchestrator;
pub mod vision;

pub use capture::{ImageSequenceSource, NullSource, StillSource, VideoSource};
pub use engine::{Engine, EngineDetector};
pub use factory::DetectorFactory;
pub use orchestrator::{ModuleOutcome, ModuleStatus, Orchestrator, TickOutcome, TickReport, VisionEvents};
pub use vision::Vision;
