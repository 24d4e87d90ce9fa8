//! drishti-core: building blocks of the drishti vision orchestrator
//!
//! Holds the publish/subscribe channel used for all result delivery, the
//! detector contract, result codes, payload and frame types, resource layout
//! and configuration.

pub mod config;
pub mod detector;
pub mod error;
pub mod frame;
pub mod kinds;
pub mod params;
pub mod payload;
pub mod resources;
pub mod signal;

pub use config::VisionConfig;
pub use detector::{Detector, ModuleState, Payload, ResultChannel};
pub use error::{EngineFault, MissingResource, Result, ResultCode, VisionError};
pub use frame::Frame;
pub use kinds::{CameraProperty, ModuleKind, ParamKind};
pub use params::ModuleParams;
pub use payload::{CameraState, Emotion, FaceAngle, Gender, PersonInfo, Point2D, Rect};
pub use resources::{ModuleResources, ResourceLayout, ResourcePaths};
pub use signal::{EventChannel, Publisher, Subscription};
