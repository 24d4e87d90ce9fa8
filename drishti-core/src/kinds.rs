//! Module, parameter and camera property identifiers

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of detection module. At most one instance of each kind is registered
/// with an orchestrator at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Object,
    Pose,
    FaceLocation,
    FaceCompare,
    FaceRecognition,
    FaceLandmark,
    Emotion,
}

impl ModuleKind {
    pub const ALL: [ModuleKind; 7] = [
        ModuleKind::Object,
        ModuleKind::Pose,
        ModuleKind::FaceLocation,
        ModuleKind::FaceCompare,
        ModuleKind::FaceRecognition,
        ModuleKind::FaceLandmark,
        ModuleKind::Emotion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModuleKind::Object => "Object",
            ModuleKind::Pose => "Pose",
            ModuleKind::FaceLocation => "FaceLocation",
            ModuleKind::FaceCompare => "FaceCompare",
            ModuleKind::FaceRecognition => "FaceRecognition",
            ModuleKind::FaceLandmark => "FaceLandmark",
            ModuleKind::Emotion => "Emotion",
        }
    }
}

impl fmt::Display for ModuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModuleKind {
    type Err = String;

    /// Accepts both `FaceLocation` and `face_location` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();
        ModuleKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().to_lowercase() == normalized)
            .ok_or_else(|| format!("unknown module kind: {}", s))
    }
}

/// Tunable parameter of a detection module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    // face detection
    MinFaceSize,
    MaxFaceSize,
    ScoreThresh,
    ImagePyramidScaleFactor,
    WindowStep,
    // face recognition toggles
    RecognitionAge,
    RecognitionGender,
    Recognition3DAngle,
    RecognitionLiveness,
    // pose
    PoseBody,
    PoseFace,
    PoseHand,
    PoseExtra,
    PoseOutput,
    PoseGui,
}

impl ParamKind {
    /// Whether this parameter is meaningful for `kind`.
    pub fn applies_to(self, kind: ModuleKind) -> bool {
        use ParamKind::*;
        match self {
            MinFaceSize | MaxFaceSize | ScoreThresh | ImagePyramidScaleFactor | WindowStep => {
                matches!(
                    kind,
                    ModuleKind::FaceLocation | ModuleKind::FaceLandmark | ModuleKind::Emotion
                )
            }
            RecognitionAge | RecognitionGender | Recognition3DAngle | RecognitionLiveness => {
                kind == ModuleKind::FaceRecognition
            }
            PoseBody | PoseFace | PoseHand | PoseExtra | PoseOutput | PoseGui => {
                kind == ModuleKind::Pose
            }
        }
    }

    /// Values installed when a module of `kind` is created.
    pub fn defaults_for(kind: ModuleKind) -> &'static [(ParamKind, f32)] {
        match kind {
            ModuleKind::FaceLocation | ModuleKind::FaceLandmark | ModuleKind::Emotion => &[
                (ParamKind::MinFaceSize, 60.0),
                (ParamKind::ScoreThresh, 2.0),
                (ParamKind::ImagePyramidScaleFactor, 0.8),
                (ParamKind::WindowStep, 4.0),
            ],
            ModuleKind::Pose => &[(ParamKind::PoseBody, 1.0)],
            _ => &[],
        }
    }
}

/// Capture device property. Discriminants match the OpenCV `CAP_PROP_*` ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(i32)]
pub enum CameraProperty {
    PosMsec = 0,
    PosFrames = 1,
    PosAviRatio = 2,
    FrameWidth = 3,
    FrameHeight = 4,
    Fps = 5,
    Fourcc = 6,
    FrameCount = 7,
    Format = 8,
    Mode = 9,
    Brightness = 10,
    Contrast = 11,
    Saturation = 12,
    Hue = 13,
    Gain = 14,
    Exposure = 15,
    ConvertRgb = 16,
    WhiteBalanceBlueU = 17,
    Rectification = 18,
    Monochrome = 19,
    Sharpness = 20,
    AutoExposure = 21,
    Gamma = 22,
    Temperature = 23,
    Trigger = 24,
    TriggerDelay = 25,
    WhiteBalanceRedV = 26,
    Zoom = 27,
    Focus = 28,
    Guid = 29,
    IsoSpeed = 30,
    Backlight = 32,
    Pan = 33,
    Tilt = 34,
    Roll = 35,
    Iris = 36,
    Settings = 37,
    BufferSize = 38,
    Autofocus = 39,
}

impl CameraProperty {
    pub fn id(self) -> i32 {
        self as i32
    }
}
