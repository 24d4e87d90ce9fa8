//! Error types and result codes for drishti

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kinds::{ModuleKind, ParamKind};

/// Result type used across drishti
pub type Result<T> = std::result::Result<T, VisionError>;

/// Closed set of result codes returned by every fallible operation.
///
/// The numeric values are stable and may be handed to foreign callers. Codes
/// up to 28 follow the vendor engine's numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ResultCode {
    Ok = 0,
    Ng = 1,
    FolderNotExist = 2,
    DataFileNotExist = 3,
    CfgFileNotExist = 4,
    WeightFileNotExist = 5,
    ModelPathNotExist = 6,
    PrototxtPathNotExist = 7,
    CaffeModelPathNotExist = 8,
    ImageEmpty = 9,
    MemoryAllocationFailed = 10,
    DetectorNotExist = 11,
    DetectorAlreadyExists = 12,
    DataPathNotSet = 13,
    SavedDataDoesNotExist = 14,
    ActivationFailed = 15,
    ActiveFileInfoFailed = 16,
    EngineInitFailed = 17,
    EngineUninitFailed = 18,
    AlreadyInitialized = 19,
    EngineHandleNull = 20,
    NotInitialized = 21,
    FeatureExtractionFailed = 22,
    AgeFailed = 23,
    GenderFailed = 24,
    Face3DAngleFailed = 25,
    LivenessFailed = 26,
    IdCardFeatureExtractionFailed = 27,
    FaceIdCardCompareFailed = 28,
    // codes below have no vendor counterpart
    FaceCascadeNotExist = 29,
    EmotionCascadeNotExist = 30,
    InvalidParam = 31,
    Undefined = 100,
}

impl ResultCode {
    /// Numeric value of the code
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_ok(self) -> bool {
        self == ResultCode::Ok
    }
}

impl<T> From<&Result<T>> for ResultCode {
    fn from(result: &Result<T>) -> Self {
        match result {
            Ok(_) => ResultCode::Ok,
            Err(err) => err.code(),
        }
    }
}

/// Which required dependency of a module could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingResource {
    /// Class label list
    Data,
    /// Network description
    Cfg,
    /// Network weights
    Weight,
    /// Model directory or model binary
    Model,
    Prototxt,
    CaffeModel,
    /// Face cascade used ahead of expression classification
    FaceCascade,
    /// Expression cascade
    EmotionCascade,
}

impl MissingResource {
    pub fn code(self) -> ResultCode {
        match self {
            MissingResource::Data => ResultCode::DataFileNotExist,
            MissingResource::Cfg => ResultCode::CfgFileNotExist,
            MissingResource::Weight => ResultCode::WeightFileNotExist,
            MissingResource::Model => ResultCode::ModelPathNotExist,
            MissingResource::Prototxt => ResultCode::PrototxtPathNotExist,
            MissingResource::CaffeModel => ResultCode::CaffeModelPathNotExist,
            MissingResource::FaceCascade => ResultCode::FaceCascadeNotExist,
            MissingResource::EmotionCascade => ResultCode::EmotionCascadeNotExist,
        }
    }
}

/// Failures reported by a vendor detection engine.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFault {
    #[error("engine activation failed")]
    ActivationFailed,
    #[error("failed to read activation file info")]
    ActiveFileInfoFailed,
    #[error("engine initialization failed")]
    InitFailed,
    #[error("engine release failed")]
    UninitFailed,
    #[error("engine handle is null")]
    HandleNull,
    #[error("face feature extraction failed")]
    FeatureExtractionFailed,
    #[error("age estimation failed")]
    AgeFailed,
    #[error("gender estimation failed")]
    GenderFailed,
    #[error("3D face angle estimation failed")]
    Face3DAngleFailed,
    #[error("liveness estimation failed")]
    LivenessFailed,
    #[error("id card feature extraction failed")]
    IdCardFeatureExtractionFailed,
    #[error("face to id card comparison failed")]
    FaceIdCardCompareFailed,
}

impl EngineFault {
    pub fn code(self) -> ResultCode {
        match self {
            EngineFault::ActivationFailed => ResultCode::ActivationFailed,
            EngineFault::ActiveFileInfoFailed => ResultCode::ActiveFileInfoFailed,
            EngineFault::InitFailed => ResultCode::EngineInitFailed,
            EngineFault::UninitFailed => ResultCode::EngineUninitFailed,
            EngineFault::HandleNull => ResultCode::EngineHandleNull,
            EngineFault::FeatureExtractionFailed => ResultCode::FeatureExtractionFailed,
            EngineFault::AgeFailed => ResultCode::AgeFailed,
            EngineFault::GenderFailed => ResultCode::GenderFailed,
            EngineFault::Face3DAngleFailed => ResultCode::Face3DAngleFailed,
            EngineFault::LivenessFailed => ResultCode::LivenessFailed,
            EngineFault::IdCardFeatureExtractionFailed => {
                ResultCode::IdCardFeatureExtractionFailed
            }
            EngineFault::FaceIdCardCompareFailed => ResultCode::FaceIdCardCompareFailed,
        }
    }
}

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Operation failed: {0}")]
    Failed(String),

    #[error("Resource folder does not exist: {0}")]
    FolderNotExist(String),

    #[error("{kind} dependency missing ({resource:?}): {path}")]
    ResourceMissing {
        kind: ModuleKind,
        resource: MissingResource,
        path: String,
    },

    #[error("Resource path has not been set")]
    DataPathNotSet,

    #[error("Input image is empty")]
    ImageEmpty,

    #[error("Detector allocation failed for {0}")]
    MemoryAllocationFailed(ModuleKind),

    #[error("Detector {0} is not registered")]
    DetectorNotExist(ModuleKind),

    #[error("Detector {0} is already registered")]
    DetectorAlreadyExists(ModuleKind),

    #[error("Detector {0} is already initialized")]
    AlreadyInitialized(ModuleKind),

    #[error("Detector {0} is not initialized")]
    NotInitialized(ModuleKind),

    #[error("Parameter {param:?} does not apply to {kind}")]
    InvalidParam { kind: ModuleKind, param: ParamKind },

    #[error("Saved data does not exist: {0}")]
    SavedDataDoesNotExist(String),

    #[error("No engine registered for {0}")]
    EngineUnavailable(ModuleKind),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineFault),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl VisionError {
    /// Closed result code for this error
    pub fn code(&self) -> ResultCode {
        match self {
            VisionError::Failed(_) => ResultCode::Ng,
            VisionError::FolderNotExist(_) => ResultCode::FolderNotExist,
            VisionError::ResourceMissing { resource, .. } => resource.code(),
            VisionError::DataPathNotSet => ResultCode::DataPathNotSet,
            VisionError::ImageEmpty => ResultCode::ImageEmpty,
            VisionError::MemoryAllocationFailed(_) => ResultCode::MemoryAllocationFailed,
            VisionError::DetectorNotExist(_) => ResultCode::DetectorNotExist,
            VisionError::DetectorAlreadyExists(_) => ResultCode::DetectorAlreadyExists,
            VisionError::AlreadyInitialized(_) => ResultCode::AlreadyInitialized,
            VisionError::NotInitialized(_) => ResultCode::NotInitialized,
            VisionError::InvalidParam { .. } => ResultCode::InvalidParam,
            VisionError::SavedDataDoesNotExist(_) => ResultCode::SavedDataDoesNotExist,
            VisionError::EngineUnavailable(_) => ResultCode::Undefined,
            VisionError::Engine(fault) => fault.code(),
            VisionError::Config(_)
            | VisionError::Io(_)
            | VisionError::Image(_)
            | VisionError::Serialization(_) => ResultCode::Ng,
        }
    }
}

impl From<toml::de::Error> for VisionError {
    fn from(err: toml::de::Error) -> Self {
        VisionError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vision_error_display() {
        let err = VisionError::DetectorNotExist(ModuleKind::Pose);
        assert!(err.to_string().contains("Pose"));
        assert!(err.to_string().contains("not registered"));
    }

    #[test]
    fn test_vision_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let vision_err: VisionError = io_err.into();
        match vision_err {
            VisionError::Io(_) => {}
            _ => panic!("Expected Io error"),
        }
        assert_eq!(vision_err.code(), ResultCode::Ng);
    }

    #[test]
    fn test_missing_resource_codes() {
        let err = VisionError::ResourceMissing {
            kind: ModuleKind::Object,
            resource: MissingResource::Weight,
            path: "weight/yolov3.weights".to_string(),
        };
        assert_eq!(err.code(), ResultCode::WeightFileNotExist);
        assert_eq!(
            MissingResource::EmotionCascade.code(),
            ResultCode::EmotionCascadeNotExist
        );
    }

    #[test]
    fn test_engine_fault_maps_to_engine_code() {
        let err: VisionError = EngineFault::ActivationFailed.into();
        assert_eq!(err.code(), ResultCode::ActivationFailed);
        assert_eq!(err.code().as_u8(), 15);
    }

    #[test]
    fn test_result_code_from_result() {
        let ok: Result<()> = Ok(());
        assert_eq!(ResultCode::from(&ok), ResultCode::Ok);
        assert!(ResultCode::from(&ok).is_ok());

        let err: Result<()> = Err(VisionError::DetectorAlreadyExists(ModuleKind::Object));
        assert_eq!(ResultCode::from(&err), ResultCode::DetectorAlreadyExists);
        assert_eq!(ResultCode::Undefined.as_u8(), 100);
    }

    #[test]
    fn test_lifecycle_codes_share_vendor_numbers() {
        assert_eq!(ResultCode::EngineUninitFailed.as_u8(), 18);
        assert_eq!(ResultCode::AlreadyInitialized.as_u8(), 19);
        assert_eq!(ResultCode::EngineHandleNull.as_u8(), 20);
        assert_eq!(ResultCode::NotInitialized.as_u8(), 21);
        assert_eq!(ResultCode::FaceIdCardCompareFailed.as_u8(), 28);
        assert_eq!(ResultCode::FaceCascadeNotExist.as_u8(), 29);
        assert_eq!(ResultCode::InvalidParam.as_u8(), 31);
    }
}
