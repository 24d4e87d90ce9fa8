//! Per-module parameter tables

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{Result, VisionError};
use crate::kinds::{ModuleKind, ParamKind};

/// Float parameters of one module, keyed by parameter kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleParams {
    kind: ModuleKind,
    values: BTreeMap<ParamKind, f32>,
}

impl ModuleParams {
    /// Table pre-filled with the defaults for `kind`.
    pub fn with_defaults(kind: ModuleKind) -> Self {
        Self {
            kind,
            values: ParamKind::defaults_for(kind).iter().copied().collect(),
        }
    }

    pub fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn set(&mut self, param: ParamKind, value: f32) -> Result<()> {
        if !param.applies_to(self.kind) || !value.is_finite() {
            return Err(VisionError::InvalidParam {
                kind: self.kind,
                param,
            });
        }
        self.values.insert(param, value);
        Ok(())
    }

    pub fn get(&self, param: ParamKind) -> Option<f32> {
        self.values.get(&param).copied()
    }

    /// Toggle-style parameters are on when non-zero.
    pub fn flag(&self, param: ParamKind) -> bool {
        self.get(param).map_or(false, |v| v != 0.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamKind, f32)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }

    /// Read a saved table for this module kind. Entries that do not apply to
    /// the kind are rejected.
    pub fn load(kind: ModuleKind, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(VisionError::SavedDataDoesNotExist(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let saved: SavedParams = serde_json::from_str(&content)?;
        let mut params = Self::with_defaults(kind);
        for (param, value) in saved.values {
            params.set(param, value)?;
        }
        Ok(params)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let saved = SavedParams {
            values: self.values.clone(),
        };
        let content = serde_json::to_string_pretty(&saved)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct SavedParams {
    values: BTreeMap<ParamKind, f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_defaults() {
        let params = ModuleParams::with_defaults(ModuleKind::FaceLocation);
        assert_eq!(params.get(ParamKind::MinFaceSize), Some(60.0));
        assert_eq!(params.get(ParamKind::ScoreThresh), Some(2.0));
        assert_eq!(params.get(ParamKind::ImagePyramidScaleFactor), Some(0.8));
        assert_eq!(params.get(ParamKind::WindowStep), Some(4.0));
        assert_eq!(params.get(ParamKind::MaxFaceSize), None);
    }

    #[test]
    fn test_set_rejects_foreign_param() {
        let mut params = ModuleParams::with_defaults(ModuleKind::Object);
        let err = params.set(ParamKind::PoseHand, 1.0).unwrap_err();
        assert!(matches!(err, VisionError::InvalidParam { .. }));
    }

    #[test]
    fn test_set_rejects_nan() {
        let mut params = ModuleParams::with_defaults(ModuleKind::FaceLocation);
        assert!(params.set(ParamKind::MinFaceSize, f32::NAN).is_err());
    }

    #[test]
    fn test_flag() {
        let mut params = ModuleParams::with_defaults(ModuleKind::FaceRecognition);
        assert!(!params.flag(ParamKind::RecognitionAge));
        params.set(ParamKind::RecognitionAge, 1.0).unwrap();
        assert!(params.flag(ParamKind::RecognitionAge));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("face.json");

        let mut params = ModuleParams::with_defaults(ModuleKind::FaceLocation);
        params.set(ParamKind::MinFaceSize, 40.0).unwrap();
        params.save(&path).unwrap();

        let loaded = ModuleParams::load(ModuleKind::FaceLocation, &path).unwrap();
        assert_eq!(loaded.get(ParamKind::MinFaceSize), Some(40.0));
        assert_eq!(loaded, params);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ModuleParams::load(ModuleKind::Pose, &dir.path().join("none.json")).unwrap_err();
        assert_eq!(err.code(), crate::error::ResultCode::SavedDataDoesNotExist);
    }

    #[test]
    fn test_load_rejects_foreign_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pose.json");
        std::fs::write(&path, r#"{"values":{"min_face_size":10.0}}"#).unwrap();
        assert!(ModuleParams::load(ModuleKind::Pose, &path).is_err());
    }

    mod prop {
        use super::*;
        use proptest::prelude::*;

        const PARAMS: [ParamKind; 4] = [
            ParamKind::MinFaceSize,
            ParamKind::RecognitionLiveness,
            ParamKind::PoseGui,
            ParamKind::WindowStep,
        ];

        proptest! {
            #[test]
            fn set_accepts_only_applicable_finite_values(
                kind_index in 0..ModuleKind::ALL.len(),
                param_index in 0..PARAMS.len(),
                value in any::<f32>(),
            ) {
                let kind = ModuleKind::ALL[kind_index];
                let param = PARAMS[param_index];
                let mut params = ModuleParams::with_defaults(kind);
                let before = params.clone();

                let accepted = params.set(param, value).is_ok();
                prop_assert_eq!(accepted, param.applies_to(kind) && value.is_finite());
                if accepted {
                    prop_assert_eq!(params.get(param), Some(value));
                } else {
                    prop_assert_eq!(params, before);
                }
            }
        }
    }
}
