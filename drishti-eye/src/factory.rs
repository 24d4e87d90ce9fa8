//! Construction of detectors by module kind

use drishti_core::{Detector, ModuleKind, ModuleResources, ResourcePaths, Result, VisionError};
use std::collections::HashMap;
use std::fmt;

use crate::engine::{Engine, EngineDetector};

type Constructor = Box<dyn Fn(ModuleResources) -> Result<Box<dyn Detector>> + Send + Sync>;

struct Registration {
    version: String,
    construct: Constructor,
}

/// Maps each module kind to the constructor of its detector.
#[derive(Default)]
pub struct DetectorFactory {
    registrations: HashMap<ModuleKind, Registration>,
}

impl DetectorFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `kind`, replacing any previous one.
    pub fn register<F>(&mut self, kind: ModuleKind, version: impl Into<String>, construct: F)
    where
        F: Fn(ModuleResources) -> Result<Box<dyn Detector>> + Send + Sync + 'static,
    {
        self.registrations.insert(
            kind,
            Registration {
                version: version.into(),
                construct: Box::new(construct),
            },
        );
    }

    /// Register engine `E` for its module kind.
    pub fn register_engine<E: Engine>(&mut self) {
        self.register(E::KIND, E::VERSION, |resources| {
            Ok(Box::new(EngineDetector::<E>::new(resources)) as Box<dyn Detector>)
        });
    }

    /// Builder form of [`register_engine`](Self::register_engine).
    pub fn with_engine<E: Engine>(mut self) -> Self {
        self.register_engine::<E>();
        self
    }

    pub fn is_registered(&self, kind: ModuleKind) -> bool {
        self.registrations.contains_key(&kind)
    }

    /// Version of the engine registered for `kind`, "0.0.0" when none is.
    pub fn version(&self, kind: ModuleKind) -> &str {
        self.registrations
            .get(&kind)
            .map(|r| r.version.as_str())
            .unwrap_or("0.0.0")
    }

    /// Verify the dependencies of `kind` under `paths` and build a detector.
    pub fn create(&self, kind: ModuleKind, paths: &ResourcePaths) -> Result<Box<dyn Detector>> {
        let resources = paths.module(kind)?;
        let registration = self
            .registrations
            .get(&kind)
            .ok_or(VisionError::EngineUnavailable(kind))?;
        let detector = (registration.construct)(resources)?;
        if detector.module_kind() != kind {
            return Err(VisionError::Failed(format!(
                "constructor for {} built a {} detector",
                kind,
                detector.module_kind()
            )));
        }
        Ok(detector)
    }
}

impl fmt::Debug for DetectorFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.registrations.keys().collect();
        kinds.sort();
        f.debug_struct("DetectorFactory").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drishti_core::params::ModuleParams;
    use drishti_core::resources::{materialize, ResourceLayout};
    use drishti_core::{Frame, ResultCode};

    struct Labels;

    impl Engine for Labels {
        type Output = Vec<String>;
        const KIND: ModuleKind = ModuleKind::Object;
        const VERSION: &'static str = "3.0.1";

        fn load(resources: &ModuleResources, _params: &ModuleParams) -> Result<Self> {
            assert!(resources.find("coco.names").is_some());
            Ok(Labels)
        }

        fn infer(&mut self, _frame: &Frame) -> Result<Vec<String>> {
            Ok(vec!["person".to_string()])
        }
    }

    #[test]
    fn test_version_defaults() {
        let factory = DetectorFactory::new().with_engine::<Labels>();
        assert_eq!(factory.version(ModuleKind::Object), "3.0.1");
        assert_eq!(factory.version(ModuleKind::Pose), "0.0.0");
        assert!(factory.is_registered(ModuleKind::Object));
        assert!(!factory.is_registered(ModuleKind::Emotion));
    }

    #[test]
    fn test_create_checks_resources_first() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ResourcePaths::resolve(dir.path(), ResourceLayout::default()).unwrap();
        let factory = DetectorFactory::new().with_engine::<Labels>();
        let err = factory.create(ModuleKind::Object, &paths).unwrap_err();
        assert_eq!(err.code(), ResultCode::DataFileNotExist);
    }

    #[test]
    fn test_create_without_engine() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ResourcePaths::resolve(dir.path(), ResourceLayout::default()).unwrap();
        let err = DetectorFactory::new()
            .create(ModuleKind::FaceCompare, &paths)
            .unwrap_err();
        assert!(matches!(err, VisionError::EngineUnavailable(ModuleKind::FaceCompare)));
    }

    #[test]
    fn test_create_builds_detector() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResourceLayout::default();
        materialize(dir.path(), &layout, &[ModuleKind::Object]).unwrap();
        let paths = ResourcePaths::resolve(dir.path(), layout).unwrap();

        let factory = DetectorFactory::new().with_engine::<Labels>();
        let mut detector = factory.create(ModuleKind::Object, &paths).unwrap();
        assert_eq!(detector.module_kind(), ModuleKind::Object);
        detector.init().unwrap();

        let debug = format!("{:?}", detector);
        assert!(debug.contains("Object"));
        assert!(debug.contains("Ready"));
        assert!(debug.contains("3.0.1"));
    }

    #[test]
    fn test_mismatched_constructor_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ResourceLayout::default();
        materialize(dir.path(), &layout, &[ModuleKind::Object]).unwrap();
        let paths = ResourcePaths::resolve(dir.path(), layout).unwrap();

        let mut factory = DetectorFactory::new();
        factory.register(ModuleKind::FaceCompare, "1.0", |_| {
            let resources = ModuleResources {
                kind: ModuleKind::Object,
                root: std::path::PathBuf::new(),
                files: Vec::new(),
            };
            Ok(Box::new(EngineDetector::<Labels>::new(resources)) as Box<dyn Detector>)
        });
        let err = factory.create(ModuleKind::FaceCompare, &paths).unwrap_err();
        assert_eq!(err.code(), ResultCode::Ng);
    }
}
