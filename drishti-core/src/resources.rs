//! Resource layout and per-module dependency resolution
//!
//! Every module kind lists the files (or directories) its engine needs,
//! relative to the resource root. [`ResourcePaths`] is resolved once from a
//! root directory and handed to the detector factory; nothing here is global.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{MissingResource, Result, VisionError};
use crate::kinds::ModuleKind;

/// Directory under the resource root holding all module dependencies.
pub const RESOURCE_DIR: &str = "ComputerVision-Res";

/// Directory under the resource root reserved for engine logs.
pub const LOG_DIR: &str = "Log";

/// One required dependency of a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Path relative to the resource root
    pub path: PathBuf,
    /// Reported when the path is missing
    pub missing: MissingResource,
    #[serde(default)]
    pub is_dir: bool,
}

impl Dependency {
    fn file(path: PathBuf, missing: MissingResource) -> Self {
        Self {
            path,
            missing,
            is_dir: false,
        }
    }

    fn dir(path: PathBuf, missing: MissingResource) -> Self {
        Self {
            path,
            missing,
            is_dir: true,
        }
    }
}

/// Dependencies of every module kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceLayout {
    modules: BTreeMap<ModuleKind, Vec<Dependency>>,
}

impl Default for ResourceLayout {
    fn default() -> Self {
        let res = Path::new(RESOURCE_DIR);
        let object = res.join("ObjectDetection").join("Dependents");
        let pose = res
            .join("PoseDetection")
            .join("Dependents")
            .join("models")
            .join("pose")
            .join("body_25");
        let face = res.join("FaceDetection").join("Dependents").join("model");
        let landmark = res.join("FaceLandmark").join("Dependents");
        let emotion = res.join("EmotionDetection").join("Dependents");

        let mut modules = BTreeMap::new();
        modules.insert(
            ModuleKind::Object,
            vec![
                Dependency::file(object.join("data").join("coco.names"), MissingResource::Data),
                Dependency::file(object.join("cfg").join("yolov3.cfg"), MissingResource::Cfg),
                Dependency::file(
                    object.join("weight").join("yolov3.weights"),
                    MissingResource::Weight,
                ),
            ],
        );
        modules.insert(
            ModuleKind::Pose,
            vec![
                Dependency::dir(pose.clone(), MissingResource::Model),
                Dependency::file(pose.join("pose_deploy.prototxt"), MissingResource::Prototxt),
                Dependency::file(
                    pose.join("pose_iter_584000.caffemodel"),
                    MissingResource::CaffeModel,
                ),
            ],
        );
        modules.insert(
            ModuleKind::FaceLocation,
            vec![Dependency::file(
                face.join("seeta_fd_frontal_v1.0.bin"),
                MissingResource::Model,
            )],
        );
        modules.insert(
            ModuleKind::FaceLandmark,
            vec![
                Dependency::file(
                    landmark.join("roboman-landmark-model.bin"),
                    MissingResource::Model,
                ),
                Dependency::file(
                    landmark.join("haar_roboman_ff_alt2.xml"),
                    MissingResource::Model,
                ),
            ],
        );
        modules.insert(
            ModuleKind::Emotion,
            vec![
                Dependency::file(
                    emotion.join("seeta_fd_frontal_v1.0.bin"),
                    MissingResource::FaceCascade,
                ),
                Dependency::file(
                    emotion.join("haarcascade_smile.xml"),
                    MissingResource::EmotionCascade,
                ),
            ],
        );
        // Vendor SDK modules activate online and ship no files.
        modules.insert(ModuleKind::FaceCompare, Vec::new());
        modules.insert(ModuleKind::FaceRecognition, Vec::new());

        Self { modules }
    }
}

impl ResourceLayout {
    pub fn dependencies(&self, kind: ModuleKind) -> &[Dependency] {
        self.modules.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Replace the dependency list of one module kind.
    pub fn set_dependencies(&mut self, kind: ModuleKind, dependencies: Vec<Dependency>) {
        self.modules.insert(kind, dependencies);
    }

    /// Merge `overrides` into this layout, replacing whole per-kind lists.
    pub fn merge(&mut self, overrides: &BTreeMap<ModuleKind, Vec<Dependency>>) {
        for (kind, deps) in overrides {
            self.modules.insert(*kind, deps.clone());
        }
    }
}

/// Resolved dependency paths of one module kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleResources {
    pub kind: ModuleKind,
    pub root: PathBuf,
    /// Absolute dependency paths, in layout order
    pub files: Vec<PathBuf>,
}

impl ModuleResources {
    /// First dependency whose file name is `name`.
    pub fn find(&self, name: &str) -> Option<&Path> {
        self.files
            .iter()
            .find(|p| p.file_name().map_or(false, |n| n == name))
            .map(PathBuf::as_path)
    }
}

/// Resource root plus the layout, resolved against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePaths {
    root: PathBuf,
    layout: ResourceLayout,
}

impl ResourcePaths {
    /// Validate `root` and bind it to `layout`.
    pub fn resolve(root: impl AsRef<Path>, layout: ResourceLayout) -> Result<Self> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(VisionError::FolderNotExist(root.display().to_string()));
        }
        debug!("Resource root resolved to {}", root.display());
        Ok(Self {
            root: root.to_path_buf(),
            layout,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_dir(&self) -> PathBuf {
        self.root.join(LOG_DIR)
    }

    pub fn layout(&self) -> &ResourceLayout {
        &self.layout
    }

    /// Check every dependency of `kind` on disk and return the resolved paths.
    ///
    /// The first missing dependency decides the error.
    pub fn module(&self, kind: ModuleKind) -> Result<ModuleResources> {
        let mut files = Vec::new();
        for dep in self.layout.dependencies(kind) {
            let path = self.root.join(&dep.path);
            let present = if dep.is_dir { path.is_dir() } else { path.is_file() };
            if !present {
                return Err(VisionError::ResourceMissing {
                    kind,
                    resource: dep.missing,
                    path: path.display().to_string(),
                });
            }
            files.push(path);
        }
        Ok(ModuleResources {
            kind,
            root: self.root.clone(),
            files,
        })
    }

    /// Dependency status of every module kind.
    pub fn report(&self) -> Vec<(ModuleKind, Result<ModuleResources>)> {
        ModuleKind::ALL
            .iter()
            .map(|kind| (*kind, self.module(*kind)))
            .collect()
    }
}

/// Create every dependency of `kinds` under `root` as empty files. Used to lay
/// out fixture trees.
pub fn materialize(root: &Path, layout: &ResourceLayout, kinds: &[ModuleKind]) -> Result<()> {
    for kind in kinds {
        for dep in layout.dependencies(*kind) {
            let path = root.join(&dep.path);
            if dep.is_dir {
                std::fs::create_dir_all(&path)?;
            } else {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                if !path.exists() {
                    std::fs::write(&path, b"")?;
                }
            }
        }
    }
    Ok(())
}
