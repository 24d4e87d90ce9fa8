//! Public facade over the orchestrator

use drishti_core::{
    CameraProperty, CameraState, Emotion, ModuleKind, ModuleState, ParamKind, PersonInfo, Point2D,
    Rect, Result, Subscription, VisionConfig, VisionError,
};
use std::path::Path;
use tracing::{info, warn};

use crate::capture::{self, VideoSource};
use crate::factory::DetectorFactory;
use crate::orchestrator::{FrameGuard, ModuleStatus, Orchestrator, TickReport};

/// Entry point for applications embedding the vision pipeline.
///
/// ```no_run
/// use drishti_eye::{DetectorFactory, Vision};
/// use drishti_core::{ModuleKind, VisionConfig};
///
/// let vision = Vision::new(VisionConfig::default(), DetectorFactory::new())?;
/// let _objects = vision.on_objects_found(|names| println!("{:?}", names));
/// vision.set_resource_path("/opt/drishti")?;
/// vision.init_module(ModuleKind::Object)?;
/// vision.open_camera(0);
/// loop {
///     vision.tick();
/// }
/// # Ok::<(), drishti_core::VisionError>(())
/// ```
pub struct Vision {
    inner: Orchestrator,
}

impl Vision {
    /// Validate `config` and build a pipeline reading from the source it names.
    pub fn new(config: VisionConfig, factory: DetectorFactory) -> Result<Self> {
        let source = capture::from_config(&config.camera);
        Self::with_source(config, factory, source)
    }

    pub fn with_source(
        config: VisionConfig,
        factory: DetectorFactory,
        source: Box<dyn VideoSource>,
    ) -> Result<Self> {
        config.validate().map_err(VisionError::Config)?;
        let root = config.resources.root.clone();
        let vision = Self {
            inner: Orchestrator::new(config, factory, source),
        };
        if let Some(root) = root {
            vision.set_resource_path(root)?;
        }
        Ok(vision)
    }

    /// Initialize every module listed in the configuration, in order.
    pub fn init_configured_modules(&self) -> Vec<(ModuleKind, Result<()>)> {
        let kinds = self.inner.config().modules.clone();
        kinds
            .into_iter()
            .map(|kind| {
                let result = self.init_module(kind);
                if let Err(e) = &result {
                    warn!("Configured module {} not started: {}", kind, e);
                }
                (kind, result)
            })
            .collect()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.inner
    }

    pub fn open_camera(&self, index: u32) -> bool {
        self.inner.open_camera(index)
    }

    /// Open the device named in the configuration.
    pub fn open_configured_camera(&self) -> bool {
        self.inner.open_camera(self.inner.config().camera.camera_id)
    }

    pub fn close_camera(&self) {
        self.inner.close_camera()
    }

    pub fn set_camera_param(&self, prop: CameraProperty, value: f64) -> bool {
        self.inner.set_camera_param(prop, value)
    }

    pub fn get_camera_param(&self, prop: CameraProperty) -> f64 {
        self.inner.get_camera_param(prop)
    }

    pub fn init_module(&self, kind: ModuleKind) -> Result<()> {
        self.inner.init_module(kind)
    }

    pub fn anti_module(&self, kind: ModuleKind) -> Result<()> {
        self.inner.anti_module(kind)
    }

    pub fn set_module_param(&self, kind: ModuleKind, param: ParamKind, value: f32) -> Result<()> {
        self.inner.set_module_param(kind, param, value)
    }

    pub fn load_module_config(&self, kind: ModuleKind, path: impl AsRef<Path>) -> Result<()> {
        self.inner.load_module_config(kind, path)
    }

    pub fn save_module_config(&self, kind: ModuleKind) -> Result<()> {
        self.inner.save_module_config(kind)
    }

    pub fn set_show_flag(&self, kind: ModuleKind, show: bool) {
        self.inner.set_show_flag(kind, show)
    }

    pub fn tick(&self) -> TickReport {
        self.inner.tick()
    }

    pub fn image_width(&self) -> u32 {
        self.inner.image_width()
    }

    pub fn image_height(&self) -> u32 {
        self.inner.image_height()
    }

    /// Display frame of the last tick. Drop the guard before the next tick.
    pub fn image_data(&self) -> FrameGuard<'_> {
        self.inner.image_data()
    }

    pub fn set_resource_path(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.set_resource_path(path)
    }

    pub fn modules(&self) -> Vec<ModuleKind> {
        self.inner.modules()
    }

    pub fn module_state(&self, kind: ModuleKind) -> Option<ModuleState> {
        self.inner.module_state(kind)
    }

    pub fn module_status(&self) -> Vec<ModuleStatus> {
        self.inner.module_status()
    }

    /// Library version
    pub fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }

    pub fn detection_module_version(&self, kind: ModuleKind) -> String {
        self.inner.module_version(kind)
    }

    pub fn on_objects_found<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<String>) + Send + Sync + 'static,
    {
        self.inner.events().objects_found.connect(callback)
    }

    pub fn on_person_found<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.events().person_found.connect(move |_| callback())
    }

    pub fn on_friends_found<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<PersonInfo>) + Send + Sync + 'static,
    {
        self.inner.events().friends_found.connect(callback)
    }

    pub fn on_camera_state<F>(&self, callback: F) -> Subscription
    where
        F: Fn(CameraState) + Send + Sync + 'static,
    {
        self.inner
            .events()
            .camera_state
            .connect(move |state| callback(*state))
    }

    pub fn on_emotion_state<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<Emotion>) + Send + Sync + 'static,
    {
        self.inner.events().emotion_state.connect(callback)
    }

    pub fn on_faces_located<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<Rect>) + Send + Sync + 'static,
    {
        self.inner.events().faces_located.connect(callback)
    }

    pub fn on_pose_found<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<Point2D>) + Send + Sync + 'static,
    {
        self.inner.events().pose_found.connect(callback)
    }

    pub fn on_face_compared<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.inner
            .events()
            .face_compared
            .connect(move |matched| callback(*matched))
    }

    pub fn on_landmarks_found<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Vec<Point2D>) + Send + Sync + 'static,
    {
        self.inner.events().landmarks_found.connect(callback)
    }
}

impl Drop for Vision {
    fn drop(&mut self) {
        info!("Shutting down vision pipeline");
    }
}
