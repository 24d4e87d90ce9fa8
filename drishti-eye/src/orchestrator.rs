//! Detector registry and per-frame dispatch
//!
//! The [`Orchestrator`] owns the capture source, the detect/display frame
//! pair and an ordered registry of detectors, all behind one lock. Each
//! [`tick`](Orchestrator::tick) reads a frame and runs every registered
//! detector on it in registration order. Detector results are relayed onto
//! the orchestrator's outward [`VisionEvents`] channels.
//!
//! Callbacks fired during a tick run while the lock is held; they must not
//! call back into the same orchestrator.

use chrono::{DateTime, Utc};
use drishti_core::{
    CameraProperty, CameraState, Detector, Emotion, EventChannel, Frame, ModuleKind, ModuleState,
    ParamKind, Payload, PersonInfo, Point2D, Rect, ResourceLayout, ResourcePaths, Result,
    ResultChannel, ResultCode, Subscription, VisionConfig, VisionError,
};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::capture::VideoSource;
use crate::factory::DetectorFactory;

/// Outward result channels. Subscribing here is how consumers see results.
#[derive(Debug, Default)]
pub struct VisionEvents {
    pub objects_found: EventChannel<Vec<String>>,
    pub pose_found: EventChannel<Vec<Point2D>>,
    pub faces_located: EventChannel<Vec<Rect>>,
    pub face_compared: EventChannel<bool>,
    pub friends_found: EventChannel<Vec<PersonInfo>>,
    pub landmarks_found: EventChannel<Vec<Point2D>>,
    pub emotion_state: EventChannel<Vec<Emotion>>,
    /// Raised when a face or a known person shows up
    pub person_found: EventChannel<()>,
    pub camera_state: EventChannel<CameraState>,
}

impl VisionEvents {
    /// Forward everything `channel` publishes to the outward channel of the
    /// same shape.
    fn relay(&self, channel: ResultChannel<'_>) -> Subscription {
        match channel {
            ResultChannel::Objects(ch) => forward(ch, &self.objects_found, None),
            ResultChannel::Poses(ch) => forward(ch, &self.pose_found, None),
            ResultChannel::Faces(ch) => {
                forward(ch, &self.faces_located, Some(&self.person_found))
            }
            ResultChannel::Compare(ch) => forward(ch, &self.face_compared, None),
            ResultChannel::Persons(ch) => {
                forward(ch, &self.friends_found, Some(&self.person_found))
            }
            ResultChannel::Landmarks(ch) => forward(ch, &self.landmarks_found, None),
            ResultChannel::Emotions(ch) => forward(ch, &self.emotion_state, None),
        }
    }
}

fn forward<T: Payload>(
    source: &EventChannel<T>,
    target: &EventChannel<T>,
    on_hit: Option<&EventChannel<()>>,
) -> Subscription {
    let target = target.publisher();
    let on_hit = on_hit.map(EventChannel::publisher);
    source.connect(move |value: &T| {
        target.publish(value);
        if let Some(hit) = &on_hit {
            if value.is_hit() {
                hit.publish(&());
            }
        }
    })
}

/// Detect outcome of one module during a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModuleOutcome {
    pub kind: ModuleKind,
    pub code: ResultCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TickOutcome {
    /// A frame was read and handed to every module, in order
    Dispatched(Vec<ModuleOutcome>),
    /// The source was not open; the camera-lost event was raised
    CameraLost,
    /// The source is open but produced no frame
    NoFrame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub at: DateTime<Utc>,
    pub outcome: TickOutcome,
}

impl TickReport {
    fn new(outcome: TickOutcome) -> Self {
        Self {
            at: Utc::now(),
            outcome,
        }
    }

    /// Modules whose detect call failed this tick
    pub fn failures(&self) -> Vec<ModuleOutcome> {
        match &self.outcome {
            TickOutcome::Dispatched(outcomes) => {
                outcomes.iter().filter(|o| !o.code.is_ok()).copied().collect()
            }
            _ => Vec::new(),
        }
    }
}

struct ModuleEntry {
    kind: ModuleKind,
    state: ModuleState,
    detect_calls: u64,
    detect_failures: u64,
    // Declared before the detector so it is dropped first.
    _relay: Subscription,
    detector: Box<dyn Detector>,
}

/// Snapshot of one registered module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModuleStatus {
    pub kind: ModuleKind,
    pub state: ModuleState,
    pub show: bool,
    pub detect_calls: u64,
    pub detect_failures: u64,
    pub version: String,
}

#[derive(Default)]
struct CameraFrames {
    /// Scratch buffer the source reads into
    capture: Frame,
    detect: Frame,
    display: Frame,
}

struct Monitor {
    source: Box<dyn VideoSource>,
    frames: CameraFrames,
    modules: Vec<ModuleEntry>,
    show: HashMap<ModuleKind, bool>,
    resources: Option<ResourcePaths>,
    layout: ResourceLayout,
}

impl Monitor {
    fn position(&self, kind: ModuleKind) -> Option<usize> {
        self.modules.iter().position(|m| m.kind == kind)
    }

    fn entry_mut(&mut self, kind: ModuleKind) -> Result<&mut ModuleEntry> {
        self.modules
            .iter_mut()
            .find(|m| m.kind == kind)
            .ok_or(VisionError::DetectorNotExist(kind))
    }

    fn show_flag(&self, kind: ModuleKind) -> bool {
        self.show.get(&kind).copied().unwrap_or(true)
    }

    fn dispatch(&mut self) -> TickOutcome {
        let Monitor {
            source,
            frames,
            modules,
            show,
            ..
        } = self;

        match source.read(&mut frames.capture) {
            Ok(true) if !frames.capture.is_empty() => {}
            Ok(_) => return TickOutcome::NoFrame,
            Err(e) => {
                warn!("Frame read failed: {}", e);
                return TickOutcome::NoFrame;
            }
        }
        std::mem::swap(&mut frames.capture, &mut frames.detect);
        frames.display.copy_from(&frames.detect);

        let mut hidden = Frame::default();
        let mut outcomes = Vec::with_capacity(modules.len());
        for entry in modules.iter_mut() {
            let display = if show.get(&entry.kind).copied().unwrap_or(true) {
                &mut frames.display
            } else {
                hidden.clear();
                &mut hidden
            };
            entry.detect_calls += 1;
            let result = entry.detector.detect(&frames.detect, display);
            match &result {
                Ok(()) => entry.state = ModuleState::Ready,
                Err(e) => {
                    entry.state = ModuleState::Failed;
                    entry.detect_failures += 1;
                    warn!("{} detect failed: {}", entry.kind, e);
                }
            }
            outcomes.push(ModuleOutcome {
                kind: entry.kind,
                code: ResultCode::from(&result),
            });
        }
        TickOutcome::Dispatched(outcomes)
    }
}

/// Read access to the display frame. Holding it blocks [`Orchestrator::tick`].
pub struct FrameGuard<'a> {
    guard: MutexGuard<'a, Monitor>,
}

impl Deref for FrameGuard<'_> {
    type Target = Frame;

    fn deref(&self) -> &Frame {
        &self.guard.frames.display
    }
}

/// Registry of detectors plus the tick loop that feeds them.
pub struct Orchestrator {
    monitor: Mutex<Monitor>,
    factory: DetectorFactory,
    events: VisionEvents,
    config: VisionConfig,
}

impl Orchestrator {
    pub fn new(config: VisionConfig, factory: DetectorFactory, source: Box<dyn VideoSource>) -> Self {
        let show = config
            .show
            .iter()
            .map(|(kind, flag)| (*kind, *flag))
            .collect();
        let layout = config.resources.layout();
        Self {
            monitor: Mutex::new(Monitor {
                source,
                frames: CameraFrames::default(),
                modules: Vec::new(),
                show,
                resources: None,
                layout,
            }),
            factory,
            events: VisionEvents::default(),
            config,
        }
    }

    pub fn events(&self) -> &VisionEvents {
        &self.events
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }

    pub fn factory(&self) -> &DetectorFactory {
        &self.factory
    }

    /// Validate `path` and bind the per-module dependency layout to it.
    pub fn set_resource_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut monitor = self.monitor.lock();
        let resources = ResourcePaths::resolve(path, monitor.layout.clone())?;
        for (kind, status) in resources.report() {
            match status {
                Ok(_) => debug!("{} dependencies present", kind),
                Err(e) => debug!("{} unavailable: {}", kind, e),
            }
        }
        info!("Resource path set to {}", path.display());
        monitor.resources = Some(resources);
        Ok(())
    }

    /// Construct, initialize and register the detector for `kind`.
    ///
    /// On any failure the registry is left unchanged.
    pub fn init_module(&self, kind: ModuleKind) -> Result<()> {
        let mut monitor = self.monitor.lock();
        if monitor.position(kind).is_some() {
            return Err(VisionError::DetectorAlreadyExists(kind));
        }
        let resources = monitor
            .resources
            .as_ref()
            .ok_or(VisionError::DataPathNotSet)?;

        let mut detector = self.factory.create(kind, resources)?;
        detector.init()?;

        for setting in self.config.params.iter().filter(|s| s.module == kind) {
            if let Err(e) = detector.set_param(setting.param, setting.value) {
                warn!("{} rejected configured {:?}: {}", kind, setting.param, e);
            }
        }

        let relay = self.events.relay(detector.result_channel());
        monitor.modules.push(ModuleEntry {
            kind,
            state: ModuleState::Ready,
            detect_calls: 0,
            detect_failures: 0,
            _relay: relay,
            detector,
        });
        info!("{} module initialized", kind);
        Ok(())
    }

    /// Shut down and unregister the detector for `kind`.
    ///
    /// The entry is removed even when shutdown fails; that error is returned.
    pub fn anti_module(&self, kind: ModuleKind) -> Result<()> {
        let mut monitor = self.monitor.lock();
        let index = monitor
            .position(kind)
            .ok_or(VisionError::DetectorNotExist(kind))?;
        let mut entry = monitor.modules.remove(index);
        let result = entry.detector.shutdown();
        match &result {
            Ok(()) => info!("{} module removed", kind),
            Err(e) => warn!("{} module removed, shutdown failed: {}", kind, e),
        }
        result
    }

    pub fn set_module_param(&self, kind: ModuleKind, param: ParamKind, value: f32) -> Result<()> {
        self.monitor
            .lock()
            .entry_mut(kind)?
            .detector
            .set_param(param, value)
    }

    pub fn load_module_config(&self, kind: ModuleKind, path: impl AsRef<Path>) -> Result<()> {
        self.monitor
            .lock()
            .entry_mut(kind)?
            .detector
            .load_config(path.as_ref())
    }

    pub fn save_module_config(&self, kind: ModuleKind) -> Result<()> {
        self.monitor.lock().entry_mut(kind)?.detector.save_config()
    }

    /// When `show` is false the module still runs but gets no frame to draw on.
    pub fn set_show_flag(&self, kind: ModuleKind, show: bool) {
        self.monitor.lock().show.insert(kind, show);
    }

    pub fn show_flag(&self, kind: ModuleKind) -> bool {
        self.monitor.lock().show_flag(kind)
    }

    /// Read one frame and run every registered detector on it.
    pub fn tick(&self) -> TickReport {
        let outcome = {
            let mut monitor = self.monitor.lock();
            if monitor.source.is_opened() {
                monitor.dispatch()
            } else {
                TickOutcome::CameraLost
            }
        };
        if outcome == TickOutcome::CameraLost {
            debug!("Tick without an open capture source");
            self.events.camera_state.publish(&CameraState::Lost);
        }
        TickReport::new(outcome)
    }

    /// Open capture device `index` and apply the configured capture settings.
    pub fn open_camera(&self, index: u32) -> bool {
        let opened = {
            let mut monitor = self.monitor.lock();
            if monitor.source.is_opened() {
                return true;
            }
            match monitor.source.open(index) {
                Ok(()) => {
                    let camera = &self.config.camera;
                    let requested = [
                        (CameraProperty::FrameWidth, camera.resolution.0 as f64),
                        (CameraProperty::FrameHeight, camera.resolution.1 as f64),
                        (CameraProperty::Fps, camera.frame_rate as f64),
                    ];
                    for (prop, value) in requested {
                        if !monitor.source.set(prop, value) {
                            debug!("Capture source ignored {:?} = {}", prop, value);
                        }
                    }
                    info!("Camera {} opened", index);
                    true
                }
                Err(e) => {
                    warn!("Failed to open camera {}: {}", index, e);
                    false
                }
            }
        };
        if opened {
            self.events.camera_state.publish(&CameraState::Opened);
        }
        opened
    }

    pub fn close_camera(&self) {
        let was_open = {
            let mut monitor = self.monitor.lock();
            let was_open = monitor.source.is_opened();
            monitor.source.release();
            was_open
        };
        if was_open {
            info!("Camera closed");
            self.events.camera_state.publish(&CameraState::Closed);
        }
    }

    pub fn is_camera_open(&self) -> bool {
        self.monitor.lock().source.is_opened()
    }

    pub fn set_camera_param(&self, prop: CameraProperty, value: f64) -> bool {
        self.monitor.lock().source.set(prop, value)
    }

    pub fn get_camera_param(&self, prop: CameraProperty) -> f64 {
        self.monitor.lock().source.get(prop)
    }

    pub fn image_width(&self) -> u32 {
        self.monitor.lock().frames.display.width()
    }

    pub fn image_height(&self) -> u32 {
        self.monitor.lock().frames.display.height()
    }

    /// Borrow the display frame until the guard is dropped.
    pub fn image_data(&self) -> FrameGuard<'_> {
        FrameGuard {
            guard: self.monitor.lock(),
        }
    }

    /// Owned copy of the display frame
    pub fn snapshot(&self) -> Frame {
        self.monitor.lock().frames.display.clone()
    }

    /// Registered kinds, in dispatch order
    pub fn modules(&self) -> Vec<ModuleKind> {
        self.monitor.lock().modules.iter().map(|m| m.kind).collect()
    }

    pub fn module_state(&self, kind: ModuleKind) -> Option<ModuleState> {
        let monitor = self.monitor.lock();
        monitor.modules.iter().find(|m| m.kind == kind).map(|m| m.state)
    }

    pub fn module_status(&self) -> Vec<ModuleStatus> {
        let monitor = self.monitor.lock();
        monitor
            .modules
            .iter()
            .map(|m| ModuleStatus {
                kind: m.kind,
                state: m.state,
                show: monitor.show_flag(m.kind),
                detect_calls: m.detect_calls,
                detect_failures: m.detect_failures,
                version: m.detector.version().to_string(),
            })
            .collect()
    }

    /// Version of the engine behind `kind`, "0.0.0" when none is available.
    pub fn module_version(&self, kind: ModuleKind) -> String {
        let monitor = self.monitor.lock();
        match monitor.modules.iter().find(|m| m.kind == kind) {
            Some(m) => m.detector.version().to_string(),
            None => self.factory.version(kind).to_string(),
        }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        let monitor = self.monitor.get_mut();
        for mut entry in monitor.modules.drain(..) {
            if let Err(e) = entry.detector.shutdown() {
                debug!("{} shutdown on drop: {}", entry.kind, e);
            }
        }
        monitor.source.release();
    }
}
