//! Scripted engines and detectors shared by the integration tests

#![allow(dead_code)]

use drishti_core::params::ModuleParams;
use drishti_core::resources::{materialize, ResourceLayout};
use drishti_core::{
    Detector, EventChannel, Frame, ModuleKind, ModuleResources, ModuleState, ParamKind, Rect,
    Result, ResultChannel, VisionError,
};
use drishti_eye::Engine;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;

/// Labels every frame with a single "person".
pub struct PersonLabeler;

impl Engine for PersonLabeler {
    type Output = Vec<String>;
    const KIND: ModuleKind = ModuleKind::Object;
    const VERSION: &'static str = "3.0.0";

    fn load(_resources: &ModuleResources, _params: &ModuleParams) -> Result<Self> {
        Ok(PersonLabeler)
    }

    fn infer(&mut self, _frame: &Frame) -> Result<Vec<String>> {
        Ok(vec!["person".to_string()])
    }
}

/// Finds one face in the centre of every frame and outlines it.
pub struct CentreFace;

impl Engine for CentreFace {
    type Output = Vec<Rect>;
    const KIND: ModuleKind = ModuleKind::FaceLocation;
    const VERSION: &'static str = "1.0.0";

    fn load(_resources: &ModuleResources, _params: &ModuleParams) -> Result<Self> {
        Ok(CentreFace)
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<Rect>> {
        let (w, h) = (frame.width(), frame.height());
        Ok(vec![Rect::new((w / 4) as i32, (h / 4) as i32, w / 2, h / 2)])
    }

    fn draw(&self, output: &Vec<Rect>, display: &mut Frame) {
        drishti_core::frame::overlay::draw_rects(
            display,
            output,
            drishti_core::frame::overlay::BOX_COLOR,
        );
    }
}

/// Detector whose behaviour is scripted by the test. Every call is appended
/// to a shared log as "<Kind>.<op>".
pub struct ScriptedDetector {
    pub kind: ModuleKind,
    pub log: Arc<Mutex<Vec<String>>>,
    pub fail_detect: bool,
    pub fail_shutdown: bool,
    pub fail_init: bool,
    state: ModuleState,
    channel: EventChannel<Vec<String>>,
}

impl ScriptedDetector {
    pub fn new(kind: ModuleKind, log: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            kind,
            log,
            fail_detect: false,
            fail_shutdown: false,
            fail_init: false,
            state: ModuleState::Uninitialized,
            channel: EventChannel::new(),
        }
    }

    fn record(&self, op: &str) {
        self.log.lock().push(format!("{}.{}", self.kind, op));
    }
}

impl Detector for ScriptedDetector {
    fn module_kind(&self) -> ModuleKind {
        self.kind
    }

    fn state(&self) -> ModuleState {
        self.state
    }

    fn init(&mut self) -> Result<()> {
        self.record("init");
        if self.fail_init {
            return Err(VisionError::Engine(drishti_core::EngineFault::InitFailed));
        }
        self.state = ModuleState::Ready;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.record("shutdown");
        self.state = ModuleState::Uninitialized;
        if self.fail_shutdown {
            return Err(VisionError::Engine(drishti_core::EngineFault::UninitFailed));
        }
        Ok(())
    }

    fn set_param(&mut self, param: ParamKind, _value: f32) -> Result<()> {
        self.record(&format!("{:?}", param));
        Ok(())
    }

    fn detect(&mut self, input: &Frame, _display: &mut Frame) -> Result<()> {
        self.record("detect");
        if input.is_empty() {
            return Err(VisionError::ImageEmpty);
        }
        if self.fail_detect {
            return Err(VisionError::Failed("scripted failure".to_string()));
        }
        self.channel.publish(&vec![self.kind.to_string()]);
        Ok(())
    }

    fn load_config(&mut self, _path: &Path) -> Result<()> {
        Ok(())
    }

    fn save_config(&self) -> Result<()> {
        Ok(())
    }

    fn result_channel(&self) -> ResultChannel<'_> {
        ResultChannel::Objects(&self.channel)
    }
}

/// Lay out every dependency of `kinds` under `root`.
pub fn resource_tree(root: &Path, kinds: &[ModuleKind]) {
    materialize(root, &ResourceLayout::default(), kinds).unwrap();
}
