//! Detector implementation shared by all engine-backed modules
//!
//! An [`Engine`] is the algorithm: it loads its model files, runs inference
//! on a frame and knows how to draw its own result. [`EngineDetector`] wraps
//! an engine with the lifecycle, parameter and publishing rules of the
//! [`Detector`] contract, so engine authors only write the algorithm part.

use drishti_core::params::ModuleParams;
use drishti_core::{
    Detector, EventChannel, Frame, ModuleKind, ModuleResources, ModuleState, ParamKind, Payload,
    Result, ResultChannel, VisionError,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A detection algorithm for one module kind.
pub trait Engine: Send + Sized + 'static {
    type Output: Payload;

    const KIND: ModuleKind;

    const VERSION: &'static str = "0.0.0";

    /// Load models from `resources` and prepare for inference.
    fn load(resources: &ModuleResources, params: &ModuleParams) -> Result<Self>;

    /// Apply a parameter change to a live engine. The value has already been
    /// validated for this module kind.
    fn apply_param(&mut self, _param: ParamKind, _value: f32) -> Result<()> {
        Ok(())
    }

    fn infer(&mut self, frame: &Frame) -> Result<Self::Output>;

    /// Annotate `display` with `output`. Only called with a non-empty frame.
    fn draw(&self, _output: &Self::Output, _display: &mut Frame) {}

    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// [`Detector`] over any [`Engine`].
pub struct EngineDetector<E: Engine> {
    resources: ModuleResources,
    params: ModuleParams,
    config_path: Option<PathBuf>,
    engine: Option<E>,
    state: ModuleState,
    channel: EventChannel<E::Output>,
}

impl<E: Engine> EngineDetector<E> {
    pub fn new(resources: ModuleResources) -> Self {
        Self {
            resources,
            params: ModuleParams::with_defaults(E::KIND),
            config_path: None,
            engine: None,
            state: ModuleState::Uninitialized,
            channel: EventChannel::new(),
        }
    }

    pub fn params(&self) -> &ModuleParams {
        &self.params
    }

    pub fn channel(&self) -> &EventChannel<E::Output> {
        &self.channel
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }
}

impl<E: Engine> Detector for EngineDetector<E> {
    fn module_kind(&self) -> ModuleKind {
        E::KIND
    }

    fn state(&self) -> ModuleState {
        self.state
    }

    fn init(&mut self) -> Result<()> {
        if self.engine.is_some() {
            return Err(VisionError::AlreadyInitialized(E::KIND));
        }
        let engine = E::load(&self.resources, &self.params)?;
        info!("{} engine {} loaded", E::KIND, E::VERSION);
        self.engine = Some(engine);
        self.state = ModuleState::Ready;
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        let mut engine = self
            .engine
            .take()
            .ok_or(VisionError::NotInitialized(E::KIND))?;
        self.state = ModuleState::Uninitialized;
        engine.release()
    }

    fn set_param(&mut self, param: ParamKind, value: f32) -> Result<()> {
        self.params.set(param, value)?;
        if let Some(engine) = self.engine.as_mut() {
            engine.apply_param(param, value)?;
        }
        debug!("{} {:?} = {}", E::KIND, param, value);
        Ok(())
    }

    fn detect(&mut self, input: &Frame, display: &mut Frame) -> Result<()> {
        let engine = self
            .engine
            .as_mut()
            .ok_or(VisionError::NotInitialized(E::KIND))?;
        if input.is_empty() {
            return Err(VisionError::ImageEmpty);
        }
        let output = match engine.infer(input) {
            Ok(output) => output,
            Err(e) => {
                self.state = ModuleState::Failed;
                return Err(e);
            }
        };
        if !display.is_empty() {
            engine.draw(&output, display);
        }
        self.state = ModuleState::Ready;
        self.channel.publish(&output);
        Ok(())
    }

    fn load_config(&mut self, path: &Path) -> Result<()> {
        let params = ModuleParams::load(E::KIND, path)?;
        if let Some(engine) = self.engine.as_mut() {
            for (param, value) in params.iter() {
                if let Err(e) = engine.apply_param(param, value) {
                    warn!("{} rejected {:?} from {}: {}", E::KIND, param, path.display(), e);
                }
            }
        }
        self.params = params;
        self.config_path = Some(path.to_path_buf());
        Ok(())
    }

    fn save_config(&self) -> Result<()> {
        let path = self.config_path.as_deref().ok_or_else(|| {
            VisionError::SavedDataDoesNotExist(format!("no configuration loaded for {}", E::KIND))
        })?;
        self.params.save(path)
    }

    fn result_channel(&self) -> ResultChannel<'_> {
        <E::Output as Payload>::tag(E::KIND, &self.channel)
    }

    fn version(&self) -> &str {
        E::VERSION
    }
}

impl<E: Engine> Drop for EngineDetector<E> {
    fn drop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            if let Err(e) = engine.release() {
                warn!("{} engine release failed: {}", E::KIND, e);
            }
        }
    }
}
