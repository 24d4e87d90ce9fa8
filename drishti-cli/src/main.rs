// Drishti command line interface
// Runs the vision pipeline from a config file and inspects resource trees

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use drishti_core::resources::ResourcePaths;
use drishti_core::{ModuleKind, ResultCode, VisionConfig};
use drishti_eye::{DetectorFactory, TickOutcome, Vision};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "drishti")]
#[command(about = "Drishti - multi-model vision pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML or JSON)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the tick loop
    Run {
        /// Play back a directory of images instead of a camera
        #[arg(long)]
        frames_dir: Option<PathBuf>,

        /// Camera device index
        #[arg(long)]
        camera: Option<u32>,

        /// Resource root holding ComputerVision-Res
        #[arg(long, short)]
        resources: Option<PathBuf>,

        /// Modules to start, comma separated (e.g. object,face_location)
        #[arg(long, short, value_delimiter = ',')]
        modules: Vec<ModuleKind>,

        /// Stop after this many ticks (0 runs until the camera is lost)
        #[arg(long, default_value = "0")]
        ticks: u64,
    },

    /// Report which modules have their dependency files under a resource root
    CheckResources {
        /// Resource root holding ComputerVision-Res
        path: PathBuf,
    },

    /// Print the effective configuration (TOML unless --json is given)
    ShowConfig {
        #[arg(long)]
        json: bool,
    },

    /// Show library and module versions
    Version,
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("drishti").join("config.toml"))
        .filter(|path| path.is_file())
}

fn load_config(path: Option<&Path>) -> Result<VisionConfig> {
    match path.map(Path::to_path_buf).or_else(default_config_path) {
        Some(path) => {
            let mut config = VisionConfig::from_file(&path)
                .with_context(|| format!("loading configuration from {}", path.display()))?;
            config.apply_env();
            Ok(config)
        }
        None => Ok(VisionConfig::from_env()),
    }
}

fn render_config(config: &VisionConfig, json: bool) -> Result<String> {
    if json {
        Ok(serde_json::to_string_pretty(config)?)
    } else {
        Ok(toml::to_string_pretty(config)?)
    }
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    init_logging(&config.log_level, cli.json_logs);

    match cli.command {
        Commands::Run {
            frames_dir,
            camera,
            resources,
            modules,
            ticks,
        } => {
            if frames_dir.is_some() {
                config.camera.frames_dir = frames_dir;
            }
            if let Some(camera) = camera {
                config.camera.camera_id = camera;
            }
            if resources.is_some() {
                config.resources.root = resources;
            }
            if !modules.is_empty() {
                config.modules = modules;
            }
            run(config, ticks)
        }
        Commands::CheckResources { path } => check_resources(&config, &path),
        Commands::ShowConfig { json } => {
            println!("{}", render_config(&config, json)?);
            Ok(())
        }
        Commands::Version => {
            let factory = DetectorFactory::new();
            println!("drishti {}", Vision::version());
            for kind in ModuleKind::ALL {
                println!("  {:<16} {}", kind.as_str(), factory.version(kind));
            }
            Ok(())
        }
    }
}

fn run(config: VisionConfig, ticks: u64) -> Result<()> {
    let interval = Duration::from_secs_f64(1.0 / config.camera.refresh_rate.max(1) as f64);
    let vision = Vision::new(config, DetectorFactory::new()).context("starting vision pipeline")?;

    let started = vision
        .init_configured_modules()
        .into_iter()
        .filter(|(kind, result)| match result {
            Ok(()) => true,
            Err(e) => {
                error!("{} failed to start ({:?}): {}", kind, e.code(), e);
                false
            }
        })
        .count();
    info!("{} module(s) running", started);

    let _objects = vision.on_objects_found(|names| info!(objects = ?names, "objects found"));
    let _faces = vision.on_faces_located(|faces| info!(count = faces.len(), "faces located"));
    let _poses = vision.on_pose_found(|points| info!(points = points.len(), "pose found"));
    let _friends = vision.on_friends_found(|people| {
        for person in people {
            info!(id = person.id, name = %person.name, "person recognized");
        }
    });
    let _emotions = vision.on_emotion_state(|emotions| info!(?emotions, "emotion state"));
    let _compare = vision.on_face_compared(|matched| info!(matched, "face compared"));
    let _camera = vision.on_camera_state(|state| info!(?state, "camera state"));

    if !vision.open_configured_camera() {
        bail!("could not open the capture source");
    }

    let mut count = 0u64;
    loop {
        let begin = Instant::now();
        let report = vision.tick();
        count += 1;
        match &report.outcome {
            TickOutcome::CameraLost => {
                warn!("Camera lost after {} tick(s)", count);
                break;
            }
            TickOutcome::NoFrame => warn!("No frame on tick {}", count),
            TickOutcome::Dispatched(_) => {
                for failure in report.failures() {
                    if failure.code != ResultCode::ImageEmpty {
                        warn!("{} returned {:?}", failure.kind, failure.code);
                    }
                }
            }
        }
        if ticks > 0 && count >= ticks {
            break;
        }
        if let Some(rest) = interval.checked_sub(begin.elapsed()) {
            std::thread::sleep(rest);
        }
    }

    for status in vision.module_status() {
        info!(
            module = %status.kind,
            calls = status.detect_calls,
            failures = status.detect_failures,
            "module summary"
        );
    }
    vision.close_camera();
    Ok(())
}

fn check_resources(config: &VisionConfig, path: &Path) -> Result<()> {
    let paths = ResourcePaths::resolve(path, config.resources.layout())
        .with_context(|| format!("resource root {}", path.display()))?;
    let mut missing = 0;
    for (kind, status) in paths.report() {
        match status {
            Ok(resources) => println!("{:<16} ok ({} file(s))", kind.as_str(), resources.files.len()),
            Err(e) => {
                missing += 1;
                println!("{:<16} {:?}: {}", kind.as_str(), e.code(), e);
            }
        }
    }
    if missing > 0 {
        info!("{} module(s) missing dependencies", missing);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_modules() {
        let cli = Cli::try_parse_from([
            "drishti",
            "run",
            "--modules",
            "object,face_location",
            "--ticks",
            "3",
        ])
        .unwrap();
        match cli.command {
            Commands::Run { modules, ticks, .. } => {
                assert_eq!(modules, vec![ModuleKind::Object, ModuleKind::FaceLocation]);
                assert_eq!(ticks, 3);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_module() {
        assert!(Cli::try_parse_from(["drishti", "run", "--modules", "segmentation"]).is_err());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drishti.toml");
        std::fs::write(&path, "modules = [\"pose\"]\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.modules, vec![ModuleKind::Pose]);
    }

    #[test]
    fn test_show_config_formats_parse_back() {
        let mut config = VisionConfig::default();
        config.modules = vec![ModuleKind::Emotion];
        config.camera.refresh_rate = 5;

        let json = render_config(&config, true).unwrap();
        assert!(json.trim_start().starts_with('{'));
        assert_eq!(VisionConfig::from_str(&json).unwrap(), config);

        let toml = render_config(&config, false).unwrap();
        assert_eq!(VisionConfig::from_str(&toml).unwrap(), config);

        let cli = Cli::try_parse_from(["drishti", "show-config", "--json"]).unwrap();
        assert!(matches!(cli.command, Commands::ShowConfig { json: true }));
    }

    #[test]
    fn test_check_resources_on_empty_root() {
        let dir = tempfile::tempdir().unwrap();
        assert!(check_resources(&VisionConfig::default(), dir.path()).is_ok());
        assert!(check_resources(&VisionConfig::default(), &dir.path().join("nope")).is_err());
    }
}
