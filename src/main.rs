//! # Pad Bridge
//!
//! Drive the mouse pointer, scroll wheel and keyboard from a game controller.
//!
//! The `run` command polls the controller on a worker thread and injects the
//! translated events through a virtual uinput device until Ctrl+C. SIGHUP
//! makes it re-read the mapping file. The other commands open the controller
//! themselves and edit the persisted mapping.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pad_bridge::config::Config;
use pad_bridge::controller::device::DeviceSource;
use pad_bridge::controller::evdev_pad::EvdevPad;
use pad_bridge::engine::clock::ThreadClock;
use pad_bridge::engine::worker::{ProfileSender, TranslationLoop};
use pad_bridge::mapping::action::OutputAction;
use pad_bridge::mapping::binding::InputId;
use pad_bridge::mapping::calibration::{calibrate_and_save, default_pointer_prompts};
use pad_bridge::mapping::capture::capture_input;
use pad_bridge::mapping::profile::Profile;
use pad_bridge::mapping::store::ProfileStore;
use pad_bridge::output::log_sink::LogSink;
use pad_bridge::output::uinput::UinputSink;
use pad_bridge::output::InjectionSink;

/// Command-line arguments for pad-bridge
#[derive(Parser, Debug)]
#[command(name = "pad-bridge")]
#[command(version, about = "Drive your mouse and keyboard from a game controller", long_about = None)]
pub struct Args {
    /// Configuration file path (defaults apply if it does not exist)
    #[arg(short, long, env = "PAD_BRIDGE_CONFIG", default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Start translating controller input until Ctrl+C (SIGHUP reloads the mapping)
    Run {
        /// Log output events instead of injecting them
        #[arg(long)]
        dry_run: bool,
    },

    /// Record which physical inputs drive the pointer controls
    Calibrate,

    /// Capture one controller input and bind ACTION to it
    ///
    /// ACTION is e.g. `key:space`, `mouse_button:right`, `mouse:up`,
    /// `move:5,0` or `scroll:1`.
    Bind { action: String },

    /// Remove the action bound to an input (`axis:<i>:<1|-1>` or `button:<i>`)
    Unbind { input: String },

    /// Print the active mapping
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    // Held until exit so buffered file logs are flushed
    let _guard = init_logging(&config, args.verbose)?;

    info!("Pad Bridge v{} starting...", env!("CARGO_PKG_VERSION"));
    debug!("Config: {:?}", config);

    match args.command {
        Command::Run { dry_run } => run(&config, dry_run).await,
        Command::Calibrate => calibrate(&config),
        Command::Bind { action } => bind(&config, &action),
        Command::Unbind { input } => unbind(&config, &input),
        Command::List => list(&config),
    }
}

fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    Config::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// Effective log level: `-v` raises the configured level to debug, `-vv` to trace.
fn log_level(configured: &str, verbose: u8) -> &str {
    match verbose {
        0 => configured,
        1 => "debug",
        _ => "trace",
    }
}

fn init_logging(config: &Config, verbose: u8) -> Result<Option<WorkerGuard>> {
    let level = log_level(&config.logging.level, verbose);
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("pad_bridge={level},warn", level = level)));

    let (file_layer, guard) = match config.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::daily(&dir, "pad-bridge.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

/// Opens the controller for one of the mapping commands.
fn open_controller(config: &Config) -> Result<EvdevPad> {
    let mut device = EvdevPad::new(config.device_path());
    device
        .reinitialize()
        .context("Connect a controller and try again")?;
    Ok(device)
}

async fn run(config: &Config, dry_run: bool) -> Result<()> {
    let store = ProfileStore::new(config.mapping_path());
    let profile = store.load();

    let sink: Box<dyn InjectionSink + Send> = if dry_run {
        info!("Dry run: output events are logged, not injected");
        Box::new(LogSink::new())
    } else {
        Box::new(UinputSink::create().context("Failed to create the virtual input device")?)
    };

    let device = EvdevPad::new(config.device_path());
    let handle = TranslationLoop::new(device, sink, profile, config.loop_settings())?.spawn()?;
    let mut status = handle.subscribe();
    let profiles = handle.profile_sender();
    let mut hangup = signal(SignalKind::hangup()).context("Failed to install the SIGHUP handler")?;

    info!("Press Ctrl+C to exit, send SIGHUP to reload {}", store.path().display());
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                match current.device_name {
                    Some(name) => info!("Loop {} ({})", current.state, name),
                    None => info!("Loop {}", current.state),
                }
            }

            _ = hangup.recv() => {
                match reload_profile(&store, &profiles) {
                    Ok(()) => info!("Reloaded mapping from {}", store.path().display()),
                    Err(e) => warn!("Mapping not reloaded: {:#}", e),
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = &mut ctrl_c => {
                info!("Received Ctrl+C, shutting down...");
                break;
            }
        }
    }

    let timeout = config.stop_timeout();
    tokio::task::spawn_blocking(move || handle.stop(timeout)).await??;
    info!("Stopped");
    Ok(())
}

/// Re-reads the mapping file and queues it for the running loop.
///
/// The loop keeps its current profile if the file is missing, invalid or binds nothing.
fn reload_profile(store: &ProfileStore, profiles: &ProfileSender) -> Result<()> {
    let profile = store.try_load()?.unwrap_or_default();
    profiles.apply(profile)?;
    Ok(())
}

fn calibrate(config: &Config) -> Result<()> {
    let store = ProfileStore::new(config.mapping_path());
    let mut profile = store.load();
    let mut device = open_controller(config)?;

    let prompts = default_pointer_prompts();
    let options = config.calibration_options(profile.tuning.deadzone);

    println!("Calibrating {}", device.name());
    calibrate_and_save(
        &mut device,
        &ThreadClock,
        &store,
        &mut profile,
        &prompts,
        &options,
        |step, prompt| println!("[{}/{}] {}", step + 1, prompts.len(), prompt.label),
    )?;

    println!("Saved to {}", store.path().display());
    print_profile(&profile);
    Ok(())
}

fn bind(config: &Config, action: &str) -> Result<()> {
    let action: OutputAction = action.parse()?;
    let store = ProfileStore::new(config.mapping_path());
    let mut profile = store.load();
    let mut device = open_controller(config)?;

    println!("Actuate the input to bind to {}", action);
    let input = capture_input(&mut device, &ThreadClock, &config.capture_options())?;

    if let Some(previous) = profile.bind(input, action) {
        println!("Replacing {} → {}", input, previous);
    }
    store.save(&profile)?;

    println!("{} → {}", input, action);
    println!("A running pad-bridge picks this up on SIGHUP");
    Ok(())
}

fn unbind(config: &Config, input: &str) -> Result<()> {
    let input: InputId = input.parse()?;
    let store = ProfileStore::new(config.mapping_path());
    let mut profile = store.load();

    if profile.unbind(&input) {
        store.save(&profile)?;
        println!("Removed {}", input);
        println!("A running pad-bridge picks this up on SIGHUP");
    } else {
        println!("Nothing bound to {}", input);
    }
    Ok(())
}

fn list(config: &Config) -> Result<()> {
    let store = ProfileStore::new(config.mapping_path());
    println!("{}", store.path().display());
    print_profile(&store.load());
    Ok(())
}

fn print_profile(profile: &Profile) {
    if profile.is_empty() {
        println!("  (nothing bound)");
        return;
    }
    for line in profile.describe() {
        println!("  {}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pad_bridge::engine::worker::LoopSettings;

    #[test]
    fn test_log_level_from_verbosity() {
        assert_eq!(log_level("warn", 0), "warn");
        assert_eq!(log_level("warn", 1), "debug");
        assert_eq!(log_level("info", 2), "trace");
        assert_eq!(log_level("info", 5), "trace");
    }

    #[test]
    fn test_parse_run() {
        let args = Args::try_parse_from(["pad-bridge", "run", "--dry-run"]).unwrap();
        assert_eq!(args.command, Command::Run { dry_run: true });
        assert_eq!(args.config, PathBuf::from("config/default.toml"));
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_parse_global_flags() {
        let args = Args::try_parse_from(["pad-bridge", "-c", "/etc/pad.toml", "-vv", "list"]).unwrap();
        assert_eq!(args.command, Command::List);
        assert_eq!(args.config, PathBuf::from("/etc/pad.toml"));
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_parse_bind_and_unbind() {
        let args = Args::try_parse_from(["pad-bridge", "bind", "key:space"]).unwrap();
        assert_eq!(args.command, Command::Bind { action: "key:space".to_string() });

        let args = Args::try_parse_from(["pad-bridge", "unbind", "axis:1:-1"]).unwrap();
        assert_eq!(args.command, Command::Unbind { input: "axis:1:-1".to_string() });
    }

    #[test]
    fn test_command_required() {
        assert!(Args::try_parse_from(["pad-bridge"]).is_err());
    }

    // ==================== Reload Tests ====================

    fn key_profile() -> Profile {
        let mut profile = Profile::default();
        profile.bind(InputId::button(0), "key:a".parse().unwrap());
        profile
    }

    #[test]
    fn test_reload_queues_saved_profile() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = ProfileStore::new(dir.path().join("mapping.json"));
        let translation = TranslationLoop::new(
            EvdevPad::new(None),
            LogSink::new(),
            key_profile(),
            LoopSettings::default(),
        )
        .unwrap();
        let profiles = translation.profile_sender();

        // Nothing saved yet
        assert!(reload_profile(&store, &profiles).is_err());

        store.save(&key_profile()).unwrap();
        assert!(reload_profile(&store, &profiles).is_ok());

        store.save(&Profile::default()).unwrap();
        assert!(reload_profile(&store, &profiles).is_err());
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = load_config(Path::new("/nonexistent/pad-bridge.toml")).unwrap();
        assert_eq!(config, Config::default());
    }
}
