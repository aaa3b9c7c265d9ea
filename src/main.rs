use clap::Parser;
use pushtype::cli::{Cli, Commands};
use pushtype::config::{Config, TranscribeBackend};
use pushtype::lock::{NamedLock, PidfileLock};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);

    let exit_code = run(cli);
    std::process::exit(exit_code);
}

fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("pushtype={}", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> i32 {
    let mut config = match Config::load(cli.config.as_ref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    };

    if cli.local {
        config.transcribe.backend = TranscribeBackend::Local;
    }

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => run_daemon(config, cli.config.clone(), &cli.device, cli.no_device_select),
        Commands::FormatWorker => run_format_worker(config),
        Commands::ListDevices => match pushtype::audio::device::print_devices() {
            Ok(()) => 0,
            Err(e) => {
                eprintln!("Error: {}", e);
                2
            }
        },
        Commands::Config => show_config(&config),
    }
}

fn run_daemon(
    mut config: Config,
    config_path: Option<std::path::PathBuf>,
    device: &Option<usize>,
    no_device_select: bool,
) -> i32 {
    if let Err(e) = Config::ensure_directories() {
        eprintln!("Error: cannot create runtime directories: {}", e);
        return 2;
    }

    let mut lock = PidfileLock::for_role(&Config::runtime_dir(), "daemon");
    if !lock.try_acquire() {
        eprintln!("Another pushtype daemon is already running.");
        return 1;
    }

    // Resolve the input device before entering the async runtime;
    // interactive selection reads stdin
    if let Some(index) = device {
        match pushtype::audio::device::device_name_by_index(*index) {
            Ok(name) => {
                tracing::info!("Using audio device {}: {}", index, name);
                config.audio.device = name;
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return 2;
            }
        }
    } else if !no_device_select && config.audio.device == "default" {
        if let Some(name) = pushtype::audio::device::select_device_interactive() {
            config.audio.device = name;
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 2;
        }
    };

    match runtime.block_on(pushtype::daemon::run(config, config_path)) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{}", e);
            2
        }
    }
}

/// Worker exit codes are a contract with the supervisor: 0 clean,
/// 1 duplicate instance, anything else a crash worth restarting.
fn run_format_worker(config: Config) -> i32 {
    if let Err(e) = Config::ensure_directories() {
        eprintln!("Error: cannot create runtime directories: {}", e);
        return 2;
    }

    let mut lock = PidfileLock::for_role(&Config::runtime_dir(), "format-worker");
    if !lock.try_acquire() {
        tracing::warn!("Duplicate format worker instance, exiting");
        return 1;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to start runtime: {}", e);
            return 2;
        }
    };

    match runtime.block_on(pushtype::format::run_worker(&config)) {
        Ok(()) => 0,
        Err(e) => {
            tracing::error!("{}", e);
            2
        }
    }
}

fn show_config(config: &Config) -> i32 {
    match Config::write_default_if_missing() {
        Ok(path) => println!("# Config file: {}", path.display()),
        Err(e) => {
            eprintln!("Error: {}", e);
            return 2;
        }
    }
    match toml::to_string_pretty(config) {
        Ok(s) => {
            println!("{}", s);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            2
        }
    }
}
