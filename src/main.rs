use anyhow::Result;
use clap::Parser;
use gesturepad::{GesturepadConfig, GesturepadOrchestrator, RunMode, SourceKind};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

#[derive(Parser, Debug)]
#[command(name = "gesturepad")]
#[command(about = "Hand-gesture game controller driven by hand landmarks")]
#[command(version)]
#[command(long_about = "Turns a stream of hand landmarks into keyboard pulses for lane runner \
games: lane changes from the hand position, jump/slide/hoverboard from finger poses. \
Serves profiles, telemetry and a debug overlay over HTTP.")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "gesturepad.toml", help = "Path to TOML configuration file")]
    config: String,

    /// Which components to run
    #[arg(long, value_enum, default_value_t = RunMode::All)]
    mode: RunMode,

    /// Activate this profile before starting
    #[arg(long, value_name = "NAME")]
    profile: Option<String>,

    /// Override the landmark source
    #[arg(long, value_enum)]
    source: Option<SourceKind>,

    /// File path for `file` sources, address for `tcp` sources
    #[arg(long, value_name = "PATH")]
    source_path: Option<String>,

    #[arg(long, value_name = "HOST")]
    api_host: Option<String>,

    #[arg(long, value_name = "PORT")]
    api_port: Option<u16>,

    /// Log key pulses instead of emitting them
    #[arg(long, help = "Log key pulses instead of writing to a virtual keyboard")]
    dry_run_input: bool,

    /// Enable terminal hotkeys (q quit, p next profile, h help)
    #[arg(long)]
    hotkeys: bool,

    /// Enable debug logging (most verbose)
    #[arg(short, long, help = "Enable debug level logging")]
    debug: bool,

    /// Enable verbose logging (info level)
    #[arg(short, long, help = "Enable verbose info level logging")]
    verbose: bool,

    /// Enable quiet mode (errors only)
    #[arg(short, long, help = "Enable quiet mode - only log errors")]
    quiet: bool,

    /// Override log format (json, pretty, compact)
    #[arg(long, value_name = "FORMAT", help = "Log output format: json, pretty, or compact")]
    log_format: Option<String>,

    /// Validate configuration and exit
    #[arg(long, help = "Validate configuration file and exit without starting the system")]
    validate_config: bool,

    /// Print default configuration and exit
    #[arg(long, help = "Print default configuration in TOML format and exit")]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print_default_config()?;
        return Ok(());
    }

    let mut config = GesturepadConfig::load_from_file(&args.config)?;
    apply_overrides(&mut config, &args);

    let guard = init_logging(&args, &config)?;

    info!("Starting Gesturepad v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration file: {}", args.config);

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        eprintln!("✗ Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    if args.validate_config {
        info!("Configuration validation successful");
        println!("✓ Configuration is valid");
        return Ok(());
    }

    let mut orchestrator = GesturepadOrchestrator::new(config, args.mode)
        .await
        .map_err(|e| {
            error!("Failed to create orchestrator: {}", e);
            e
        })?;
    orchestrator.set_initial_profile(args.profile.clone());

    orchestrator.initialize().await.map_err(|e| {
        error!("Failed to initialize system: {}", e);
        e
    })?;

    orchestrator.start().await.map_err(|e| {
        error!("Failed to start system: {}", e);
        e
    })?;

    let exit_code = orchestrator.run().await.map_err(|e| {
        error!("System error during execution: {}", e);
        e
    })?;

    info!("Gesturepad exited with code: {}", exit_code);

    // flush the file log before exiting
    drop(guard);
    std::process::exit(exit_code);
}

fn apply_overrides(config: &mut GesturepadConfig, args: &Args) {
    if let Some(kind) = args.source {
        config.source.kind = kind;
    }
    if let Some(path) = &args.source_path {
        match config.source.kind {
            SourceKind::Tcp => config.source.address = path.clone(),
            _ => config.source.path = path.clone(),
        }
    }
    if let Some(host) = &args.api_host {
        config.api.host = host.clone();
    }
    if let Some(port) = args.api_port {
        config.api.port = port;
    }
    if args.dry_run_input {
        config.system.dry_run_input = true;
    }
    if args.hotkeys {
        config.system.hotkeys = true;
    }
    if let Some(format) = &args.log_format {
        config.logging.format = format.clone();
    }
    if args.debug {
        config.logging.level = "debug".to_string();
    } else if args.verbose {
        config.logging.level = "info".to_string();
    } else if args.quiet {
        config.logging.level = "error".to_string();
    }
}

fn init_logging(args: &Args, config: &GesturepadConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gesturepad={}", config.logging.level)));

    let fmt_layer = match config.logging.format.as_str() {
        "json" => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        "compact" => fmt::layer()
            .compact()
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false)
            .with_line_number(false)
            .boxed(),
        "pretty" => fmt::layer()
            .pretty()
            .with_target(true)
            .with_thread_ids(args.debug)
            .with_file(args.debug)
            .with_line_number(args.debug)
            .boxed(),
        format => {
            eprintln!("Warning: Unknown log format '{}', using default", format);
            fmt::layer()
                .with_target(true)
                .with_thread_ids(args.debug)
                .with_file(args.debug)
                .with_line_number(args.debug)
                .boxed()
        }
    };

    let (file_layer, guard) = match &config.logging.directory {
        Some(directory) => {
            let appender =
                tracing_appender::rolling::daily(directory, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(file_layer)
        .with(env_filter)
        .try_init()?;

    Ok(guard)
}

/// Print default configuration in TOML format
fn print_default_config() -> Result<()> {
    println!("# Gesturepad Configuration File");
    println!("# Defaults for every option. Environment variables override the file,");
    println!("# e.g. GESTUREPAD_API__PORT=9000 or GESTUREPAD_SOURCE__KIND=tcp");
    println!();
    println!("{}", toml::to_string_pretty(&GesturepadConfig::default())?);
    Ok(())
}
