use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, ValueEnum};
use tracing::{error, info};

use lanejudge_core::config::{JudgeConfig, OutputFormat};
use lanejudge_core::demo::SimulatedOpener;
use lanejudge_core::operator::{ConsoleOperator, Operator};
use lanejudge_core::protocol::{list_ports, DeviceOpener, LaneCount, LinkOpener, ProtocolError};
use lanejudge_core::session::{SessionLoop, SessionOptions, SessionSummary};
use lanejudge_core::sink::{CommandSink, ConsoleSink, JsonLinesSink, ResultsSink};

mod logging;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputArg {
    Text,
    Json,
}

impl From<OutputArg> for OutputFormat {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Text => OutputFormat::Text,
            OutputArg::Json => OutputFormat::Json,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "lanejudge",
    version = env!("CARGO_PKG_VERSION"),
    about = "A simple text-only Pinewood derby lane judge",
    after_help = "Make sure you have write access to the port!"
)]
struct Cli {
    /// Serial port device path, e.g. /dev/ttyS0
    #[arg(short = 'p', long = "port", value_name = "FILENAME")]
    port: Option<String>,
    /// Debug mode; do not initialize the serial port or rearm the timer
    #[arg(short = 'd', long = "debug")]
    debug: bool,
    /// Race against a simulated timer instead of a device
    #[arg(long = "simulate")]
    simulate: bool,
    /// Lane count of the simulated timer (2, 4 or 8)
    #[arg(long = "lanes", value_name = "N")]
    lanes: Option<usize>,
    /// Baud rate of the timer
    #[arg(long = "baud")]
    baud: Option<u32>,
    /// Configuration file (default: search lanejudge.toml)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,
    /// Result output format
    #[arg(long = "output", value_enum)]
    output: Option<OutputArg>,
    /// Log level or filter (e.g. info, lanejudge_core=debug)
    #[arg(long = "log-level")]
    log_level: Option<String>,
    /// List serial ports and exit
    #[arg(long = "list-ports")]
    list_ports: bool,
}

fn usage() {
    eprintln!("Invalid command line - you must specify a port name or debug option!");
    eprintln!("{}", Cli::command().render_help());
}

/// Exit status for a command line clap rejected; help and version are not errors
fn parse_error_status(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => 0,
        _ => 1,
    }
}

/// Exit status when no timer is configured, or `None` when there is one.
/// A bare `lanejudge` only asks for usage.
fn missing_timer_status(config: &JudgeConfig, no_args: bool) -> Option<u8> {
    if config.timer.port.is_some() || config.timer.simulate {
        return None;
    }
    Some(if no_args { 0 } else { 1 })
}

fn load_config(path: Option<&PathBuf>) -> Result<(JudgeConfig, Option<PathBuf>)> {
    match path {
        Some(path) => Ok((JudgeConfig::load_from_file(path)?, Some(path.clone()))),
        None => Ok(JudgeConfig::load_from_default_paths()?),
    }
}

/// Apply command-line overrides on top of the file configuration
fn merge(cli: &Cli, mut config: JudgeConfig) -> JudgeConfig {
    if let Some(port) = &cli.port {
        config.timer.port = Some(port.clone());
    }
    if cli.debug {
        config.timer.debug = true;
    }
    if cli.simulate {
        config.timer.simulate = true;
    }
    if let Some(lanes) = cli.lanes {
        config.timer.simulated_lanes = lanes;
    }
    if let Some(baud) = cli.baud {
        config.timer.baud = baud;
    }
    if let Some(output) = cli.output {
        config.display.output = output.into();
    }
    config
}

fn build_sink(config: &JudgeConfig) -> Box<dyn ResultsSink> {
    match config.display.output {
        OutputFormat::Json => Box::new(JsonLinesSink::new(std::io::stdout())),
        OutputFormat::Text if config.display.uses_commands() => Box::new(CommandSink::new(
            config.display.winner_command.clone(),
            config.display.times_command.clone(),
            config.display.clear_screen,
        )),
        OutputFormat::Text => Box::new(ConsoleSink::stdout()),
    }
}

fn startup_hints(err: &ProtocolError) {
    match err {
        ProtocolError::OpenFailed { .. } => {
            eprintln!("Eek! Unable to open timer port! Cannot continue.");
            eprintln!("Possible problems:");
            eprintln!("\tbad filename for port (if USB timer, check dmesg for port id)");
            eprintln!("\tno write access to device (check permissions or run as root)");
            eprintln!("\tUSB timer not connected");
        }
        _ => {
            eprintln!("Eek! Cannot initialize timer! Cannot continue!");
            eprintln!("Make sure your timer is supported by this program.");
        }
    }
}

fn run_session<O: LinkOpener>(
    opener: O,
    sink: Box<dyn ResultsSink>,
    options: SessionOptions,
) -> Result<SessionSummary> {
    let mut judge = SessionLoop::new(opener, ConsoleOperator::stdio(), sink, options);
    let session = match judge.establish() {
        Ok(session) => session,
        Err(e) => {
            startup_hints(&e);
            return Err(e).context("timer initialization failed");
        }
    };
    judge.run(session).context("race session aborted")
}

fn run(config: JudgeConfig) -> Result<SessionSummary> {
    let timer = &config.timer;
    let sink = build_sink(&config);

    if timer.simulate {
        let lanes = LaneCount::try_from(timer.simulated_lanes)?;
        info!("Starting lanejudge (simulated {}-lane timer)", lanes);
        return run_session(SimulatedOpener::new(lanes), sink, SessionOptions::default());
    }

    let Some(port) = timer.port.clone() else {
        bail!("no timer port given (use -p <FILENAME>)");
    };

    if timer.debug {
        ConsoleOperator::stdio().notice("Debugging mode enabled")?;
        info!("Starting lanejudge (debug, unconfigured {})", port);
        run_session(DeviceOpener::unconfigured(port), sink, SessionOptions::dry_run())
    } else {
        info!("Starting lanejudge ({} @ {} baud)", port, timer.baud);
        run_session(
            DeviceOpener::serial(port, timer.baud),
            sink,
            SessionOptions::default(),
        )
    }
}

fn main() -> ExitCode {
    let no_args = std::env::args_os().len() <= 1;

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            let status = parse_error_status(e.kind());
            if status != 0 {
                usage();
            }
            return ExitCode::from(status);
        }
    };

    if cli.list_ports {
        for port in list_ports() {
            let details: Vec<&str> = [port.usb_id.as_deref(), port.product.as_deref()]
                .into_iter()
                .flatten()
                .collect();
            if details.is_empty() {
                println!("{}", port.name);
            } else {
                println!("{}\t{}", port.name, details.join("\t"));
            }
        }
        return ExitCode::SUCCESS;
    }

    let (config, config_path) = match load_config(cli.config.as_ref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(cli.log_level.as_deref(), config.general.log_level.as_deref());
    if let Some(path) = config_path {
        info!("Loaded config from {}", path.display());
    }

    let config = merge(&cli, config);
    if let Some(status) = missing_timer_status(&config, no_args) {
        usage();
        return ExitCode::from(status);
    }

    match run(config) {
        Ok(summary) => {
            info!(
                "{} races, {} null races, {} recoveries",
                summary.races, summary.null_races, summary.recoveries
            );
            println!("\nDone.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
