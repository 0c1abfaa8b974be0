use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand};
use ledpipe_frame::{FramerConfig, DEFAULT_MAX_LINE_LEN};
use ledpipe_pipe::{open, Pipe, PipeConfig, Target, DEFAULT_READ_CHUNK};
use ledpipe_transport::{Transport, TransportConfig};

use crate::exit::{pipe_error, target_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod listen;
pub mod replay;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a single line to a controller.
    Send(SendArgs),
    /// Print every line received from a controller.
    Listen(ListenArgs),
    /// Feed a command script through the mock transport and print the resulting state.
    Replay(ReplayArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Replay(args) => replay::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// How to reach the controller.
#[derive(Args, Debug)]
pub struct LinkArgs {
    /// Controller target: tcp://host:port, host:port, serial:/dev/ttyX or a device path.
    pub target: String,
    /// TCP connect timeout (e.g. 1s, 500ms).
    #[arg(long, default_value = "1s", env = "LEDPIPE_CONNECT_TIMEOUT")]
    pub connect_timeout: String,
    /// Longest a single poll may wait for data (e.g. 20ms).
    #[arg(long, default_value = "20ms", env = "LEDPIPE_READ_TIMEOUT")]
    pub read_timeout: String,
    /// Longest accepted line in bytes; 0 disables the cap.
    #[arg(long, default_value_t = DEFAULT_MAX_LINE_LEN, env = "LEDPIPE_MAX_LINE")]
    pub max_line: usize,
}

impl LinkArgs {
    pub fn target(&self) -> CliResult<Target> {
        self.target.parse().map_err(target_error)
    }

    pub fn transport_config(&self) -> CliResult<TransportConfig> {
        Ok(TransportConfig {
            connect_timeout: parse_duration(&self.connect_timeout)?,
            read_timeout: parse_duration(&self.read_timeout)?,
            ..TransportConfig::default()
        })
    }

    pub fn pipe_config(&self) -> PipeConfig {
        PipeConfig {
            framer: FramerConfig {
                max_line_len: (self.max_line > 0).then_some(self.max_line),
            },
            read_chunk_size: DEFAULT_READ_CHUNK,
        }
    }

    pub fn open(&self) -> CliResult<Pipe<Box<dyn Transport + Send>>> {
        let target = self.target()?;
        let transport_config = self.transport_config()?;
        open(&target, &transport_config, self.pipe_config())
            .map_err(|err| pipe_error(&format!("connect to {target} failed"), err))
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// JSON payload (re-encoded compactly onto one line).
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub json: Option<String>,
    /// Raw line payload.
    #[arg(long, conflicts_with_all = ["json", "file"])]
    pub data: Option<String>,
    /// Read payload lines from file.
    #[arg(long, conflicts_with_all = ["json", "data"])]
    pub file: Option<PathBuf>,
    /// Wait for one response line and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Exit after receiving N lines.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Script of command lines; `-` reads stdin.
    pub input: PathBuf,
    /// Print only this key of the resulting state.
    #[arg(long, value_name = "KEY")]
    pub get: Option<String>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}
