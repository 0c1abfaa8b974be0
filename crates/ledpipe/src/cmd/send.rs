use std::fs;
use std::time::{Duration, Instant};

use ledpipe_frame::Codec;
use ledpipe_pipe::{Pipe, PipeError};
use ledpipe_transport::Transport;

use crate::cmd::{parse_duration, SendArgs};
use crate::exit::{pipe_error, CliError, CliResult, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_line, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args)?;

    let mut pipe = args.link.open()?;
    pipe.send_line(&payload)
        .map_err(|err| pipe_error("send failed", err))?;
    tracing::info!(controller = %args.link.target, size = payload.len(), "line sent");

    if args.wait {
        let line = wait_for_line(&mut pipe, wait_timeout)?;
        print_line(&line, &args.link.target, format);
    }

    pipe.close();
    Ok(SUCCESS)
}

fn resolve_payload(args: &SendArgs) -> CliResult<String> {
    if let Some(json) = &args.json {
        let value: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
        return serde_json::to_string(&value)
            .map_err(|err| CliError::new(USAGE, format!("--json could not be encoded: {err}")));
    }
    if let Some(data) = &args.data {
        return Ok(data.clone());
    }
    if let Some(path) = &args.file {
        return fs::read_to_string(path).map_err(|err| {
            crate::exit::io_error(&format!("failed reading {}", path.display()), err)
        });
    }
    Err(CliError::new(USAGE, "one of --json, --data or --file is required"))
}

trait LineSource {
    fn poll_line(&mut self) -> Result<Option<String>, PipeError>;
}

impl<T: Transport, C: Codec> LineSource for Pipe<T, C> {
    fn poll_line(&mut self) -> Result<Option<String>, PipeError> {
        self.try_read_line()
    }
}

/// Poll until a line arrives or `timeout` elapses.
fn wait_for_line<S: LineSource>(source: &mut S, timeout: Duration) -> CliResult<String> {
    let deadline = Instant::now() + timeout;
    loop {
        match source.poll_line() {
            Ok(Some(line)) => return Ok(line),
            Ok(None) if Instant::now() >= deadline => {
                return Err(CliError::new(
                    TIMEOUT,
                    format!("no response within {timeout:?}"),
                ))
            }
            Ok(None) => continue,
            Err(PipeError::Frame(err)) => {
                tracing::warn!(error = %err, "skipping unreadable line");
            }
            Err(err) => return Err(pipe_error("receive failed", err)),
        }
    }
}
