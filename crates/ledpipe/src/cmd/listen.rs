use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ledpipe_pipe::PipeError;

use crate::cmd::ListenArgs;
use crate::exit::{pipe_error, CliError, CliResult, SUCCESS};
use crate::output::{print_line, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let mut pipe = args.link.open()?;

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        let lines = match pipe.try_read_lines() {
            Ok(lines) => lines,
            Err(err) if err.is_disconnect() => {
                tracing::info!(controller = %args.link.target, "controller disconnected");
                break;
            }
            Err(PipeError::Frame(err)) => {
                tracing::warn!(error = %err, "skipping unreadable line");
                continue;
            }
            Err(err) => return Err(pipe_error("receive failed", err)),
        };

        for line in lines {
            print_line(&line, &args.link.target, format);
            printed = printed.saturating_add(1);

            if args.count.is_some_and(|count| printed >= count) {
                pipe.close();
                return Ok(SUCCESS);
            }
        }
    }

    pipe.close();
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
