use std::fs;
use std::io::{self, Read};
use std::path::Path;

use ledpipe_mock::MockTransport;
use ledpipe_pipe::Pipe;
use serde_json::{Map, Value};

use crate::cmd::ReplayArgs;
use crate::exit::{io_error, pipe_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_raw, print_state, OutputFormat};

pub fn run(args: ReplayArgs, format: OutputFormat) -> CliResult<i32> {
    let script = read_script(&args.input)?;
    let state = replay(&script)?;

    match &args.get {
        Some(key) => {
            let value = state
                .get(key)
                .ok_or_else(|| CliError::new(FAILURE, format!("key not present in state: {key}")))?;
            print_raw(&value.to_string());
        }
        None => print_state(&state, format),
    }

    Ok(SUCCESS)
}

fn read_script(input: &Path) -> CliResult<String> {
    if input == Path::new("-") {
        let mut script = String::new();
        io::stdin()
            .read_to_string(&mut script)
            .map_err(|err| io_error("failed reading stdin", err))?;
        return Ok(script);
    }
    fs::read_to_string(input)
        .map_err(|err| io_error(&format!("failed reading {}", input.display()), err))
}

/// Send every non-blank line of `script` through a mock-backed pipe and
/// return the state it accumulated.
fn replay(script: &str) -> CliResult<Map<String, Value>> {
    let mock = MockTransport::with_observer(|line| {
        tracing::debug!(line = line.trim_end(), "replayed");
    });
    let mut pipe = Pipe::new(mock);

    for line in script.lines().map(str::trim).filter(|line| !line.is_empty()) {
        pipe.send_line(line)
            .map_err(|err| pipe_error("replay failed", err))?;
    }

    let state = pipe.transport().accumulated_state().clone();
    tracing::info!(
        lines = pipe.transport().sent().len(),
        keys = state.len(),
        "replay complete"
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn later_lines_overwrite_earlier_keys() {
        let state = replay("{\"on\":true,\"bri\":10}\n\n{\"bri\":200}\n").unwrap();
        assert_eq!(state.get("on"), Some(&json!(true)));
        assert_eq!(state.get("bri"), Some(&json!(200)));
    }

    #[test]
    fn state_keys_keep_first_send_order() {
        let state = replay("{\"on\":true,\"bri\":10}\n{\"ps\":2,\"bri\":20}\n").unwrap();
        let keys: Vec<&str> = state.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["on", "bri", "ps"]);
    }

    #[test]
    fn non_json_lines_are_ignored() {
        let state = replay("reboot\n{\"ps\":3}\n[1,2]\n{broken\n").unwrap();
        assert_eq!(state.len(), 1);
        assert_eq!(state.get("ps"), Some(&json!(3)));
    }

    #[test]
    fn empty_script_gives_empty_state() {
        assert!(replay("").unwrap().is_empty());
    }

    #[test]
    fn missing_script_file_fails() {
        let path = std::env::temp_dir().join(format!("ledpipe-missing-{}.jsonl", std::process::id()));
        let err = read_script(&path).unwrap_err();
        assert_eq!(err.code, FAILURE);
    }
}
