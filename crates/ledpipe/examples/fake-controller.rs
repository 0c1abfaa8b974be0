//! Fake LED controller: accepts one TCP client, merges every JSON command
//! into a mock state and replies with the full state after each line.
//!
//! Run with:
//!   cargo run --example fake-controller
//!
//! In another terminal:
//!   cargo run --features cli -- send tcp://127.0.0.1:21324 \
//!     --json '{"on":true,"bri":128}' --wait

use std::net::TcpListener;

use ledpipe::mock::MockTransport;
use ledpipe::transport::{NetworkTransport, TransportConfig};
use ledpipe::Pipe;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let listener = TcpListener::bind("127.0.0.1:21324")?;
    eprintln!("Listening on {}", listener.local_addr()?);

    let (stream, peer) = listener.accept()?;
    eprintln!("Client connected: {peer}");

    let mut link = Pipe::new(NetworkTransport::from_stream(
        stream,
        TransportConfig::default(),
    )?);
    let mut state = Pipe::new(MockTransport::new());

    loop {
        match link.try_read_line() {
            Ok(Some(line)) => {
                eprintln!("Received {line}");
                state.send_line(&line)?;
                link.send_value(state.transport().accumulated_state())?;
            }
            Ok(None) => continue,
            Err(e) => {
                eprintln!("Client disconnected: {e}");
                break;
            }
        }
    }

    Ok(())
}
