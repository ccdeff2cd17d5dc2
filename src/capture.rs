//! Multi-line capture into the inbox.
//!
//! A session reads lines until end of input or until its cancellation
//! channel fires. The channel is checked between reads, so a line that is
//! being typed when cancellation arrives is still kept once it completes.

use std::io::{self, BufRead};

use tokio::sync::oneshot::{self, error::TryRecvError};

pub struct CaptureSession<R> {
    input: R,
    cancel: oneshot::Receiver<()>,
}

impl<R: BufRead> CaptureSession<R> {
    pub fn new(input: R, cancel: oneshot::Receiver<()>) -> Self {
        Self { input, cancel }
    }

    /// Collects the captured text, line endings included.
    pub fn run(mut self) -> io::Result<String> {
        let mut text = String::new();
        loop {
            match self.cancel.try_recv() {
                Ok(()) => break,
                // A dropped sender can no longer cancel; keep reading to EOF.
                Err(TryRecvError::Empty | TryRecvError::Closed) => {}
            }

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                break;
            }
            text.push_str(&line);
        }
        Ok(text)
    }
}
