//! # Output Sinks
//!
//! Destinations for log and write stages. Log output is one line per value;
//! write output has no framing at all.

use basho_core::{Item, Sink};
use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

/// Writes each value to an output stream, optionally newline-terminated.
#[derive(Debug)]
pub struct StreamSink<W> {
    out: Mutex<W>,
    newline: bool,
}

impl<W: Write + Send> StreamSink<W> {
    /// One line per value.
    pub fn lines(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            newline: true,
        }
    }

    /// Values back to back.
    pub fn raw(out: W) -> Self {
        Self {
            out: Mutex::new(out),
            newline: false,
        }
    }

    /// Take the underlying stream back.
    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> Sink for StreamSink<W> {
    fn accept(&self, item: Item) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let written = if self.newline {
            writeln!(out, "{item}")
        } else {
            write!(out, "{item}")
        };
        if let Err(e) = written.and_then(|()| out.flush()) {
            tracing::warn!("Failed to write sink output: {}", e);
        }
    }
}

/// Log sink on stdout.
#[must_use]
pub fn stdout_log() -> StreamSink<io::Stdout> {
    StreamSink::lines(io::stdout())
}

/// Write sink on stdout.
#[must_use]
pub fn stdout_write() -> StreamSink<io::Stdout> {
    StreamSink::raw(io::stdout())
}
