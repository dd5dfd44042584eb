//! Captured child output.
//!
//! stdout and stderr of every service are piped into a shared ring buffer
//! (bounded `VecDeque<String>`) by two reader tasks, so nothing is written
//! to the supervisor's terminal directly. Each line is also logged at debug
//! level under the service name.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

/// Maximum number of lines retained per service.
pub const OUTPUT_BUFFER_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

impl Stream {
    fn as_str(self) -> &'static str {
        match self {
            Stream::Stdout => "stdout",
            Stream::Stderr => "stderr",
        }
    }
}

/// Cheaply cloneable handle to a service's output ring buffer.
#[derive(Debug, Clone)]
pub struct OutputBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
    capacity: usize,
}

impl Default for OutputBuffer {
    fn default() -> Self {
        Self::with_capacity(OUTPUT_BUFFER_CAPACITY)
    }
}

impl OutputBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: Arc::new(Mutex::new(VecDeque::with_capacity(capacity))),
            capacity,
        }
    }

    /// Append a line, evicting the oldest one when full.
    pub fn push(&self, line: String) {
        let mut buf = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        if buf.len() >= self.capacity {
            buf.pop_front();
        }
        buf.push_back(line);
    }

    /// The last `n` lines, oldest first.
    pub fn tail(&self, n: usize) -> Vec<String> {
        let buf = self.lines.lock().unwrap_or_else(PoisonError::into_inner);
        let start = buf.len().saturating_sub(n);
        buf.iter().skip(start).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn a task draining `reader` line by line into this buffer.
    /// stderr lines are prefixed with `[stderr] `. The task ends at EOF,
    /// which happens once the process (group) has closed the pipe.
    pub fn spawn_reader<R>(&self, service: String, stream: Stream, reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = self.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(reader).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        tracing::debug!(service = %service, stream = stream.as_str(), "{line}");
                        match stream {
                            Stream::Stdout => buffer.push(line),
                            Stream::Stderr => buffer.push(format!("[stderr] {line}")),
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        tracing::debug!(service = %service, stream = stream.as_str(), "output reader stopped: {e}");
                        break;
                    }
                }
            }
        })
    }
}
