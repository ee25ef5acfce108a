//! Test and helper mocks for pingtrip_core

use std::collections::VecDeque;
use std::time::Duration;

use pingtrip_traits::{BoxError, RangeSensor, Transport};

/// Replays a scripted sequence of raw readings, then repeats the last one.
///
/// `None` entries fail the read. An empty script always fails.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSensor {
    script: VecDeque<Option<u32>>,
    last: Option<u32>,
    reads: u64,
}

impl ScriptedSensor {
    pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
        Self::from_script(values.into_iter().map(Some))
    }

    pub fn from_script(script: impl IntoIterator<Item = Option<u32>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
            reads: 0,
        }
    }

    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl RangeSensor for ScriptedSensor {
    fn read_raw(&mut self, _timeout: Duration) -> Result<u32, BoxError> {
        self.reads += 1;
        let next = match self.script.pop_front() {
            Some(v) => {
                if v.is_some() {
                    self.last = v;
                }
                v
            }
            None => self.last,
        };
        next.ok_or_else(|| "scripted sensor timeout".into())
    }
}

/// In-memory transport that records every request.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    pub connects: Vec<(String, u16, Duration)>,
    pub sent: Vec<Vec<u8>>,
    pub closes: usize,
    pub response: Vec<u8>,
    pub fail_connect: bool,
    pub fail_send: bool,
    pub connected: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            fail_connect: true,
            ..Self::default()
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

impl Transport for RecordingTransport {
    fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<(), BoxError> {
        self.connects.push((host.to_string(), port, timeout));
        if self.fail_connect {
            return Err(format!("connection refused by {host}:{port}").into());
        }
        self.connected = true;
        Ok(())
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), BoxError> {
        if !self.connected {
            return Err("not connected".into());
        }
        if self.fail_send {
            return Err("broken pipe".into());
        }
        self.sent.push(bytes.to_vec());
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, BoxError> {
        Ok(std::mem::take(&mut self.response))
    }

    fn close(&mut self) {
        if self.connected {
            self.closes += 1;
        }
        self.connected = false;
    }
}
