//! Recording [SinkFactory] for tests
use std::{
    io,
    sync::{Arc, Mutex},
};

use evdev::{AbsoluteAxisCode, EventType, InputEvent, KeyCode, SynchronizationCode};

use super::{SinkError, SinkFactory, TargetConfig, VirtualSink};

/// (event type, code, value)
pub type RawEvent = (u16, u16, i32);

pub fn key(code: KeyCode, value: i32) -> RawEvent {
    (EventType::KEY.0, code.0, value)
}

pub fn abs(code: AbsoluteAxisCode, value: i32) -> RawEvent {
    (EventType::ABSOLUTE.0, code.0, value)
}

pub fn syn() -> RawEvent {
    (EventType::SYNCHRONIZATION.0, SynchronizationCode::SYN_REPORT.0, 0)
}

#[derive(Debug, Default)]
pub struct SinkLog {
    /// Config of each created sink, indexed by creation order
    pub created: Vec<TargetConfig>,
    /// Events written to each sink
    pub events: Vec<Vec<RawEvent>>,
    pub destroyed: Vec<usize>,
    pub fail_create: bool,
    pub fail_emit: bool,
}

#[derive(Debug, Default, Clone)]
pub struct MockSinkFactory {
    log: Arc<Mutex<SinkLog>>,
}

impl MockSinkFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.log.lock().unwrap().fail_create = fail;
    }

    pub fn set_fail_emit(&self, fail: bool) {
        self.log.lock().unwrap().fail_emit = fail;
    }

    pub fn created(&self) -> usize {
        self.log.lock().unwrap().created.len()
    }

    pub fn config(&self, index: usize) -> TargetConfig {
        self.log.lock().unwrap().created[index].clone()
    }

    pub fn destroyed(&self) -> Vec<usize> {
        self.log.lock().unwrap().destroyed.clone()
    }

    /// Returns and clears the events written to the sink with the given index
    pub fn take_events(&self, index: usize) -> Vec<RawEvent> {
        std::mem::take(&mut self.log.lock().unwrap().events[index])
    }
}

impl SinkFactory for MockSinkFactory {
    type Sink = MockSink;

    fn create(&self, config: &TargetConfig) -> Result<MockSink, SinkError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_create {
            return Err(io::Error::other("uinput unavailable").into());
        }
        log.created.push(config.clone());
        log.events.push(Vec::new());
        Ok(MockSink {
            index: log.created.len() - 1,
            log: self.log.clone(),
        })
    }
}

#[derive(Debug)]
pub struct MockSink {
    index: usize,
    log: Arc<Mutex<SinkLog>>,
}

impl VirtualSink for MockSink {
    fn emit(&mut self, event: InputEvent) -> Result<(), SinkError> {
        let mut log = self.log.lock().unwrap();
        if log.fail_emit {
            return Err(io::Error::other("write failed").into());
        }
        let raw = (event.event_type().0, event.code(), event.value());
        log.events[self.index].push(raw);
        Ok(())
    }

    fn destroy(self) -> Result<(), SinkError> {
        self.log.lock().unwrap().destroyed.push(self.index);
        Ok(())
    }
}
