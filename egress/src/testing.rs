// test doubles shared by the transmitter and worker tests

use crate::error::EgressError;
use crate::sink::DiagnosticSink;
use crate::transmit::CycleReport;
use pulse_timing::PaceOutcome;
use pulse_traits::{DeviceError, NetworkDevice, Release, TxFrame};
use std::sync::Mutex;
use std::time::SystemTime;

pub(crate) enum Behavior {
    AcceptAll,
    AcceptNone,
    // per-call accepted counts, accept everything once exhausted
    Script(Vec<usize>),
    Fail,
    Panic,
}

#[derive(Debug, Clone)]
pub(crate) struct SentFrames<P> {
    pub packets: Vec<P>,
    pub ports: Vec<u16>,
    pub releases: Vec<Release>,
    pub queue_id: u16,
    pub flush: bool,
}

type Hook = Box<dyn Fn(usize) + Send + Sync>;

pub(crate) struct ScriptedDevice<P = u32> {
    behavior: Behavior,
    port: u16,
    hook: Option<Hook>,
    sent: Mutex<Vec<SentFrames<P>>>,
}

impl<P: Clone + Send + Sync> ScriptedDevice<P> {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            port: 0,
            hook: None,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    // runs on every send_packets call, after the frames were recorded
    pub fn with_hook(mut self, hook: impl Fn(usize) + Send + Sync + 'static) -> Self {
        self.hook = Some(Box::new(hook));
        self
    }

    pub fn frames(&self) -> Vec<SentFrames<P>> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<usize> {
        self.frames().iter().map(|f| f.packets.len()).collect()
    }
}

impl<P: Clone + Send + Sync> NetworkDevice for ScriptedDevice<P> {
    type Packet = P;

    fn port_id(&self) -> u16 {
        self.port
    }

    fn send_packets(
        &self,
        frames: &[TxFrame<'_, P>],
        queue_id: u16,
        flush: bool,
    ) -> Result<usize, DeviceError> {
        let call = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(SentFrames {
                packets: frames.iter().map(|f| f.packet().clone()).collect(),
                ports: frames.iter().map(|f| f.port()).collect(),
                releases: frames.iter().map(|f| f.release()).collect(),
                queue_id,
                flush,
            });
            sent.len() - 1
        };

        if let Some(hook) = &self.hook {
            hook(call);
        }

        match &self.behavior {
            Behavior::AcceptAll => Ok(frames.len()),
            Behavior::AcceptNone => Ok(0),
            Behavior::Script(counts) => Ok(counts.get(call).copied().unwrap_or(frames.len())),
            Behavior::Fail => Err(DeviceError::LinkDown(self.port)),
            Behavior::Panic => panic!("device exploded"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SinkEvent {
    Started { pool_size: usize },
    Completed { report: CycleReport, pace: PaceOutcome },
    Aborted { failed_chunks: u32, skipped: usize },
    Failed(String),
    Exited { core_id: usize },
}

#[derive(Default)]
pub(crate) struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: SinkEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl DiagnosticSink for RecordingSink {
    fn cycle_started(&self, _now: SystemTime, pool_size: usize) {
        self.push(SinkEvent::Started { pool_size });
    }

    fn cycle_completed(&self, report: &CycleReport, pace: &PaceOutcome) {
        self.push(SinkEvent::Completed {
            report: *report,
            pace: *pace,
        });
    }

    fn cycle_aborted(&self, report: &CycleReport) {
        self.push(SinkEvent::Aborted {
            failed_chunks: report.failed_chunks,
            skipped: report.skipped_chunks(),
        });
    }

    fn cycle_failed(&self, error: &EgressError) {
        self.push(SinkEvent::Failed(error.to_string()));
    }

    fn worker_exited(&self, core_id: usize) {
        self.push(SinkEvent::Exited { core_id });
    }
}
