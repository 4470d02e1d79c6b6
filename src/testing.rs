//! Test doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::codec::RegisterArray;
use crate::comms::{
    CommunicationInterface, Failure, PollTask, ReadCallback, ReadFailureCallback, ReadRequest,
    ReadResult, WriteCallback, WriteFailureCallback, WriteRequest, WriteResult,
};
use crate::error::TransportError;
use crate::thing::{ChannelUid, StatusInfo, ThingCallback};
use crate::units::State;

#[derive(Debug, Clone)]
pub struct Registration {
    pub request: ReadRequest,
    pub interval: Duration,
    pub timeout: Duration,
}

struct PendingWrite {
    request: WriteRequest,
    on_success: WriteCallback,
    on_failure: WriteFailureCallback,
}

/// Records every submission; tests drive the callbacks by hand.
#[derive(Default)]
pub struct MockComms {
    next_id: AtomicU64,
    active: Mutex<Vec<PollTask>>,
    registrations: Mutex<Vec<Registration>>,
    one_time_polls: Mutex<Vec<ReadRequest>>,
    writes: Mutex<Vec<WriteRequest>>,
    pending_writes: Mutex<Vec<PendingWrite>>,
    answers: Mutex<HashMap<u16, Vec<u16>>>,
}

impl MockComms {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn active_polls(&self) -> Vec<PollTask> {
        self.active.lock().clone()
    }

    pub fn registrations(&self) -> Vec<Registration> {
        self.registrations.lock().clone()
    }

    pub fn one_time_polls(&self) -> Vec<ReadRequest> {
        self.one_time_polls.lock().clone()
    }

    pub fn writes(&self) -> Vec<WriteRequest> {
        self.writes.lock().clone()
    }

    /// Makes a later registration at `address` complete its first read at once.
    pub fn answer_on_register(&self, address: u16, registers: Vec<u16>) {
        self.answers.lock().insert(address, registers);
    }

    fn task_at(&self, address: u16) -> PollTask {
        self.active
            .lock()
            .iter()
            .find(|t| t.request().address == address)
            .cloned()
            .unwrap_or_else(|| panic!("no active poll at address {address}"))
    }

    /// Fires the success callback of the poll registered at `address`.
    pub fn tick(&self, address: u16, registers: Option<Vec<u16>>) {
        let task = self.task_at(address);
        (task.result_callback())(ReadResult {
            request: task.request().clone(),
            registers: registers.map(RegisterArray::new),
        });
    }

    pub fn fail(&self, address: u16, cause: TransportError) {
        let task = self.task_at(address);
        (task.failure_callback())(Failure {
            request: task.request().clone(),
            cause,
        });
    }

    /// Completes the oldest outstanding write.
    pub fn complete_write(&self, outcome: Result<(), TransportError>) {
        let pending = {
            let mut pending = self.pending_writes.lock();
            assert!(!pending.is_empty(), "no outstanding write");
            pending.remove(0)
        };
        match outcome {
            Ok(()) => (pending.on_success)(WriteResult {
                request: pending.request,
            }),
            Err(cause) => (pending.on_failure)(Failure {
                request: pending.request,
                cause,
            }),
        }
    }
}

impl CommunicationInterface for MockComms {
    fn register_regular_poll(
        &self,
        request: ReadRequest,
        interval: Duration,
        timeout: Duration,
        on_result: ReadCallback,
        on_failure: ReadFailureCallback,
    ) -> PollTask {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let task = PollTask::new(id, request.clone(), on_result, on_failure);
        self.registrations.lock().push(Registration {
            request,
            interval,
            timeout,
        });
        self.active.lock().push(task.clone());

        let answer = self.answers.lock().get(&task.request().address).cloned();
        if let Some(registers) = answer {
            (task.result_callback())(ReadResult {
                request: task.request().clone(),
                registers: Some(RegisterArray::new(registers)),
            });
        }
        task
    }

    fn unregister_regular_poll(&self, task: &PollTask) -> bool {
        let mut active = self.active.lock();
        let before = active.len();
        active.retain(|t| t.id() != task.id());
        before != active.len()
    }

    fn submit_one_time_poll(&self, task: &PollTask) {
        self.one_time_polls.lock().push(task.request().clone());
    }

    fn submit_one_time_write(
        &self,
        request: WriteRequest,
        on_success: WriteCallback,
        on_failure: WriteFailureCallback,
    ) {
        self.writes.lock().push(request.clone());
        self.pending_writes.lock().push(PendingWrite {
            request,
            on_success,
            on_failure,
        });
    }
}

#[derive(Default)]
pub struct RecordingCallback {
    states: Mutex<Vec<(ChannelUid, State)>>,
    statuses: Mutex<Vec<StatusInfo>>,
}

impl RecordingCallback {
    pub fn states(&self) -> Vec<(ChannelUid, State)> {
        self.states.lock().clone()
    }

    pub fn statuses(&self) -> Vec<StatusInfo> {
        self.statuses.lock().clone()
    }

    /// Latest state published on `group#id`.
    pub fn state_of(&self, group: &str, id: &str) -> Option<State> {
        self.states
            .lock()
            .iter()
            .rev()
            .find(|(uid, _)| uid.group() == group && uid.id() == id)
            .map(|(_, state)| *state)
    }
}

impl ThingCallback for RecordingCallback {
    fn state_updated(&self, channel: &ChannelUid, state: State) {
        self.states.lock().push((channel.clone(), state));
    }

    fn status_updated(&self, _thing: &str, status: &StatusInfo) {
        self.statuses.lock().push(status.clone());
    }
}
