//! Transport capability consumed by the pollers and the write path.
//!
//! Submissions return immediately; results are delivered later through the
//! callbacks, on whatever thread the implementation runs them on.

use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use strum_macros::{Display as StrumDisplay, FromRepr};

use crate::codec::RegisterArray;
use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, FromRepr, StrumDisplay)]
#[repr(u8)]
pub enum ReadFunctionCode {
    ReadMultipleRegisters = 3,
    ReadInputRegisters = 4,
}

/// Blueprint of a register read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadRequest {
    pub slave_id: u8,
    pub function_code: ReadFunctionCode,
    pub address: u16,
    pub length: u16,
    pub max_tries: u32,
}

impl Display for ReadRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ReadRequest(slave={}, fc={}, address={}, length={}, max_tries={})",
            self.slave_id, self.function_code as u8, self.address, self.length, self.max_tries
        )
    }
}

/// Blueprint of a single holding register write (FC06).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteRequest {
    pub slave_id: u8,
    pub address: u16,
    pub payload: [u8; 2],
    pub max_tries: u32,
}

impl WriteRequest {
    pub fn value(&self) -> u16 {
        u16::from_be_bytes(self.payload)
    }
}

impl Display for WriteRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "WriteRequest(slave={}, address={}, value={:#06x}, max_tries={})",
            self.slave_id,
            self.address,
            self.value(),
            self.max_tries
        )
    }
}

#[derive(Debug, Clone)]
pub struct ReadResult {
    pub request: ReadRequest,
    /// May be absent even on success; callers skip such ticks.
    pub registers: Option<RegisterArray>,
}

#[derive(Debug, Clone)]
pub struct WriteResult {
    pub request: WriteRequest,
}

#[derive(Debug, Clone)]
pub struct Failure<R> {
    pub request: R,
    pub cause: TransportError,
}

pub type ReadCallback = Arc<dyn Fn(ReadResult) + Send + Sync>;
pub type ReadFailureCallback = Arc<dyn Fn(Failure<ReadRequest>) + Send + Sync>;
pub type WriteCallback = Box<dyn FnOnce(WriteResult) + Send>;
pub type WriteFailureCallback = Box<dyn FnOnce(Failure<WriteRequest>) + Send>;

/// A registered periodic read. Cloning shares the same registration.
#[derive(Clone)]
pub struct PollTask {
    id: u64,
    request: ReadRequest,
    on_result: ReadCallback,
    on_failure: ReadFailureCallback,
}

impl PollTask {
    pub fn new(
        id: u64,
        request: ReadRequest,
        on_result: ReadCallback,
        on_failure: ReadFailureCallback,
    ) -> Self {
        Self {
            id,
            request,
            on_result,
            on_failure,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn request(&self) -> &ReadRequest {
        &self.request
    }

    pub fn result_callback(&self) -> ReadCallback {
        self.on_result.clone()
    }

    pub fn failure_callback(&self) -> ReadFailureCallback {
        self.on_failure.clone()
    }
}

impl std::fmt::Debug for PollTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollTask")
            .field("id", &self.id)
            .field("request", &self.request)
            .finish()
    }
}

pub trait CommunicationInterface: Send + Sync {
    /// Schedules `request` every `interval`; each attempt is bounded by `timeout`.
    fn register_regular_poll(
        &self,
        request: ReadRequest,
        interval: Duration,
        timeout: Duration,
        on_result: ReadCallback,
        on_failure: ReadFailureCallback,
    ) -> PollTask;

    /// Returns false if the task was not registered (anymore).
    fn unregister_regular_poll(&self, task: &PollTask) -> bool;

    /// Runs the task's blueprint once, off-cycle.
    fn submit_one_time_poll(&self, task: &PollTask);

    fn submit_one_time_write(
        &self,
        request: WriteRequest,
        on_success: WriteCallback,
        on_failure: WriteFailureCallback,
    );
}
