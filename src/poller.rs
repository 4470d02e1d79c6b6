//! Periodic polling of one register block.
//!
//! One [`BlockPoller`] owns at most one registered [`PollTask`]. Results and
//! failures arrive on transport threads, possibly after the handler has been
//! torn down or restarted, so every callback first checks that the endpoint it
//! was registered with is still the current one.

use std::sync::{Arc, Weak};
use std::time::Duration;

use arc_swap::ArcSwapOption;
use log::*;
use parking_lot::Mutex;

use crate::blocks::{decode, ChannelState, RegisterBlock};
use crate::bridge::Endpoint;
use crate::codec::RegisterArray;
use crate::comms::{
    CommunicationInterface, Failure, PollTask, ReadFunctionCode, ReadRequest, ReadResult,
};
use crate::error::{CodecError, Error, Result};
use crate::status::{Operation, StatusReconciler};
use crate::thing::{ChannelUid, ThingCallback};
use crate::units::State;

/// State shared between a handler and the callbacks it hands to the transport.
pub struct ThingContext {
    uid: String,
    endpoint: ArcSwapOption<Endpoint>,
    status: StatusReconciler,
    callback: Arc<dyn ThingCallback>,
}

impl ThingContext {
    pub fn new(uid: impl Into<String>, callback: Arc<dyn ThingCallback>) -> Arc<Self> {
        let uid = uid.into();
        Arc::new(Self {
            status: StatusReconciler::new(uid.clone(), callback.clone()),
            uid,
            endpoint: ArcSwapOption::empty(),
            callback,
        })
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// Snapshot of the current endpoint; `None` once torn down.
    pub fn endpoint(&self) -> Option<Arc<Endpoint>> {
        self.endpoint.load_full()
    }

    pub(crate) fn set_endpoint(&self, endpoint: Option<Endpoint>) {
        self.endpoint.store(endpoint.map(Arc::new));
    }

    pub fn status(&self) -> &StatusReconciler {
        &self.status
    }

    pub fn channel_uid(&self, group: &str, id: &str) -> ChannelUid {
        ChannelUid::new(self.uid.as_str(), group, id)
    }

    pub fn update_state(&self, group: &str, id: &str, state: State) {
        self.callback
            .state_updated(&self.channel_uid(group, id), state);
    }
}

pub type DecodeFn = fn(&RegisterArray) -> Result<Vec<ChannelState>, CodecError>;

/// Address range of a block plus the decoder that publishes it.
#[derive(Clone, Copy)]
pub struct BlockSpec {
    pub group: &'static str,
    pub address: u16,
    pub length: u16,
    pub function_code: ReadFunctionCode,
    decode: DecodeFn,
}

impl BlockSpec {
    pub fn of<B: RegisterBlock>(address: u16) -> Self {
        Self {
            group: B::GROUP,
            address,
            length: B::LENGTH,
            function_code: B::FUNCTION_CODE,
            decode: decode::<B>,
        }
    }

    pub fn decode(&self, registers: &RegisterArray) -> Result<Vec<ChannelState>, CodecError> {
        (self.decode)(registers)
    }
}

impl std::fmt::Debug for BlockSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockSpec")
            .field("group", &self.group)
            .field("address", &self.address)
            .field("length", &self.length)
            .field("function_code", &self.function_code)
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub refresh: Duration,
    pub timeout: Duration,
    pub max_tries: u32,
}

struct Registered {
    task: PollTask,
    comms: Arc<dyn CommunicationInterface>,
}

pub struct BlockPoller {
    spec: BlockSpec,
    context: Arc<ThingContext>,
    registered: Mutex<Option<Registered>>,
}

impl BlockPoller {
    pub fn new(spec: BlockSpec, context: Arc<ThingContext>) -> Self {
        Self {
            spec,
            context,
            registered: Mutex::new(None),
        }
    }

    pub fn spec(&self) -> &BlockSpec {
        &self.spec
    }

    pub fn is_registered(&self) -> bool {
        self.registered.lock().is_some()
    }

    /// Sets up the regular poll. A second call while registered is a no-op.
    pub fn register_poll_task(&self, settings: &PollSettings) -> Result<()> {
        let mut registered = self.registered.lock();
        if registered.is_some() {
            debug!("{} poller already registered", self.spec.group);
            return Ok(());
        }
        let endpoint = self.context.endpoint().ok_or(Error::NotInitialized)?;

        debug!("Setting up regular polling of {}", self.spec.group);
        let request = ReadRequest {
            slave_id: endpoint.slave_id,
            function_code: self.spec.function_code,
            address: self.spec.address,
            length: self.spec.length,
            max_tries: settings.max_tries,
        };

        let spec = self.spec;
        let context = Arc::downgrade(&self.context);
        let owner = Arc::downgrade(&endpoint);
        let on_result = Arc::new(move |result: ReadResult| {
            if let Some(context) = live(&context, &owner) {
                handle_polled_data(&context, &spec, result);
            }
        });
        let context = Arc::downgrade(&self.context);
        let owner = Arc::downgrade(&endpoint);
        let on_failure = Arc::new(move |failure: Failure<ReadRequest>| {
            if let Some(context) = live(&context, &owner) {
                context.status().failed(Operation::Read, failure.cause);
            }
        });

        let task = endpoint.comms.register_regular_poll(
            request,
            settings.refresh,
            settings.timeout,
            on_result,
            on_failure,
        );
        *registered = Some(Registered {
            task,
            comms: endpoint.comms.clone(),
        });
        Ok(())
    }

    pub fn unregister_poll_task(&self) {
        let Some(Registered { task, comms }) = self.registered.lock().take() else {
            return;
        };
        if !comms.unregister_regular_poll(&task) {
            debug!("{} poll task was already gone", self.spec.group);
        }
    }

    /// One extra read with the registered blueprint; the schedule is untouched.
    pub fn poll(&self) {
        let registered = self.registered.lock();
        let Some(Registered { task, comms }) = registered.as_ref() else {
            debug!("Refresh of {} ignored, not polling", self.spec.group);
            return;
        };
        if self.context.endpoint().is_none() {
            return;
        }
        comms.submit_one_time_poll(task);
    }
}

/// The context, if it still runs on the endpoint `owner` was registered with.
fn live(context: &Weak<ThingContext>, owner: &Weak<Endpoint>) -> Option<Arc<ThingContext>> {
    let context = context.upgrade()?;
    match context.endpoint() {
        Some(current) if Weak::ptr_eq(owner, &Arc::downgrade(&current)) => Some(context),
        _ => {
            trace!("{}: dropping callback of a finished poll", context.uid());
            None
        }
    }
}

fn handle_polled_data(context: &ThingContext, spec: &BlockSpec, result: ReadResult) {
    if let Some(registers) = result.registers {
        trace!("{} block received, size: {}", spec.group, registers.len());
        match spec.decode(&registers) {
            Ok(updates) => {
                for (id, state) in updates {
                    context.update_state(spec.group, id, state);
                }
            }
            Err(e) => {
                warn!("Cannot decode {} block: {}", spec.group, e);
                context.status().failed(Operation::Read, e.into());
                return;
            }
        }
    } else {
        trace!("{} poll returned no registers, skipping", spec.group);
    }
    context.status().succeeded(Operation::Read);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{AmbientBlock, EManagerBlock};
    use crate::error::TransportError;
    use crate::testing::{MockComms, RecordingCallback};
    use crate::thing::{StatusDetail, ThingStatus};
    use crate::units::Unit;

    fn settings() -> PollSettings {
        PollSettings {
            refresh: Duration::from_millis(5000),
            timeout: Duration::from_millis(1000),
            max_tries: 3,
        }
    }

    fn setup() -> (Arc<ThingContext>, Arc<MockComms>, Arc<RecordingCallback>) {
        let callback = Arc::new(RecordingCallback::default());
        let context = ThingContext::new("lambda:general:1", callback.clone());
        let comms = MockComms::new();
        context.set_endpoint(Some(Endpoint {
            slave_id: 1,
            comms: comms.clone(),
        }));
        (context, comms, callback)
    }

    #[test]
    fn registers_blueprint_once() {
        let (context, comms, _) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context);
        poller.register_poll_task(&settings()).unwrap();
        poller.register_poll_task(&settings()).unwrap();

        assert_eq!(comms.active_polls().len(), 1);
        let registrations = comms.registrations();
        assert_eq!(registrations.len(), 1);
        let registration = &registrations[0];
        assert_eq!(registration.request.address, 0);
        assert_eq!(registration.request.length, 5);
        assert_eq!(registration.request.max_tries, 3);
        assert_eq!(
            registration.request.function_code,
            ReadFunctionCode::ReadMultipleRegisters
        );
        assert_eq!(registration.interval, Duration::from_millis(5000));
        assert_eq!(registration.timeout, Duration::from_millis(1000));
    }

    #[test]
    fn registering_without_endpoint_fails() {
        let callback = Arc::new(RecordingCallback::default());
        let context = ThingContext::new("lambda:general:1", callback);
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context);
        assert!(matches!(
            poller.register_poll_task(&settings()),
            Err(Error::NotInitialized)
        ));
        assert!(!poller.is_registered());
    }

    #[test]
    fn tick_publishes_scaled_states_and_goes_online() {
        let (context, comms, callback) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<EManagerBlock>(100), context.clone());
        poller.register_poll_task(&settings()).unwrap();

        comms.tick(100, Some(vec![0, 1, 500, 1200, 1500]));
        assert_eq!(
            callback.state_of("e-manager", "actual-power"),
            Some(State::quantity(500.0, Unit::Watt))
        );
        assert_eq!(callback.states()[0].0.to_string(), "lambda:general:1:e-manager#error-number");
        assert!(context.status().current().is_online());
    }

    #[test]
    fn absent_registers_are_skipped() {
        let (context, comms, callback) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context.clone());
        poller.register_poll_task(&settings()).unwrap();

        comms.tick(0, None);
        assert!(callback.states().is_empty());
        assert!(context.status().current().is_online());
    }

    #[test]
    fn short_block_counts_as_read_failure() {
        let (context, comms, callback) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context.clone());
        poller.register_poll_task(&settings()).unwrap();

        comms.tick(0, Some(vec![0, 1]));
        assert!(callback.states().is_empty());
        let status = context.status().current();
        assert!(status.is(ThingStatus::Offline, StatusDetail::CommunicationError));
        assert!(status.description.unwrap().contains("CodecError"));
    }

    #[test]
    fn failure_callback_reports_cause() {
        let (context, comms, _) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context.clone());
        poller.register_poll_task(&settings()).unwrap();
        comms.tick(0, Some(vec![0; 5]));

        comms.fail(0, TransportError::new("ResponseTimeout", "response timeout"));
        let status = context.status().current();
        assert!(status.is(ThingStatus::Offline, StatusDetail::CommunicationError));
        assert!(status.description.unwrap().contains("ResponseTimeout"));
    }

    #[test]
    fn refresh_replays_blueprint() {
        let (context, comms, _) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context);
        poller.poll();
        assert!(comms.one_time_polls().is_empty());

        poller.register_poll_task(&settings()).unwrap();
        poller.poll();
        let polls = comms.one_time_polls();
        assert_eq!(polls.len(), 1);
        assert_eq!(polls[0].address, 0);
        assert_eq!(comms.registrations().len(), 1);
    }

    #[test]
    fn callbacks_after_teardown_are_ignored() {
        let (context, comms, callback) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context.clone());
        poller.register_poll_task(&settings()).unwrap();
        let task = comms.active_polls().remove(0);

        poller.unregister_poll_task();
        poller.unregister_poll_task();
        context.set_endpoint(None);
        assert!(comms.active_polls().is_empty());

        // a tick that was already in flight
        (task.result_callback())(ReadResult {
            request: task.request().clone(),
            registers: Some(RegisterArray::new(vec![0; 5])),
        });
        assert!(callback.states().is_empty());
        assert_eq!(context.status().current().status, ThingStatus::Uninitialized);
    }

    #[test]
    fn callbacks_from_before_a_restart_are_ignored() {
        let (context, comms, callback) = setup();
        let poller = BlockPoller::new(BlockSpec::of::<AmbientBlock>(0), context.clone());
        poller.register_poll_task(&settings()).unwrap();
        let stale = comms.active_polls().remove(0);

        poller.unregister_poll_task();
        context.set_endpoint(None);
        context.set_endpoint(Some(Endpoint {
            slave_id: 1,
            comms: comms.clone(),
        }));
        poller.register_poll_task(&settings()).unwrap();

        (stale.failure_callback())(Failure {
            request: stale.request().clone(),
            cause: TransportError::new("ResponseTimeout", "response timeout"),
        });
        (stale.result_callback())(ReadResult {
            request: stale.request().clone(),
            registers: Some(RegisterArray::new(vec![0, 1, 235, 230, 240])),
        });
        assert!(callback.states().is_empty());
        assert!(callback.statuses().is_empty());

        comms.tick(0, Some(vec![0, 1, 235, 230, 240]));
        assert_eq!(
            callback.state_of("ambient", "actual-ambient-temperature"),
            Some(State::quantity(23.5, Unit::Celsius))
        );
        assert!(context.status().current().is_online());
    }
}
