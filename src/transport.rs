//! Modbus transport behind [`CommunicationInterface`].
//!
//! Every regular poll runs as its own tokio task on an interval. Reads and
//! writes are retried up to `max_tries` times, each attempt bounded by the
//! request timeout. All tasks of one endpoint share a pacer, so only one
//! transaction is on the wire at a time and consecutive transactions are at
//! least `time_between_transactions` apart.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::*;
use parking_lot::Mutex;
use rodbus::client::{Channel, HostAddr, RequestParam};
use rodbus::{
    AddressRange, DataBits, DecodeLevel, FlowControl, Indexed, Parity, RetryStrategy,
    SerialSettings, StopBits, UnitId,
};
use tokio::runtime::Handle;
use tokio::sync::{Mutex as AsyncMutex, MutexGuard as AsyncMutexGuard};
use tokio::time::{interval, sleep_until, timeout, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::codec::RegisterArray;
use crate::comms::{
    CommunicationInterface, Failure, PollTask, ReadCallback, ReadFailureCallback,
    ReadFunctionCode, ReadRequest, ReadResult, WriteCallback, WriteFailureCallback, WriteRequest,
    WriteResult,
};
use crate::config::{EndpointConfig, TransportKind};
use crate::error::TransportError;

/// Raw register access to one Modbus connection.
#[async_trait]
pub trait RegisterIo: Clone + Send + Sync + 'static {
    async fn read(&mut self, request: &ReadRequest, timeout: Duration)
        -> Result<Vec<u16>, TransportError>;

    async fn write(&mut self, request: &WriteRequest, timeout: Duration)
        -> Result<(), TransportError>;
}

#[async_trait]
impl RegisterIo for Channel {
    async fn read(
        &mut self,
        request: &ReadRequest,
        timeout: Duration,
    ) -> Result<Vec<u16>, TransportError> {
        let param = RequestParam {
            id: UnitId {
                value: request.slave_id,
            },
            response_timeout: timeout,
        };
        let range = AddressRange {
            start: request.address,
            count: request.length,
        };
        let values = match request.function_code {
            ReadFunctionCode::ReadMultipleRegisters => {
                self.read_holding_registers(param, range).await?
            }
            ReadFunctionCode::ReadInputRegisters => self.read_input_registers(param, range).await?,
        };
        Ok(values.into_iter().map(|v| v.value).collect())
    }

    async fn write(&mut self, request: &WriteRequest, timeout: Duration) -> Result<(), TransportError> {
        let param = RequestParam {
            id: UnitId {
                value: request.slave_id,
            },
            response_timeout: timeout,
        };
        self.write_single_register(param, Indexed::new(request.address, request.value()))
            .await?;
        Ok(())
    }
}

struct LoggingRetryStrategy {
    delay: Duration,
}

impl RetryStrategy for LoggingRetryStrategy {
    fn reset(&mut self) {
        debug!("RetryStrategy - Resetting connection");
    }

    fn after_failed_connect(&mut self) -> Duration {
        debug!("RetryStrategy - Failed to connect");
        self.delay
    }

    fn after_disconnect(&mut self) -> Duration {
        debug!("RetryStrategy - Disconnected");
        self.delay
    }
}

/// Spawns the rodbus client task for `config`. The channel starts disabled.
pub fn spawn_channel(config: &EndpointConfig) -> Channel {
    let retry = Box::new(LoggingRetryStrategy {
        delay: config.reconnect_delay(),
    });
    match config.transport {
        TransportKind::Tcp => {
            let host = match config.host.parse::<IpAddr>() {
                Ok(ip) => HostAddr::ip(ip, config.port),
                Err(_) => HostAddr::dns(config.host.clone(), config.port),
            };
            rodbus::client::spawn_tcp_client_task(host, 1, retry, DecodeLevel::default(), None)
        }
        TransportKind::Serial => rodbus::client::spawn_rtu_client_task(
            &config.path,
            SerialSettings {
                baud_rate: config.baud,
                data_bits: DataBits::Eight,
                flow_control: FlowControl::None,
                stop_bits: StopBits::One,
                parity: Parity::None,
            },
            1,
            retry,
            DecodeLevel::default(),
            None,
        ),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransportSettings {
    /// Used for one-time polls of tasks that are no longer registered.
    pub default_timeout: Duration,
    pub time_between_transactions: Duration,
}

impl From<&EndpointConfig> for TransportSettings {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            default_timeout: config.timeout(),
            time_between_transactions: config.time_between_transactions(),
        }
    }
}

/// Hands out the wire to one transaction at a time.
#[derive(Clone)]
struct Pacer {
    pause: Duration,
    last: Arc<AsyncMutex<Option<Instant>>>,
}

/// Exclusive use of the wire; the transaction ends when this is dropped.
struct Turn<'a> {
    last: AsyncMutexGuard<'a, Option<Instant>>,
}

impl Pacer {
    fn new(pause: Duration) -> Self {
        Self {
            pause,
            last: Arc::new(AsyncMutex::new(None)),
        }
    }

    async fn turn(&self) -> Turn<'_> {
        let last = self.last.lock().await;
        if let Some(at) = *last {
            sleep_until(at + self.pause).await;
        }
        Turn { last }
    }
}

impl Drop for Turn<'_> {
    fn drop(&mut self) {
        *self.last = Some(Instant::now());
    }
}

struct Registration {
    token: CancellationToken,
    timeout: Duration,
}

pub struct ModbusComms<C> {
    io: C,
    runtime: Handle,
    settings: TransportSettings,
    pacer: Pacer,
    next_id: AtomicU64,
    polls: Mutex<HashMap<u64, Registration>>,
}

impl<C: RegisterIo> ModbusComms<C> {
    pub fn new(io: C, settings: TransportSettings, runtime: Handle) -> Self {
        Self {
            io,
            runtime,
            settings,
            pacer: Pacer::new(settings.time_between_transactions),
            next_id: AtomicU64::new(0),
            polls: Mutex::new(HashMap::new()),
        }
    }

    pub fn active_polls(&self) -> usize {
        self.polls.lock().len()
    }
}

async fn read_with_retries<C: RegisterIo>(
    io: &mut C,
    request: &ReadRequest,
    limit: Duration,
    pacer: &Pacer,
) -> Result<RegisterArray, TransportError> {
    let tries = request.max_tries.max(1);
    let mut attempt = 1;
    loop {
        let result = {
            let _turn = pacer.turn().await;
            let now = Instant::now();
            let result = match timeout(limit, io.read(request, limit)).await {
                Ok(result) => result,
                Err(_) => Err(elapsed(limit)),
            };
            trace!("{} took {} ms", request, now.elapsed().as_millis());
            result
        };
        match result {
            Ok(values) => return Ok(RegisterArray::new(values)),
            Err(e) if attempt < tries => {
                debug!("{} attempt {}/{} failed: {}", request, attempt, tries, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn write_with_retries<C: RegisterIo>(
    io: &mut C,
    request: &WriteRequest,
    limit: Duration,
    pacer: &Pacer,
) -> Result<(), TransportError> {
    let tries = request.max_tries.max(1);
    let mut attempt = 1;
    loop {
        let result = {
            let _turn = pacer.turn().await;
            match timeout(limit, io.write(request, limit)).await {
                Ok(result) => result,
                Err(_) => Err(elapsed(limit)),
            }
        };
        match result {
            Ok(()) => return Ok(()),
            Err(e) if attempt < tries => {
                debug!("{} attempt {}/{} failed: {}", request, attempt, tries, e);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn elapsed(limit: Duration) -> TransportError {
    TransportError::new(
        "ResponseTimeout",
        format!("no response within {} ms", limit.as_millis()),
    )
}

fn deliver(task: &PollTask, outcome: Result<RegisterArray, TransportError>) {
    let request = task.request().clone();
    match outcome {
        Ok(registers) => (task.result_callback())(ReadResult {
            request,
            registers: Some(registers),
        }),
        Err(cause) => (task.failure_callback())(Failure { request, cause }),
    }
}

impl<C: RegisterIo> CommunicationInterface for ModbusComms<C> {
    fn register_regular_poll(
        &self,
        request: ReadRequest,
        period: Duration,
        timeout: Duration,
        on_result: ReadCallback,
        on_failure: ReadFailureCallback,
    ) -> PollTask {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let task = PollTask::new(id, request, on_result, on_failure);
        let token = CancellationToken::new();
        self.polls.lock().insert(
            id,
            Registration {
                token: token.clone(),
                timeout,
            },
        );
        debug!("Registered poll task {} for {} every {:?}", id, task.request(), period);

        let job = task.clone();
        let mut io = self.io.clone();
        let pacer = self.pacer.clone();
        self.runtime.spawn(async move {
            let mut ticker = interval(period.max(Duration::from_millis(1)));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                // a read already on the wire still reports its outcome
                let outcome = read_with_retries(&mut io, job.request(), timeout, &pacer).await;
                deliver(&job, outcome);
            }
            trace!("Poll task {} stopped", job.id());
        });
        task
    }

    fn unregister_regular_poll(&self, task: &PollTask) -> bool {
        match self.polls.lock().remove(&task.id()) {
            Some(registration) => {
                registration.token.cancel();
                debug!("Unregistered poll task {}", task.id());
                true
            }
            None => false,
        }
    }

    fn submit_one_time_poll(&self, task: &PollTask) {
        let limit = self
            .polls
            .lock()
            .get(&task.id())
            .map(|r| r.timeout)
            .unwrap_or(self.settings.default_timeout);
        let job = task.clone();
        let mut io = self.io.clone();
        let pacer = self.pacer.clone();
        self.runtime.spawn(async move {
            let outcome = read_with_retries(&mut io, job.request(), limit, &pacer).await;
            deliver(&job, outcome);
        });
    }

    fn submit_one_time_write(
        &self,
        request: WriteRequest,
        on_success: WriteCallback,
        on_failure: WriteFailureCallback,
    ) {
        let mut io = self.io.clone();
        let limit = self.settings.default_timeout;
        let pacer = self.pacer.clone();
        self.runtime.spawn(async move {
            match write_with_retries(&mut io, &request, limit, &pacer).await {
                Ok(()) => on_success(WriteResult { request }),
                Err(cause) => on_failure(Failure { request, cause }),
            }
        });
    }
}

impl<C> Drop for ModbusComms<C> {
    fn drop(&mut self) {
        for (_, registration) in self.polls.lock().drain() {
            registration.token.cancel();
        }
    }
}
