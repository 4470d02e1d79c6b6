//! Reconciles poll/write outcomes with the device status.
//!
//! Configuration errors are sticky: only a fresh initialize leaves them.
//! Communication errors are cleared by the next successful exchange. All
//! changes go through [`StatusReconciler::transition`], which also owns the
//! logging so a condition is reported once per change and not once per tick.

use std::sync::Arc;

use log::*;
use parking_lot::Mutex;

use crate::error::TransportError;
use crate::thing::{StatusDetail, StatusInfo, ThingCallback, ThingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Read,
    Write,
}

impl Operation {
    fn label(self) -> &'static str {
        match self {
            Operation::Read => "read",
            Operation::Write => "write",
        }
    }
}

#[derive(Debug, Clone)]
pub enum StatusEvent {
    /// Fresh initialize cycle; the only way out of a configuration error.
    Initializing,
    ConfigurationInvalid(String),
    BridgeOffline(String),
    Succeeded(Operation),
    Failed(Operation, TransportError),
}

pub struct StatusReconciler {
    thing: String,
    current: Mutex<StatusInfo>,
    callback: Arc<dyn ThingCallback>,
}

impl StatusReconciler {
    pub fn new(thing: impl Into<String>, callback: Arc<dyn ThingCallback>) -> Self {
        Self {
            thing: thing.into(),
            current: Mutex::new(StatusInfo::default()),
            callback,
        }
    }

    pub fn current(&self) -> StatusInfo {
        self.current.lock().clone()
    }

    pub fn has_configuration_error(&self) -> bool {
        self.current()
            .is(ThingStatus::Offline, StatusDetail::ConfigurationError)
    }

    pub fn initializing(&self) {
        self.transition(StatusEvent::Initializing);
    }

    pub fn configuration_error(&self, description: impl Into<String>) {
        self.transition(StatusEvent::ConfigurationInvalid(description.into()));
    }

    pub fn bridge_offline(&self, description: impl Into<String>) {
        self.transition(StatusEvent::BridgeOffline(description.into()));
    }

    pub fn succeeded(&self, operation: Operation) {
        self.transition(StatusEvent::Succeeded(operation));
    }

    pub fn failed(&self, operation: Operation, cause: TransportError) {
        self.transition(StatusEvent::Failed(operation, cause));
    }

    /// Applies `event` and returns the new status if it changed.
    pub fn transition(&self, event: StatusEvent) -> Option<StatusInfo> {
        let next = {
            let mut current = self.current.lock();
            let next = Self::next_status(&current, event)?;
            if *current == next {
                return None;
            }
            *current = next.clone();
            next
        };

        match next.status {
            ThingStatus::Offline => warn!("{} went offline: {}", self.thing, next),
            _ => debug!("{} is now {}", self.thing, next),
        }
        self.callback.status_updated(&self.thing, &next);
        Some(next)
    }

    fn next_status(current: &StatusInfo, event: StatusEvent) -> Option<StatusInfo> {
        let config_error = current.is(ThingStatus::Offline, StatusDetail::ConfigurationError);
        match event {
            StatusEvent::Initializing => Some(StatusInfo::new(ThingStatus::Unknown)),
            StatusEvent::ConfigurationInvalid(msg) => {
                Some(StatusInfo::offline(StatusDetail::ConfigurationError, msg))
            }
            StatusEvent::BridgeOffline(msg) if !config_error => {
                Some(StatusInfo::offline(StatusDetail::BridgeOffline, msg))
            }
            StatusEvent::BridgeOffline(_) => None,
            StatusEvent::Succeeded(_) if config_error => None,
            StatusEvent::Succeeded(_) if current.is_online() => None,
            StatusEvent::Succeeded(_) => Some(StatusInfo::new(ThingStatus::Online)),
            StatusEvent::Failed(..) if config_error || current.is_offline() => None,
            StatusEvent::Failed(operation, cause) => Some(StatusInfo::offline(
                StatusDetail::CommunicationError,
                format!("Error with {}: {}", operation.label(), cause),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingCallback;

    fn reconciler() -> (StatusReconciler, Arc<RecordingCallback>) {
        let callback = Arc::new(RecordingCallback::default());
        (StatusReconciler::new("lambda:general:1", callback.clone()), callback)
    }

    fn timeout() -> TransportError {
        TransportError::new("ResponseTimeout", "response timeout")
    }

    #[test]
    fn failure_then_success_recovers() {
        let (status, _) = reconciler();
        status.initializing();
        status.succeeded(Operation::Read);
        assert!(status.current().is_online());

        status.failed(Operation::Read, timeout());
        let info = status.current();
        assert!(info.is(ThingStatus::Offline, StatusDetail::CommunicationError));
        assert_eq!(
            info.description.as_deref(),
            Some("Error with read: ResponseTimeout: response timeout")
        );

        status.succeeded(Operation::Write);
        assert!(status.current().is_online());
    }

    #[test]
    fn configuration_error_is_sticky() {
        let (status, _) = reconciler();
        status.configuration_error("refresh must be positive");
        status.succeeded(Operation::Read);
        status.succeeded(Operation::Write);
        status.failed(Operation::Read, timeout());
        status.bridge_offline("Bridge is offline");
        assert!(status.has_configuration_error());

        status.initializing();
        assert_eq!(status.current().status, ThingStatus::Unknown);
    }

    #[test]
    fn failures_while_offline_do_not_overwrite_reason() {
        let (status, callback) = reconciler();
        status.bridge_offline("Bridge is offline");
        status.failed(Operation::Write, timeout());
        assert!(status
            .current()
            .is(ThingStatus::Offline, StatusDetail::BridgeOffline));

        status.succeeded(Operation::Read);
        status.failed(Operation::Read, timeout());
        status.failed(Operation::Read, timeout());
        assert_eq!(callback.statuses().len(), 3);
    }

    #[test]
    fn bridge_offline_supersedes_communication_error() {
        let (status, _) = reconciler();
        status.succeeded(Operation::Read);
        status.failed(Operation::Read, timeout());
        status.bridge_offline("Bridge is offline");
        assert!(status
            .current()
            .is(ThingStatus::Offline, StatusDetail::BridgeOffline));
    }

    #[test]
    fn unchanged_status_is_not_reported() {
        let (status, callback) = reconciler();
        assert!(status.transition(StatusEvent::Succeeded(Operation::Read)).is_some());
        assert!(status.transition(StatusEvent::Succeeded(Operation::Read)).is_none());
        assert_eq!(callback.statuses().len(), 1);
    }
}
