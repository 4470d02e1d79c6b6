use std::sync::{Arc, Weak};

use log::*;
use parking_lot::Mutex;

use crate::comms::CommunicationInterface;
use crate::error::{Error, Result};
use crate::thing::ThingStatus;

/// Parent of a heat pump sub-system thing: the Modbus slave endpoint.
pub trait EndpointHandler: Send + Sync {
    fn slave_id(&self) -> Result<u8>;

    fn communication_interface(&self) -> Result<Arc<dyn CommunicationInterface>>;
}

pub trait Bridge: Send + Sync {
    fn status(&self) -> ThingStatus;

    fn label(&self) -> String;

    fn handler(&self) -> Option<Arc<dyn EndpointHandler>>;
}

pub trait BridgeStatusListener: Send + Sync {
    fn bridge_status_changed(&self, status: ThingStatus);
}

/// Open connection to one slave, owned by a single handler.
#[derive(Clone)]
pub struct Endpoint {
    pub slave_id: u8,
    pub comms: Arc<dyn CommunicationInterface>,
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("slave_id", &self.slave_id)
            .finish_non_exhaustive()
    }
}

pub fn acquire_endpoint(bridge: Option<&dyn Bridge>) -> Result<Endpoint> {
    let Some(bridge) = bridge else {
        debug!("Bridge is null");
        return Err(Error::BridgeOffline("Bridge is offline".into()));
    };
    if bridge.status() != ThingStatus::Online {
        debug!("Bridge is not online");
        return Err(Error::BridgeOffline("Bridge is offline".into()));
    }
    let Some(handler) = bridge.handler() else {
        debug!("Bridge handler is null");
        return Err(Error::BridgeOffline("Bridge is offline".into()));
    };

    let endpoint = handler.slave_id().and_then(|slave_id| {
        handler
            .communication_interface()
            .map(|comms| Endpoint { slave_id, comms })
    });
    endpoint.map_err(|e| {
        debug!("Endpoint not ready: {e}");
        Error::BridgeOffline(format!(
            "Bridge '{}' not completely initialized",
            bridge.label()
        ))
    })
}

/// Slave endpoint backed by a fixed transport.
pub struct SlaveEndpoint {
    slave_id: u8,
    comms: Mutex<Option<Arc<dyn CommunicationInterface>>>,
}

impl SlaveEndpoint {
    pub fn new(slave_id: u8, comms: Option<Arc<dyn CommunicationInterface>>) -> Self {
        Self {
            slave_id,
            comms: Mutex::new(comms),
        }
    }

    pub fn set_comms(&self, comms: Option<Arc<dyn CommunicationInterface>>) {
        *self.comms.lock() = comms;
    }
}

impl EndpointHandler for SlaveEndpoint {
    fn slave_id(&self) -> Result<u8> {
        Ok(self.slave_id)
    }

    fn communication_interface(&self) -> Result<Arc<dyn CommunicationInterface>> {
        self.comms.lock().clone().ok_or(Error::NotInitialized)
    }
}

/// Bridge that forwards its status changes to the attached handlers.
pub struct ModbusBridge {
    label: String,
    status: Mutex<ThingStatus>,
    handler: Option<Arc<dyn EndpointHandler>>,
    listeners: Mutex<Vec<Weak<dyn BridgeStatusListener>>>,
}

impl ModbusBridge {
    pub fn new(label: impl Into<String>, handler: Option<Arc<dyn EndpointHandler>>) -> Self {
        Self {
            label: label.into(),
            status: Mutex::new(ThingStatus::Unknown),
            handler,
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn attach(&self, listener: Weak<dyn BridgeStatusListener>) {
        self.listeners.lock().push(listener);
    }

    pub fn set_status(&self, status: ThingStatus) {
        {
            let mut current = self.status.lock();
            if *current == status {
                return;
            }
            *current = status;
        }
        info!("Bridge '{}' is {:?}", self.label, status);

        let listeners: Vec<_> = {
            let mut listeners = self.listeners.lock();
            listeners.retain(|l| l.strong_count() > 0);
            listeners.iter().filter_map(Weak::upgrade).collect()
        };
        for listener in listeners {
            listener.bridge_status_changed(status);
        }
    }
}

impl Bridge for ModbusBridge {
    fn status(&self) -> ThingStatus {
        *self.status.lock()
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn handler(&self) -> Option<Arc<dyn EndpointHandler>> {
        self.handler.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockComms;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn bridge_with(comms: Option<Arc<dyn CommunicationInterface>>) -> ModbusBridge {
        ModbusBridge::new("heat pump", Some(Arc::new(SlaveEndpoint::new(7, comms))))
    }

    #[test]
    fn missing_or_offline_bridge_is_reported() {
        assert!(matches!(acquire_endpoint(None), Err(Error::BridgeOffline(_))));

        let bridge = bridge_with(Some(MockComms::new() as Arc<dyn CommunicationInterface>));
        assert!(matches!(
            acquire_endpoint(Some(&bridge)),
            Err(Error::BridgeOffline(_))
        ));

        let bridge = ModbusBridge::new("no handler", None);
        bridge.set_status(ThingStatus::Online);
        assert!(acquire_endpoint(Some(&bridge)).is_err());
    }

    #[test]
    fn uninitialized_endpoint_names_the_bridge() {
        let bridge = bridge_with(None);
        bridge.set_status(ThingStatus::Online);
        match acquire_endpoint(Some(&bridge)) {
            Err(Error::BridgeOffline(msg)) => {
                assert_eq!(msg, "Bridge 'heat pump' not completely initialized")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn online_bridge_yields_endpoint() {
        let bridge = bridge_with(Some(MockComms::new() as Arc<dyn CommunicationInterface>));
        bridge.set_status(ThingStatus::Online);
        let endpoint = acquire_endpoint(Some(&bridge)).unwrap();
        assert_eq!(endpoint.slave_id, 7);
    }

    struct Counter(AtomicUsize);

    impl BridgeStatusListener for Counter {
        fn bridge_status_changed(&self, _status: ThingStatus) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn listeners_see_changes_only() {
        let bridge = bridge_with(None);
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        let weak = Arc::downgrade(&counter);
        bridge.attach(weak);

        bridge.set_status(ThingStatus::Online);
        bridge.set_status(ThingStatus::Online);
        bridge.set_status(ThingStatus::Offline);
        assert_eq!(counter.0.load(Ordering::SeqCst), 2);

        drop(counter);
        bridge.set_status(ThingStatus::Online);
    }
}
