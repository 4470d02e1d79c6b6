//! Thing handler for one Lambda sub-system.
//!
//! Start-up and tear-down run under one lock and are idempotent. The endpoint
//! lives in the shared [`ThingContext`] so that transport callbacks can see
//! whether the handler is still running without touching that lock.

use std::sync::Arc;
use std::time::Duration;

use log::*;
use parking_lot::Mutex;

use crate::bridge::{acquire_endpoint, Bridge, BridgeStatusListener};
use crate::config::HandlerConfig;
use crate::error::{Error, Result};
use crate::poller::{BlockPoller, PollSettings, ThingContext};
use crate::profile::DeviceProfile;
use crate::thing::{ChannelUid, StatusInfo, ThingCallback, ThingStatus};
use crate::units::Command;
use crate::writer::{command_to_i16, WriteCommander};

#[derive(Debug, Clone)]
struct Active {
    profile: DeviceProfile,
    settings: PollSettings,
}

#[derive(Default)]
struct Lifecycle {
    active: Option<Active>,
    pollers: Vec<Arc<BlockPoller>>,
}

pub struct HeatPumpHandler {
    context: Arc<ThingContext>,
    bridge: Option<Arc<dyn Bridge>>,
    timeout: Duration,
    lifecycle: Mutex<Lifecycle>,
}

impl HeatPumpHandler {
    pub fn new(
        uid: impl Into<String>,
        bridge: Option<Arc<dyn Bridge>>,
        callback: Arc<dyn ThingCallback>,
        timeout: Duration,
    ) -> Self {
        Self {
            context: ThingContext::new(uid, callback),
            bridge,
            timeout,
            lifecycle: Mutex::new(Lifecycle::default()),
        }
    }

    pub fn uid(&self) -> &str {
        self.context.uid()
    }

    pub fn status(&self) -> StatusInfo {
        self.context.status().current()
    }

    /// Validates `config` and starts polling if the bridge is ready.
    pub fn initialize(&self, config: HandlerConfig) {
        debug!("Initializing {} with {:?}", self.uid(), config);
        self.tear_down();
        self.context.status().initializing();

        match config.validate() {
            Ok(profile) => {
                self.lifecycle.lock().active = Some(Active {
                    profile,
                    settings: config.poll_settings(self.timeout),
                });
                self.start_up();
            }
            Err(e) => {
                self.lifecycle.lock().active = None;
                let reason = match e {
                    Error::Configuration(reason) => reason,
                    other => other.to_string(),
                };
                self.context.status().configuration_error(reason);
            }
        }
    }

    pub fn dispose(&self) {
        debug!("Disposing {}", self.uid());
        self.tear_down();
    }

    fn start_up(&self) {
        let mut lifecycle = self.lifecycle.lock();
        if self.context.endpoint().is_some() {
            debug!("{} already started", self.uid());
            return;
        }
        let Some(active) = lifecycle.active.clone() else {
            debug!("{} has no valid configuration, not starting", self.uid());
            return;
        };

        let endpoint = match acquire_endpoint(self.bridge.as_deref()) {
            Ok(endpoint) => endpoint,
            Err(Error::BridgeOffline(reason)) => {
                self.context.status().bridge_offline(reason);
                return;
            }
            Err(e) => {
                self.context.status().bridge_offline(e.to_string());
                return;
            }
        };
        self.context.set_endpoint(Some(endpoint));
        // the first tick may complete before the loop below returns
        self.context.status().initializing();

        for spec in active.profile.blocks() {
            if lifecycle.pollers.iter().any(|p| p.spec().group == spec.group) {
                continue;
            }
            let poller = Arc::new(BlockPoller::new(*spec, self.context.clone()));
            match poller.register_poll_task(&active.settings) {
                Ok(()) => lifecycle.pollers.push(poller),
                Err(e) => warn!("{}: cannot poll {}: {}", self.uid(), spec.group, e),
            }
        }
    }

    fn tear_down(&self) {
        let mut lifecycle = self.lifecycle.lock();
        for poller in lifecycle.pollers.drain(..) {
            trace!("{}: stopping {} poller", self.uid(), poller.spec().group);
            poller.unregister_poll_task();
        }
        self.context.set_endpoint(None);
    }

    pub fn handle_command(&self, channel: &ChannelUid, command: Command) -> Result<()> {
        if command == Command::Refresh {
            let poller = self
                .lifecycle
                .lock()
                .pollers
                .iter()
                .find(|p| p.spec().group == channel.group())
                .cloned();
            match poller {
                Some(poller) => poller.poll(),
                None => debug!("No active poller for {}, refresh ignored", channel),
            }
            return Ok(());
        }

        let active = self
            .lifecycle
            .lock()
            .active
            .clone()
            .ok_or(Error::NotInitialized)?;
        let decoded = active
            .profile
            .writable(channel.group(), channel.id())
            .and_then(|target| Ok((target.address, command_to_i16(&command, target.kind)?)));
        let (address, value) = match decoded {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!("Rejecting {} for {}: {}", command.type_name(), channel, e);
                return Err(e.into());
            }
        };

        debug!("Writing {} = {} to register {}", channel, value, address);
        WriteCommander::new(self.context.clone(), active.settings.max_tries)
            .write_int16(address, value)
    }
}

impl BridgeStatusListener for HeatPumpHandler {
    fn bridge_status_changed(&self, status: ThingStatus) {
        debug!("{}: bridge is now {:?}", self.uid(), status);
        match status {
            ThingStatus::Online => self.start_up(),
            ThingStatus::Offline => {
                self.tear_down();
                self.context.status().bridge_offline("Bridge is offline");
            }
            _ => {}
        }
    }
}
