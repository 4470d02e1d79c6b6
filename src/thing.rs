use std::fmt::Display;

use crate::units::State;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThingStatus {
    Uninitialized,
    Unknown,
    Online,
    Offline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusDetail {
    None,
    ConfigurationError,
    CommunicationError,
    BridgeOffline,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusInfo {
    pub status: ThingStatus,
    pub detail: StatusDetail,
    pub description: Option<String>,
}

impl StatusInfo {
    pub fn new(status: ThingStatus) -> Self {
        Self {
            status,
            detail: StatusDetail::None,
            description: None,
        }
    }

    pub fn offline(detail: StatusDetail, description: impl Into<String>) -> Self {
        Self {
            status: ThingStatus::Offline,
            detail,
            description: Some(description.into()),
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == ThingStatus::Online
    }

    pub fn is_offline(&self) -> bool {
        self.status == ThingStatus::Offline
    }

    pub fn is(&self, status: ThingStatus, detail: StatusDetail) -> bool {
        self.status == status && self.detail == detail
    }
}

impl Default for StatusInfo {
    fn default() -> Self {
        Self::new(ThingStatus::Uninitialized)
    }
}

impl Display for StatusInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.status)?;
        if self.detail != StatusDetail::None {
            write!(f, " ({:?})", self.detail)?;
        }
        if let Some(description) = &self.description {
            write!(f, ": {}", description)?;
        }
        Ok(())
    }
}

/// Address of a channel: `<thing>:<group>#<channel>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelUid {
    thing: String,
    group: String,
    id: String,
}

impl ChannelUid {
    pub fn new(thing: impl Into<String>, group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            thing: thing.into(),
            group: group.into(),
            id: id.into(),
        }
    }

    pub fn thing(&self) -> &str {
        &self.thing
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Display for ChannelUid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}#{}", self.thing, self.group, self.id)
    }
}

/// Sink into the host framework. Invoked from transport worker threads.
pub trait ThingCallback: Send + Sync {
    fn state_updated(&self, channel: &ChannelUid, state: State);

    fn status_updated(&self, thing: &str, status: &StatusInfo);
}

/// Logs every update; used by the daemon.
#[derive(Debug, Default)]
pub struct LoggingCallback;

impl ThingCallback for LoggingCallback {
    fn state_updated(&self, channel: &ChannelUid, state: State) {
        log::info!("{channel} = {state}");
    }

    fn status_updated(&self, thing: &str, status: &StatusInfo) {
        log::info!("{thing} is {status}");
    }
}
