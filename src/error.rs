use thiserror::Error;

use crate::units::Unit;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The parent endpoint is missing, offline or not initialized yet.
    #[error("bridge offline: {0}")]
    BridgeOffline(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("communication error: {0}")]
    Communication(#[from] TransportError),

    #[error("command rejected: {0}")]
    CommandDecode(#[from] CommandError),

    #[error("register decoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("handler not initialized")]
    NotInitialized,
}

/// Reasons a command is refused before any request reaches the wire.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CommandError {
    #[error("Unsupported command type: {0}")]
    UnsupportedCommandType(String),

    #[error("Unsupported unit: expected {expected}, got {actual}")]
    UnsupportedUnit { expected: Unit, actual: Unit },

    #[error("Value {0} does not fit into a 16 bit register")]
    OutOfRange(f64),

    #[error("Channel {0} is read-only")]
    ReadOnlyChannel(String),

    #[error("Unknown channel {0}")]
    UnknownChannel(String),
}

impl CommandError {
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::UnsupportedCommandType(_) => "UnsupportedCommandType",
            CommandError::UnsupportedUnit { .. } => "UnsupportedUnit",
            CommandError::OutOfRange(_) => "OutOfRange",
            CommandError::ReadOnlyChannel(_) => "ReadOnlyChannel",
            CommandError::UnknownChannel(_) => "UnknownChannel",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("register index {index} out of bounds for block of {len} registers")]
    OutOfBounds { index: usize, len: usize },

    #[error("payload of {0} bytes is not a whole number of registers")]
    OddPayload(usize),
}

/// Cause of a failed transport exchange.
///
/// `kind` names the failure class (e.g. `ResponseTimeout`) so that it can be
/// shown to an operator next to the message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    kind: String,
    message: String,
}

impl TransportError {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<rodbus::RequestError> for TransportError {
    fn from(err: rodbus::RequestError) -> Self {
        use rodbus::RequestError::*;

        let kind = match &err {
            ResponseTimeout => "ResponseTimeout",
            NoConnection => "NoConnection",
            Shutdown => "Shutdown",
            Io(_) => "IoError",
            Exception(_) => "ModbusException",
            _ => "RequestError",
        };
        Self::new(kind, err.to_string())
    }
}

impl From<CodecError> for TransportError {
    fn from(err: CodecError) -> Self {
        Self::new("CodecError", err.to_string())
    }
}
