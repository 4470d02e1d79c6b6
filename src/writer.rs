use std::sync::Arc;

use log::*;

use crate::codec::{encode_i16, unscale_i16};
use crate::comms::{Failure, WriteRequest, WriteResult};
use crate::error::{CommandError, Error, Result};
use crate::poller::ThingContext;
use crate::status::Operation;
use crate::units::{Command, Unit};

/// How a command maps onto a single holding register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    /// Quantity converted to `unit`, then multiplied by `10^-exponent`.
    Scaled { unit: Unit, exponent: i32 },
    /// Plain number such as a mode or request type.
    Plain,
}

impl WriteKind {
    pub const fn celsius_tenths() -> Self {
        WriteKind::Scaled {
            unit: Unit::Celsius,
            exponent: -1,
        }
    }

    pub const fn kelvin_tenths() -> Self {
        WriteKind::Scaled {
            unit: Unit::Kelvin,
            exponent: -1,
        }
    }

    pub const fn watt() -> Self {
        WriteKind::Scaled {
            unit: Unit::Watt,
            exponent: 0,
        }
    }
}

/// Turns `command` into the raw register value, truncating any fraction.
pub fn command_to_i16(command: &Command, kind: WriteKind) -> Result<i16, CommandError> {
    let (value, exponent) = match (kind, command) {
        (WriteKind::Scaled { unit, exponent }, Command::Quantity(quantity)) => {
            let converted =
                quantity
                    .to_unit(unit)
                    .ok_or_else(|| CommandError::UnsupportedUnit {
                        expected: unit,
                        actual: quantity.unit(),
                    })?;
            (converted.value(), exponent)
        }
        (WriteKind::Scaled { exponent, .. }, Command::Decimal(value)) => (*value, exponent),
        (WriteKind::Plain, Command::Decimal(value)) => (*value, 0),
        (_, command) => {
            return Err(CommandError::UnsupportedCommandType(
                command.type_name().to_string(),
            ))
        }
    };
    unscale_i16(value, exponent).ok_or(CommandError::OutOfRange(value))
}

/// Issues single register writes on behalf of one thing.
pub struct WriteCommander {
    context: Arc<ThingContext>,
    max_tries: u32,
}

impl WriteCommander {
    pub fn new(context: Arc<ThingContext>, max_tries: u32) -> Self {
        Self { context, max_tries }
    }

    pub fn write_int16(&self, address: u16, value: i16) -> Result<()> {
        let endpoint = self
            .context
            .endpoint()
            .ok_or_else(|| Error::BridgeOffline("No endpoint to write to".into()))?;

        let request = WriteRequest {
            slave_id: endpoint.slave_id,
            address,
            payload: encode_i16(value),
            max_tries: self.max_tries,
        };
        debug!("Submitting {}", request);

        let context = Arc::downgrade(&self.context);
        let on_success = Box::new(move |result: WriteResult| {
            let Some(context) = context.upgrade() else {
                return;
            };
            if context.endpoint().is_none() {
                return;
            }
            debug!("Successful write, matching request {}", result.request);
            context.status().succeeded(Operation::Write);
        });
        let context = Arc::downgrade(&self.context);
        let on_failure = Box::new(move |failure: Failure<WriteRequest>| {
            let Some(context) = context.upgrade() else {
                return;
            };
            if context.endpoint().is_none() {
                return;
            }
            debug!("Unsuccessful write, matching request {}", failure.request);
            context.status().failed(Operation::Write, failure.cause);
        });

        endpoint
            .comms
            .submit_one_time_write(request, on_success, on_failure);
        Ok(())
    }

    /// Decodes and writes; a rejected command never reaches the transport.
    pub fn write_command(&self, address: u16, command: &Command, kind: WriteKind) -> Result<()> {
        let value = command_to_i16(command, kind)?;
        self.write_int16(address, value)
    }
}
