//! Register block decoders for the Lambda heat pump sub-systems.
//!
//! A block is an immutable snapshot of one contiguous register range. It is
//! parsed from the raw registers and turned into channel updates, which is
//! where fixed-point scaling happens. Decoders are stateless.

pub mod boiler;
pub mod buffer;
pub mod general;
pub mod heat_pump;
pub mod heating_circuit;
pub mod solar;

pub use boiler::{BoilerBlock, BoilerSettingsBlock};
pub use buffer::{BufferBlock, BufferSettingsBlock};
pub use general::{AmbientBlock, EManagerBlock};
pub use heat_pump::HeatPumpBlock;
pub use heating_circuit::{HeatingCircuitBlock, HeatingCircuitSettingsBlock};
pub use solar::{SolarBlock, SolarSettingsBlock};

use crate::codec::{scale, RegisterArray};
use crate::comms::ReadFunctionCode;
use crate::error::CodecError;
use crate::units::{State, Unit};

/// Channel id within the block's group, and its new state.
pub type ChannelState = (&'static str, State);

pub trait RegisterBlock: Sized {
    const GROUP: &'static str;
    const LENGTH: u16;
    const FUNCTION_CODE: ReadFunctionCode = ReadFunctionCode::ReadMultipleRegisters;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError>;

    fn channel_updates(&self) -> Vec<ChannelState>;
}

pub fn decode<B: RegisterBlock>(registers: &RegisterArray) -> Result<Vec<ChannelState>, CodecError> {
    B::parse(registers).map(|block| block.channel_updates())
}

// Shared channel ids.
pub const ERROR_NUMBER: &str = "error-number";
pub const OPERATING_STATE: &str = "operating-state";

/// Temperature with one decimal (raw value in 0.1 °C).
pub(crate) fn celsius(raw: i16) -> State {
    State::quantity(scale(raw.into(), -1), Unit::Celsius)
}

pub(crate) fn watt(raw: i16) -> State {
    State::quantity(raw.into(), Unit::Watt)
}

/// Energy counter in Wh, published as kWh.
pub(crate) fn kilowatt_hours(raw: i32) -> State {
    State::quantity(scale(raw.into(), -3), Unit::KilowattHour)
}

pub(crate) fn scaled(raw: i16, exponent: i32, unit: Unit) -> State {
    State::quantity(scale(raw.into(), exponent), unit)
}

pub(crate) fn number(raw: impl Into<f64>) -> State {
    State::Decimal(raw.into())
}

#[cfg(test)]
pub(crate) fn find(updates: &[ChannelState], id: &str) -> State {
    updates
        .iter()
        .find(|(channel, _)| *channel == id)
        .map(|(_, state)| *state)
        .unwrap_or_else(|| panic!("no update for {id}"))
}
