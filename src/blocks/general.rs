use super::*;

pub const ACTUAL_AMBIENT_TEMPERATURE: &str = "actual-ambient-temperature";
pub const ACTUAL_POWER: &str = "actual-power";

/// Outdoor sensor block (registers 0..5).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmbientBlock {
    pub error_number: i16,
    pub operating_state: u16,
    pub actual_temperature: i16,
    pub average_temperature: i16,
    pub calculated_temperature: i16,
}

impl RegisterBlock for AmbientBlock {
    const GROUP: &'static str = "ambient";
    const LENGTH: u16 = 5;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            error_number: registers.get_i16(0)?,
            operating_state: registers.get_u16(1)?,
            actual_temperature: registers.get_i16(2)?,
            average_temperature: registers.get_i16(3)?,
            calculated_temperature: registers.get_i16(4)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (ERROR_NUMBER, number(self.error_number)),
            (OPERATING_STATE, number(self.operating_state)),
            (ACTUAL_AMBIENT_TEMPERATURE, celsius(self.actual_temperature)),
            ("average-ambient-temperature", celsius(self.average_temperature)),
            ("calculated-ambient-temperature", celsius(self.calculated_temperature)),
        ]
    }
}

/// Energy manager block (registers 100..105).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EManagerBlock {
    pub error_number: i16,
    pub operating_state: u16,
    /// Surplus reported to the heat pump; negative values mean import.
    pub actual_power: i16,
    pub actual_power_consumption: i16,
    pub power_consumption_setpoint: i16,
}

impl RegisterBlock for EManagerBlock {
    const GROUP: &'static str = "e-manager";
    const LENGTH: u16 = 5;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            error_number: registers.get_i16(0)?,
            operating_state: registers.get_u16(1)?,
            actual_power: registers.get_i16(2)?,
            actual_power_consumption: registers.get_i16(3)?,
            power_consumption_setpoint: registers.get_i16(4)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (ERROR_NUMBER, number(self.error_number)),
            (OPERATING_STATE, number(self.operating_state)),
            (ACTUAL_POWER, watt(self.actual_power)),
            ("actual-power-consumption", watt(self.actual_power_consumption)),
            ("power-consumption-setpoint", watt(self.power_consumption_setpoint)),
        ]
    }
}
