use super::*;

pub const MAXIMUM_BOILER_TEMPERATURE: &str = "maximum-boiler-temperature";

/// Hot water boiler block, 5 registers from 2000 + 100 * (n - 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoilerBlock {
    pub error_number: i16,
    pub operating_state: u16,
    pub actual_high_temperature: i16,
    pub actual_low_temperature: i16,
    pub actual_circulation_temperature: i16,
}

impl RegisterBlock for BoilerBlock {
    const GROUP: &'static str = "boiler";
    const LENGTH: u16 = 5;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            error_number: registers.get_i16(0)?,
            operating_state: registers.get_u16(1)?,
            actual_high_temperature: registers.get_i16(2)?,
            actual_low_temperature: registers.get_i16(3)?,
            actual_circulation_temperature: registers.get_i16(4)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (ERROR_NUMBER, number(self.error_number)),
            (OPERATING_STATE, number(self.operating_state)),
            ("actual-high-temperature", celsius(self.actual_high_temperature)),
            ("actual-low-temperature", celsius(self.actual_low_temperature)),
            (
                "actual-circulation-temperature",
                celsius(self.actual_circulation_temperature),
            ),
        ]
    }
}

/// Boiler settings, one register at offset 50.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoilerSettingsBlock {
    pub maximum_temperature: i16,
}

impl RegisterBlock for BoilerSettingsBlock {
    const GROUP: &'static str = "boiler-settings";
    const LENGTH: u16 = 1;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            maximum_temperature: registers.get_i16(0)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![(MAXIMUM_BOILER_TEMPERATURE, celsius(self.maximum_temperature))]
    }
}
