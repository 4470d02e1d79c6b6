use super::*;

pub const MAXIMUM_BUFFER_TEMPERATURE: &str = "maximum-buffer-temperature";

/// Buffer tank block, 4 registers from 3000 + 100 * (n - 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferBlock {
    pub error_number: i16,
    pub operating_state: u16,
    pub actual_high_temperature: i16,
    pub actual_low_temperature: i16,
}

impl RegisterBlock for BufferBlock {
    const GROUP: &'static str = "buffer";
    const LENGTH: u16 = 4;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            error_number: registers.get_i16(0)?,
            operating_state: registers.get_u16(1)?,
            actual_high_temperature: registers.get_i16(2)?,
            actual_low_temperature: registers.get_i16(3)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (ERROR_NUMBER, number(self.error_number)),
            (OPERATING_STATE, number(self.operating_state)),
            ("actual-high-temperature", celsius(self.actual_high_temperature)),
            ("actual-low-temperature", celsius(self.actual_low_temperature)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSettingsBlock {
    pub maximum_temperature: i16,
}

impl RegisterBlock for BufferSettingsBlock {
    const GROUP: &'static str = "buffer-settings";
    const LENGTH: u16 = 1;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            maximum_temperature: registers.get_i16(0)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![(MAXIMUM_BUFFER_TEMPERATURE, celsius(self.maximum_temperature))]
    }
}
