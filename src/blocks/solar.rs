use super::*;

pub const MAXIMUM_BUFFER_TEMPERATURE: &str = "maximum-buffer-temperature";
pub const BUFFER_CHANGEOVER_TEMPERATURE: &str = "buffer-changeover-temperature";

/// Solar thermal block, 5 registers from 4000 + 100 * (n - 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolarBlock {
    pub error_number: i16,
    pub operating_state: u16,
    pub collector_temperature: i16,
    pub buffer1_temperature: i16,
    pub buffer2_temperature: i16,
}

impl RegisterBlock for SolarBlock {
    const GROUP: &'static str = "solar";
    const LENGTH: u16 = 5;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            error_number: registers.get_i16(0)?,
            operating_state: registers.get_u16(1)?,
            collector_temperature: registers.get_i16(2)?,
            buffer1_temperature: registers.get_i16(3)?,
            buffer2_temperature: registers.get_i16(4)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (ERROR_NUMBER, number(self.error_number)),
            (OPERATING_STATE, number(self.operating_state)),
            ("collector-temperature", celsius(self.collector_temperature)),
            ("buffer1-temperature", celsius(self.buffer1_temperature)),
            ("buffer2-temperature", celsius(self.buffer2_temperature)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolarSettingsBlock {
    pub maximum_buffer_temperature: i16,
    pub buffer_changeover_temperature: i16,
}

impl RegisterBlock for SolarSettingsBlock {
    const GROUP: &'static str = "solar-settings";
    const LENGTH: u16 = 2;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            maximum_buffer_temperature: registers.get_i16(0)?,
            buffer_changeover_temperature: registers.get_i16(1)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (MAXIMUM_BUFFER_TEMPERATURE, celsius(self.maximum_buffer_temperature)),
            (
                BUFFER_CHANGEOVER_TEMPERATURE,
                celsius(self.buffer_changeover_temperature),
            ),
        ]
    }
}
