use super::*;

pub const ROOM_DEVICE_TEMPERATURE: &str = "room-device-temperature";
pub const SETPOINT_FLOW_LINE_TEMPERATURE: &str = "setpoint-flow-line-temperature";
pub const OPERATING_MODE: &str = "operating-mode";
pub const OFFSET_FLOW_LINE_TEMPERATURE: &str = "offset-flow-line-temperature";
pub const ROOM_HEATING_TEMPERATURE: &str = "room-heating-temperature";
pub const ROOM_COOLING_TEMPERATURE: &str = "room-cooling-temperature";

/// Heating circuit block, 7 registers from 5000 + 100 * (n - 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatingCircuitBlock {
    pub error_number: i16,
    pub operating_state: u16,
    pub flow_line_temperature: i16,
    pub return_line_temperature: i16,
    pub room_device_temperature: i16,
    pub setpoint_flow_line_temperature: i16,
    pub operating_mode: i16,
}

impl RegisterBlock for HeatingCircuitBlock {
    const GROUP: &'static str = "heating-circuit";
    const LENGTH: u16 = 7;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            error_number: registers.get_i16(0)?,
            operating_state: registers.get_u16(1)?,
            flow_line_temperature: registers.get_i16(2)?,
            return_line_temperature: registers.get_i16(3)?,
            room_device_temperature: registers.get_i16(4)?,
            setpoint_flow_line_temperature: registers.get_i16(5)?,
            operating_mode: registers.get_i16(6)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (ERROR_NUMBER, number(self.error_number)),
            (OPERATING_STATE, number(self.operating_state)),
            ("flow-line-temperature", celsius(self.flow_line_temperature)),
            ("return-line-temperature", celsius(self.return_line_temperature)),
            (ROOM_DEVICE_TEMPERATURE, celsius(self.room_device_temperature)),
            (
                SETPOINT_FLOW_LINE_TEMPERATURE,
                celsius(self.setpoint_flow_line_temperature),
            ),
            (OPERATING_MODE, number(self.operating_mode)),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatingCircuitSettingsBlock {
    pub offset_flow_line_temperature: i16,
    pub room_heating_temperature: i16,
    pub room_cooling_temperature: i16,
}

impl RegisterBlock for HeatingCircuitSettingsBlock {
    const GROUP: &'static str = "heating-circuit-settings";
    const LENGTH: u16 = 3;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            offset_flow_line_temperature: registers.get_i16(0)?,
            room_heating_temperature: registers.get_i16(1)?,
            room_cooling_temperature: registers.get_i16(2)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            (
                OFFSET_FLOW_LINE_TEMPERATURE,
                celsius(self.offset_flow_line_temperature),
            ),
            (ROOM_HEATING_TEMPERATURE, celsius(self.room_heating_temperature)),
            (ROOM_COOLING_TEMPERATURE, celsius(self.room_cooling_temperature)),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heating_circuit_block() {
        let regs = RegisterArray::new(vec![0, 1, 352, 301, 215, 360, 2]);
        let updates = decode::<HeatingCircuitBlock>(&regs).unwrap();
        assert_eq!(updates.len(), 7);
        assert_eq!(
            find(&updates, ROOM_DEVICE_TEMPERATURE),
            State::quantity(21.5, Unit::Celsius)
        );
        assert_eq!(find(&updates, OPERATING_MODE), State::Decimal(2.0));
    }

    #[test]
    fn negative_offset() {
        let regs = RegisterArray::new(vec![0xFFEC, 210, 240]);
        let updates = decode::<HeatingCircuitSettingsBlock>(&regs).unwrap();
        assert_eq!(
            find(&updates, OFFSET_FLOW_LINE_TEMPERATURE),
            State::quantity(-2.0, Unit::Celsius)
        );
    }
}
