use super::*;

pub const REQUEST_TYPE: &str = "request-type";
pub const REQUESTED_FLOW_LINE_TEMPERATURE: &str = "requested-flow-line-temperature";
pub const REQUESTED_RETURN_LINE_TEMPERATURE: &str = "requested-return-line-temperature";
pub const REQUESTED_TEMPERATURE_DIFFERENCE: &str = "requested-temperature-difference";

// Register offsets of the writable requests.
pub const REQUEST_TYPE_OFFSET: u16 = 15;
pub const REQUESTED_FLOW_LINE_OFFSET: u16 = 16;
pub const REQUESTED_RETURN_LINE_OFFSET: u16 = 17;
pub const REQUESTED_DIFFERENCE_OFFSET: u16 = 18;

/// Heat pump module block, 24 registers from 1000 + 100 * (n - 1).
///
/// Measured temperatures and flows are in hundredths, requests in tenths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeatPumpBlock {
    pub error_state: u16,
    pub error_number: i16,
    pub state: u16,
    pub operating_state: u16,
    pub flow_line_temperature: i16,
    pub return_line_temperature: i16,
    pub volume_flow_heat_sink: i16,
    pub energy_source_inlet_temperature: i16,
    pub energy_source_outlet_temperature: i16,
    pub volume_flow_energy_source: i16,
    pub compressor_rating: u16,
    pub actual_heating_capacity: i16,
    pub inverter_power_consumption: i16,
    pub cop: i16,
    pub request_type: i16,
    pub requested_flow_line_temperature: i16,
    pub requested_return_line_temperature: i16,
    pub requested_temperature_difference: i16,
    pub relais_state: u16,
    pub accumulated_electrical_energy: i32,
    pub accumulated_thermal_energy: i32,
}

impl RegisterBlock for HeatPumpBlock {
    const GROUP: &'static str = "heat-pump";
    const LENGTH: u16 = 24;

    fn parse(registers: &RegisterArray) -> Result<Self, CodecError> {
        Ok(Self {
            error_state: registers.get_u16(0)?,
            error_number: registers.get_i16(1)?,
            state: registers.get_u16(2)?,
            operating_state: registers.get_u16(3)?,
            flow_line_temperature: registers.get_i16(4)?,
            return_line_temperature: registers.get_i16(5)?,
            volume_flow_heat_sink: registers.get_i16(6)?,
            energy_source_inlet_temperature: registers.get_i16(7)?,
            energy_source_outlet_temperature: registers.get_i16(8)?,
            volume_flow_energy_source: registers.get_i16(9)?,
            compressor_rating: registers.get_u16(10)?,
            actual_heating_capacity: registers.get_i16(11)?,
            inverter_power_consumption: registers.get_i16(12)?,
            cop: registers.get_i16(13)?,
            // 14 is reserved
            request_type: registers.get_i16(REQUEST_TYPE_OFFSET as usize)?,
            requested_flow_line_temperature: registers
                .get_i16(REQUESTED_FLOW_LINE_OFFSET as usize)?,
            requested_return_line_temperature: registers
                .get_i16(REQUESTED_RETURN_LINE_OFFSET as usize)?,
            requested_temperature_difference: registers
                .get_i16(REQUESTED_DIFFERENCE_OFFSET as usize)?,
            relais_state: registers.get_u16(19)?,
            accumulated_electrical_energy: registers.get_i32(20)?,
            accumulated_thermal_energy: registers.get_i32(22)?,
        })
    }

    fn channel_updates(&self) -> Vec<ChannelState> {
        vec![
            ("error-state", number(self.error_state)),
            (ERROR_NUMBER, number(self.error_number)),
            ("state", number(self.state)),
            (OPERATING_STATE, number(self.operating_state)),
            (
                "flow-line-temperature",
                scaled(self.flow_line_temperature, -2, Unit::Celsius),
            ),
            (
                "return-line-temperature",
                scaled(self.return_line_temperature, -2, Unit::Celsius),
            ),
            (
                "volume-flow-heat-sink",
                scaled(self.volume_flow_heat_sink, -2, Unit::LitrePerMinute),
            ),
            (
                "energy-source-inlet-temperature",
                scaled(self.energy_source_inlet_temperature, -2, Unit::Celsius),
            ),
            (
                "energy-source-outlet-temperature",
                scaled(self.energy_source_outlet_temperature, -2, Unit::Celsius),
            ),
            (
                "volume-flow-energy-source",
                scaled(self.volume_flow_energy_source, -2, Unit::LitrePerMinute),
            ),
            (
                "compressor-rating",
                State::quantity(scale(self.compressor_rating.into(), -2), Unit::Percent),
            ),
            (
                "actual-heating-capacity",
                scaled(self.actual_heating_capacity, -1, Unit::Kilowatt),
            ),
            (
                "inverter-power-consumption",
                watt(self.inverter_power_consumption),
            ),
            ("cop", number(scale(self.cop.into(), -2))),
            (REQUEST_TYPE, number(self.request_type)),
            (
                REQUESTED_FLOW_LINE_TEMPERATURE,
                celsius(self.requested_flow_line_temperature),
            ),
            (
                REQUESTED_RETURN_LINE_TEMPERATURE,
                celsius(self.requested_return_line_temperature),
            ),
            (
                REQUESTED_TEMPERATURE_DIFFERENCE,
                scaled(self.requested_temperature_difference, -1, Unit::Kelvin),
            ),
            ("relais-state", number(self.relais_state)),
            (
                "accumulated-electrical-energy",
                kilowatt_hours(self.accumulated_electrical_energy),
            ),
            (
                "accumulated-thermal-energy",
                kilowatt_hours(self.accumulated_thermal_energy),
            ),
        ]
    }
}
