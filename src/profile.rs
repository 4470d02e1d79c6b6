//! Register layout of each Lambda sub-system.
//!
//! Module `n` of a kind lives at `base + 100 * (n - 1)`; settings blocks sit
//! 50 registers above their module.

use serde::{Deserialize, Serialize};
use strum_macros::{Display as StrumDisplay, EnumIter, EnumString};

use crate::blocks::{self, *};
use crate::error::{CommandError, Error, Result};
use crate::poller::BlockSpec;
use crate::writer::WriteKind;

const MODULE_STRIDE: u16 = 100;
const SETTINGS_OFFSET: u16 = 50;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, EnumIter, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum DeviceKind {
    General,
    HeatPump,
    Boiler,
    Buffer,
    Solar,
    HeatingCircuit,
}

impl DeviceKind {
    pub fn max_index(self) -> u16 {
        match self {
            DeviceKind::General => 1,
            DeviceKind::HeatPump => 3,
            DeviceKind::Boiler | DeviceKind::Buffer => 5,
            DeviceKind::Solar => 2,
            DeviceKind::HeatingCircuit => 12,
        }
    }

    fn base_address(self) -> u16 {
        match self {
            DeviceKind::General => 0,
            DeviceKind::HeatPump => 1000,
            DeviceKind::Boiler => 2000,
            DeviceKind::Buffer => 3000,
            DeviceKind::Solar => 4000,
            DeviceKind::HeatingCircuit => 5000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritableChannel {
    pub group: &'static str,
    pub channel: &'static str,
    pub address: u16,
    pub kind: WriteKind,
}

#[derive(Debug, Clone)]
pub struct DeviceProfile {
    kind: DeviceKind,
    index: u16,
    blocks: Vec<BlockSpec>,
    writable: Vec<WritableChannel>,
}

impl DeviceProfile {
    pub fn new(kind: DeviceKind, index: u16) -> Result<Self> {
        if index == 0 || index > kind.max_index() {
            return Err(Error::Configuration(format!(
                "{} index must be between 1 and {}, got {}",
                kind,
                kind.max_index(),
                index
            )));
        }
        let base = kind.base_address() + MODULE_STRIDE * (index - 1);
        let settings = base + SETTINGS_OFFSET;

        let (blocks, writable) = match kind {
            DeviceKind::General => (
                vec![
                    BlockSpec::of::<AmbientBlock>(base),
                    BlockSpec::of::<EManagerBlock>(base + 100),
                ],
                vec![
                    writable::<AmbientBlock>(
                        general::ACTUAL_AMBIENT_TEMPERATURE,
                        base + 2,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<EManagerBlock>(general::ACTUAL_POWER, base + 102, WriteKind::watt()),
                ],
            ),
            DeviceKind::HeatPump => (
                vec![BlockSpec::of::<HeatPumpBlock>(base)],
                vec![
                    writable::<HeatPumpBlock>(
                        heat_pump::REQUEST_TYPE,
                        base + heat_pump::REQUEST_TYPE_OFFSET,
                        WriteKind::Plain,
                    ),
                    writable::<HeatPumpBlock>(
                        heat_pump::REQUESTED_FLOW_LINE_TEMPERATURE,
                        base + heat_pump::REQUESTED_FLOW_LINE_OFFSET,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<HeatPumpBlock>(
                        heat_pump::REQUESTED_RETURN_LINE_TEMPERATURE,
                        base + heat_pump::REQUESTED_RETURN_LINE_OFFSET,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<HeatPumpBlock>(
                        heat_pump::REQUESTED_TEMPERATURE_DIFFERENCE,
                        base + heat_pump::REQUESTED_DIFFERENCE_OFFSET,
                        WriteKind::kelvin_tenths(),
                    ),
                ],
            ),
            DeviceKind::Boiler => (
                vec![
                    BlockSpec::of::<BoilerBlock>(base),
                    BlockSpec::of::<BoilerSettingsBlock>(settings),
                ],
                vec![writable::<BoilerSettingsBlock>(
                    boiler::MAXIMUM_BOILER_TEMPERATURE,
                    settings,
                    WriteKind::celsius_tenths(),
                )],
            ),
            DeviceKind::Buffer => (
                vec![
                    BlockSpec::of::<BufferBlock>(base),
                    BlockSpec::of::<BufferSettingsBlock>(settings),
                ],
                vec![writable::<BufferSettingsBlock>(
                    buffer::MAXIMUM_BUFFER_TEMPERATURE,
                    settings,
                    WriteKind::celsius_tenths(),
                )],
            ),
            DeviceKind::Solar => (
                vec![
                    BlockSpec::of::<SolarBlock>(base),
                    BlockSpec::of::<SolarSettingsBlock>(settings),
                ],
                vec![
                    writable::<SolarSettingsBlock>(
                        solar::MAXIMUM_BUFFER_TEMPERATURE,
                        settings,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<SolarSettingsBlock>(
                        solar::BUFFER_CHANGEOVER_TEMPERATURE,
                        settings + 1,
                        WriteKind::celsius_tenths(),
                    ),
                ],
            ),
            DeviceKind::HeatingCircuit => (
                vec![
                    BlockSpec::of::<HeatingCircuitBlock>(base),
                    BlockSpec::of::<HeatingCircuitSettingsBlock>(settings),
                ],
                vec![
                    writable::<HeatingCircuitBlock>(
                        heating_circuit::ROOM_DEVICE_TEMPERATURE,
                        base + 4,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<HeatingCircuitBlock>(
                        heating_circuit::SETPOINT_FLOW_LINE_TEMPERATURE,
                        base + 5,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<HeatingCircuitBlock>(
                        heating_circuit::OPERATING_MODE,
                        base + 6,
                        WriteKind::Plain,
                    ),
                    writable::<HeatingCircuitSettingsBlock>(
                        heating_circuit::OFFSET_FLOW_LINE_TEMPERATURE,
                        settings,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<HeatingCircuitSettingsBlock>(
                        heating_circuit::ROOM_HEATING_TEMPERATURE,
                        settings + 1,
                        WriteKind::celsius_tenths(),
                    ),
                    writable::<HeatingCircuitSettingsBlock>(
                        heating_circuit::ROOM_COOLING_TEMPERATURE,
                        settings + 2,
                        WriteKind::celsius_tenths(),
                    ),
                ],
            ),
        };

        Ok(Self {
            kind,
            index,
            blocks,
            writable,
        })
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn index(&self) -> u16 {
        self.index
    }

    pub fn blocks(&self) -> &[BlockSpec] {
        &self.blocks
    }

    /// Register and encoding behind `group#channel`.
    pub fn writable(&self, group: &str, channel: &str) -> Result<WritableChannel, CommandError> {
        if let Some(w) = self
            .writable
            .iter()
            .find(|w| w.group == group && w.channel == channel)
        {
            return Ok(*w);
        }
        let name = format!("{group}#{channel}");
        if self.blocks.iter().any(|b| b.group == group) {
            Err(CommandError::ReadOnlyChannel(name))
        } else {
            Err(CommandError::UnknownChannel(name))
        }
    }
}

fn writable<B: blocks::RegisterBlock>(
    channel: &'static str,
    address: u16,
    kind: WriteKind,
) -> WritableChannel {
    WritableChannel {
        group: B::GROUP,
        channel,
        address,
        kind,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn kinds_parse_from_kebab_case() {
        assert_eq!(DeviceKind::from_str("heating-circuit"), Ok(DeviceKind::HeatingCircuit));
        assert_eq!(DeviceKind::HeatPump.to_string(), "heat-pump");
    }

    #[test]
    fn every_kind_has_a_first_module() {
        for kind in DeviceKind::iter() {
            let profile = DeviceProfile::new(kind, 1).unwrap();
            assert!(!profile.blocks().is_empty(), "{kind} has no blocks");
            assert!(DeviceProfile::new(kind, 0).is_err());
            assert!(DeviceProfile::new(kind, kind.max_index() + 1).is_err());
        }
    }

    #[test]
    fn module_addresses_follow_index() {
        let profile = DeviceProfile::new(DeviceKind::HeatingCircuit, 3).unwrap();
        let addresses: Vec<_> = profile.blocks().iter().map(|b| (b.group, b.address, b.length)).collect();
        assert_eq!(
            addresses,
            vec![
                ("heating-circuit", 5200, 7),
                ("heating-circuit-settings", 5250, 3)
            ]
        );

        let profile = DeviceProfile::new(DeviceKind::HeatPump, 2).unwrap();
        let w = profile
            .writable("heat-pump", heat_pump::REQUESTED_FLOW_LINE_TEMPERATURE)
            .unwrap();
        assert_eq!(w.address, 1116);
        assert_eq!(w.kind, WriteKind::celsius_tenths());
    }

    #[test]
    fn non_writable_channels() {
        let profile = DeviceProfile::new(DeviceKind::Boiler, 1).unwrap();
        assert_eq!(
            profile.writable("boiler", "actual-high-temperature"),
            Err(CommandError::ReadOnlyChannel("boiler#actual-high-temperature".into()))
        );
        assert!(matches!(
            profile.writable("solar", "anything"),
            Err(CommandError::UnknownChannel(_))
        ));
        assert_eq!(
            profile
                .writable("boiler-settings", boiler::MAXIMUM_BOILER_TEMPERATURE)
                .unwrap()
                .address,
            2050
        );
    }
}
