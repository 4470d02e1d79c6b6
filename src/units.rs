//! Physical quantities exchanged with the host framework.
//!
//! Channel states and inbound commands carry a value together with a [`Unit`];
//! conversions are only defined between units of the same [`Dimension`].

use std::fmt::Display;

use strum_macros::{Display as StrumDisplay, EnumIter, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Temperature,
    Power,
    Energy,
    VolumeFlow,
    Ratio,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, StrumDisplay, EnumString, EnumIter)]
pub enum Unit {
    #[strum(serialize = "°C")]
    Celsius,
    #[strum(serialize = "K")]
    Kelvin,
    #[strum(serialize = "°F")]
    Fahrenheit,
    #[strum(serialize = "W")]
    Watt,
    #[strum(serialize = "kW")]
    Kilowatt,
    #[strum(serialize = "Wh")]
    WattHour,
    #[strum(serialize = "kWh")]
    KilowattHour,
    #[strum(serialize = "l/min")]
    LitrePerMinute,
    #[strum(serialize = "%")]
    Percent,
    #[strum(serialize = "h")]
    Hour,
}

impl Unit {
    pub fn dimension(self) -> Dimension {
        use Unit::*;
        match self {
            Celsius | Kelvin | Fahrenheit => Dimension::Temperature,
            Watt | Kilowatt => Dimension::Power,
            WattHour | KilowattHour => Dimension::Energy,
            LitrePerMinute => Dimension::VolumeFlow,
            Percent => Dimension::Ratio,
            Hour => Dimension::Time,
        }
    }

    // Linear mapping onto the dimension's base unit: base = value * factor + offset.
    fn to_base(self) -> (f64, f64) {
        use Unit::*;
        match self {
            Celsius => (1.0, 273.15),
            Kelvin => (1.0, 0.0),
            Fahrenheit => (5.0 / 9.0, 273.15 - 32.0 * 5.0 / 9.0),
            Watt | WattHour => (1.0, 0.0),
            Kilowatt | KilowattHour => (1000.0, 0.0),
            LitrePerMinute | Percent | Hour => (1.0, 0.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantityType {
    value: f64,
    unit: Unit,
}

impl QuantityType {
    pub fn new(value: f64, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn unit(&self) -> Unit {
        self.unit
    }

    /// Converts into `target`, or `None` when the dimensions differ.
    pub fn to_unit(&self, target: Unit) -> Option<QuantityType> {
        if self.unit == target {
            return Some(*self);
        }
        if self.unit.dimension() != target.dimension() {
            return None;
        }
        let (f_src, o_src) = self.unit.to_base();
        let (f_dst, o_dst) = target.to_base();
        let base = self.value * f_src + o_src;
        Some(QuantityType::new((base - o_dst) / f_dst, target))
    }
}

impl Display for QuantityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.value, self.unit)
    }
}

/// Value published on a channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum State {
    Quantity(QuantityType),
    Decimal(f64),
    Undef,
}

impl State {
    pub fn quantity(value: f64, unit: Unit) -> Self {
        State::Quantity(QuantityType::new(value, unit))
    }

    pub fn as_quantity(&self) -> Option<QuantityType> {
        match self {
            State::Quantity(q) => Some(*q),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            State::Decimal(v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Quantity(q) => write!(f, "{}", q),
            State::Decimal(v) => write!(f, "{}", v),
            State::Undef => write!(f, "UNDEF"),
        }
    }
}

/// Inbound command for a channel.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh,
    Quantity(QuantityType),
    Decimal(f64),
    OnOff(bool),
    Text(String),
}

impl Command {
    pub fn type_name(&self) -> &'static str {
        match self {
            Command::Refresh => "RefreshType",
            Command::Quantity(_) => "QuantityType",
            Command::Decimal(_) => "DecimalType",
            Command::OnOff(_) => "OnOffType",
            Command::Text(_) => "StringType",
        }
    }
}
