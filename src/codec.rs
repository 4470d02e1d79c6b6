use crate::error::CodecError;

/// Raw register snapshot as returned by a read request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterArray {
    registers: Vec<u16>,
}

impl RegisterArray {
    pub fn new(registers: Vec<u16>) -> Self {
        Self { registers }
    }

    /// Builds registers from a big-endian byte payload.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        if bytes.len() % 2 != 0 {
            return Err(CodecError::OddPayload(bytes.len()));
        }
        let registers = bytes
            .chunks(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self { registers })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.registers.iter().flat_map(|r| r.to_be_bytes()).collect()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn registers(&self) -> &[u16] {
        &self.registers
    }

    pub fn get_u16(&self, index: usize) -> Result<u16, CodecError> {
        self.registers
            .get(index)
            .copied()
            .ok_or(CodecError::OutOfBounds {
                index,
                len: self.registers.len(),
            })
    }

    pub fn get_i16(&self, index: usize) -> Result<i16, CodecError> {
        self.get_u16(index).map(|v| v as i16)
    }

    /// Two registers, high word first.
    pub fn get_u32(&self, index: usize) -> Result<u32, CodecError> {
        let high = self.get_u16(index)?;
        let low = self.get_u16(index + 1)?;
        Ok(u32::from(high) << 16 | u32::from(low))
    }

    pub fn get_i32(&self, index: usize) -> Result<i32, CodecError> {
        self.get_u32(index).map(|v| v as i32)
    }
}

impl From<Vec<u16>> for RegisterArray {
    fn from(registers: Vec<u16>) -> Self {
        Self::new(registers)
    }
}

/// Applies the wire's fixed-point convention: `raw * 10^exponent`.
pub fn scale(raw: i64, exponent: i32) -> f64 {
    if exponent < 0 {
        raw as f64 / 10f64.powi(-exponent)
    } else {
        raw as f64 * 10f64.powi(exponent)
    }
}

/// Inverse of [`scale`]: turns a physical value back into a raw integer,
/// truncating the fractional part. `None` if the result leaves the i16 range.
pub fn unscale_i16(value: f64, exponent: i32) -> Option<i16> {
    let raw = if exponent < 0 {
        value * 10f64.powi(-exponent)
    } else {
        value / 10f64.powi(exponent)
    };
    // unit conversions leave values like 1.9999999999998863 for an exact 2
    let raw = ((raw * 1e6).round() / 1e6).trunc();
    if !raw.is_finite() || raw < f64::from(i16::MIN) || raw > f64::from(i16::MAX) {
        return None;
    }
    Some(raw as i16)
}

/// Big-endian payload of a single holding register.
pub fn encode_i16(value: i16) -> [u8; 2] {
    let hi = (value >> 8) as u8;
    let lo = value as u8;
    [hi, lo]
}
