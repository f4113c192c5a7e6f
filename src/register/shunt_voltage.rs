use crate::register::{InvalidRegisterField, Readable, Reg};

/// Marker struct for the SHUNT_VOLTAGE (0x01) register
///
/// - **Length:** 2 bytes
/// - **Access:** Read-only
///
/// Signed, 10 µV per count. Used with [`crate::Ina219::read::<ShuntVoltage>()`]
/// or the convenience method [`crate::Ina219::shunt_voltage_raw`].
pub struct ShuntVoltage;
impl Reg for ShuntVoltage { const ADDR: u8 = 0x01; }

impl Readable for ShuntVoltage {
    type Out = i16;
    fn decode(b: &[u8]) -> Result<Self::Out, InvalidRegisterField> {
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shunt_voltage_decode() {
        assert_eq!(0x1234, ShuntVoltage::decode(&[0x12, 0x34]).unwrap());

        // Negative shunt drops decode sign-correct
        assert_eq!(-2, ShuntVoltage::decode(&[0xFF, 0xFE]).unwrap());
    }
}
