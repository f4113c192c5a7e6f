use crate::register::{InvalidRegisterField, Readable, Reg};

/// Marker struct for the POWER (0x03) register
///
/// - **Length:** 2 bytes
/// - **Access:** Read-only
///
/// Signed count scaled by the active calibration's power LSB.
pub struct Power;
impl Reg for Power { const ADDR: u8 = 0x03; }

impl Readable for Power {
    type Out = i16;
    fn decode(b: &[u8]) -> Result<Self::Out, InvalidRegisterField> {
        Ok(i16::from_be_bytes([b[0], b[1]]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_decode() {
        assert_eq!(0x7FFF, Power::decode(&[0x7F, 0xFF]).unwrap());
        assert_eq!(-1, Power::decode(&[0xFF, 0xFF]).unwrap());
    }
}
