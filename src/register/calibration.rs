use crate::register::{InvalidRegisterField, Readable, Reg, Writable};

/// Marker struct for the CALIBRATION (0x05) register
///
/// - **Length:** 2 bytes
/// - **Access:** Read/Write
///
/// The full-scale multiplier the chip uses to derive CURRENT and POWER from
/// the shunt voltage. Computed by [`crate::calibration::Calibration`]; the
/// chip zeroes it on a brown-out, which is why the driver rewrites it before
/// every current read.
pub struct CalValue;
impl Reg for CalValue { const ADDR: u8 = 0x05; }

impl Readable for CalValue {
    type Out = u16;
    fn decode(b: &[u8]) -> Result<Self::Out, InvalidRegisterField> {
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }
}

impl Writable for CalValue {
    type In = u16;
    fn encode(v: &Self::In, out: &mut [u8]) {
        out[..2].copy_from_slice(&v.to_be_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cal_value_decode() {
        assert_eq!(4096, CalValue::decode(&[0x10, 0x00]).unwrap());
    }

    #[test]
    fn cal_value_encode() {
        let mut buffer = [0u8; 2];
        CalValue::encode(&4096, &mut buffer);
        assert_eq!([0x10, 0x00], buffer);

        CalValue::encode(&10240, &mut buffer);
        assert_eq!([0x28, 0x00], buffer);
    }
}
