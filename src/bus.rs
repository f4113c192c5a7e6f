use crate::error::Ina219Error;
use crate::register::{Readable, Writable};
use core::future::Future;
use embedded_hal::i2c::SevenBitAddress;
use embedded_hal_async::delay::DelayNs;

/// Largest register transfer the INA219 performs. Every register is 16 bits.
pub const MAX_REG_BYTES: usize = 2;

/// Typed register access over the two-wire bus.
///
/// Implementations move `R::N` / `W::N` bytes to or from the address given
/// by the marker type and run its codec. [`crate::testing::FakeBus`]
/// implements this for host-side tests.
pub trait Bus {
    type Error;

    fn read<R: Readable>(&mut self)
        -> impl Future<Output = Result<R::Out, Ina219Error<Self::Error>>>;

    fn write<W: Writable>(&mut self, v: &W::In)
        -> impl Future<Output = Result<(), Ina219Error<Self::Error>>>;
}

/// [`Bus`] implementation for an `embedded-hal-async` I2C handle.
///
/// Owns the delay used to respect the chip's conversion latency: a register
/// read is an address write, a settling pause, then a 2-byte read.
pub struct I2c<I2cType, D> {
    i2c: I2cType,
    address: SevenBitAddress,
    delay: D,
}

impl<I2cType, D> I2c<I2cType, D>
where
    I2cType: embedded_hal_async::i2c::I2c,
    D: DelayNs,
{
    pub(crate) fn new(i2c: I2cType, address: SevenBitAddress, delay: D) -> Self {
        Self { i2c, address, delay }
    }
}

impl<I2cType, D> Bus for I2c<I2cType, D>
where
    I2cType: embedded_hal_async::i2c::I2c,
    D: DelayNs,
{
    type Error = <I2cType as embedded_hal_async::i2c::ErrorType>::Error;

    async fn read<R: Readable>(&mut self) -> Result<R::Out, Ina219Error<Self::Error>> {
        let mut buf = [0u8; MAX_REG_BYTES];

        self.i2c
            .write(self.address, &[R::ADDR])
            .await
            .map_err(Ina219Error::Bus)?;

        // Worst case 12-bit conversion is 586 µs per sample
        self.delay.delay_ms(1).await;

        self.i2c
            .read(self.address, &mut buf[..R::N])
            .await
            .map_err(Ina219Error::Bus)?;

        R::decode(&buf[..R::N]).map_err(Ina219Error::UnexpectedRegisterData)
    }

    async fn write<W: Writable>(&mut self, v: &W::In) -> Result<(), Ina219Error<Self::Error>> {
        let mut frame = [0u8; MAX_REG_BYTES + 1];
        frame[0] = W::ADDR;
        W::encode(v, &mut frame[1..]);

        self.i2c
            .write(self.address, &frame[..W::N + 1])
            .await
            .map_err(Ina219Error::Bus)?;

        Ok(())
    }
}
