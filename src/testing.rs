//! In-memory doubles for host-side tests: a [`FakeBus`] serving seeded
//! register responses and logging every transaction, and a [`FakeDelay`]
//! that completes immediately.

use crate::bus::{Bus, MAX_REG_BYTES};
use crate::error::Ina219Error;
use crate::register::{Readable, Writable};
use embedded_hal_async::delay::DelayNs;
use heapless::{LinearMap, Vec};

#[derive(Debug)]
enum RegisterValue {
    Data { bytes: [u8; MAX_REG_BYTES] },
    DontCare,
}

/// A single transaction observed by [`FakeBus`], in issue order.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BusOp {
    Read(u8),
    Write(u8, [u8; MAX_REG_BYTES]),
}

/// Fake [`Bus`] keyed by register address.
///
/// Reads are served from responses seeded with [`FakeBus::with_response`]
/// and panic for unseeded registers; writes always succeed. Every
/// transaction lands in [`FakeBus::log`] so tests can assert payloads and
/// ordering (e.g. that the calibration register is re-asserted before a
/// current read).
pub struct FakeBus<const N: usize> {
    regs: LinearMap<u8, RegisterValue, N>,
    log: Vec<BusOp, 32>,
}

pub struct FakeDelay {}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, _: u32) {}
}

impl<const N: usize> FakeBus<N> {
    pub fn new() -> Self {
        FakeBus {
            regs: LinearMap::new(),
            log: Vec::new(),
        }
    }

    pub fn with_response<R: Readable>(&mut self, data: &[u8]) {
        let mut bytes = [0u8; MAX_REG_BYTES];
        bytes[..data.len()].copy_from_slice(data);
        self.regs.insert(R::ADDR, RegisterValue::Data { bytes }).unwrap();
    }

    pub fn with_any_response<R: Readable>(&mut self) {
        self.regs.insert(R::ADDR, RegisterValue::DontCare).unwrap();
    }

    /// Every transaction seen so far, oldest first.
    pub fn log(&self) -> &[BusOp] {
        &self.log
    }

    /// The write transactions only, oldest first.
    pub fn writes(&self) -> impl Iterator<Item = (u8, [u8; MAX_REG_BYTES])> + '_ {
        self.log.iter().filter_map(|op| match op {
            BusOp::Write(addr, bytes) => Some((*addr, *bytes)),
            BusOp::Read(_) => None,
        })
    }
}

impl<const N: usize> Bus for FakeBus<N> {
    type Error = ();

    async fn read<R: Readable>(&mut self) -> Result<R::Out, Ina219Error<Self::Error>> {
        self.log.push(BusOp::Read(R::ADDR)).unwrap();

        match self.regs.get(&R::ADDR) {
            Some(RegisterValue::Data { bytes }) => Ok(R::decode(&bytes[..R::N]).unwrap()),
            Some(RegisterValue::DontCare) => {
                let scratch = [0u8; MAX_REG_BYTES];
                Ok(R::decode(&scratch[..R::N]).unwrap())
            }
            None => panic!("No mocked value for register 0x{:x}", R::ADDR),
        }
    }

    async fn write<W: Writable>(&mut self, v: &W::In) -> Result<(), Ina219Error<Self::Error>> {
        let mut bytes = [0u8; MAX_REG_BYTES];
        W::encode(v, &mut bytes[..W::N]);
        self.log.push(BusOp::Write(W::ADDR, bytes)).unwrap();

        Ok(())
    }
}
