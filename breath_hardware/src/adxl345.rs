//! ADXL345 register map and a bus-agnostic driver.
//!
//! The driver talks to the chip through [`RegisterBus`], so the bring-up
//! sequence and the identity check can be exercised without an I2C adapter.

use breath_traits::{BoxError, RawSample, SampleSource};
use tracing::{debug, trace};

use crate::error::{HwError, Result};

/// Default 7-bit I2C address with ALT ADDRESS tied low.
pub const DEFAULT_ADDRESS: u16 = 0x53;

pub const REG_DEVID: u8 = 0x00;
pub const REG_OFSZ: u8 = 0x20;
pub const REG_BW_RATE: u8 = 0x2C;
pub const REG_POWER_CTL: u8 = 0x2D;
pub const REG_DATA_FORMAT: u8 = 0x31;
/// First of six output registers (X0, X1, Y0, Y1, Z0, Z1).
pub const REG_DATAX0: u8 = 0x32;

pub const DEVID_EXPECTED: u8 = 0xE5;

/// Normal power, 200 Hz output data rate.
pub const BW_RATE_CONFIG: u8 = 0b0000_1011;
/// Measurement mode, no auto-sleep, no link.
pub const POWER_CTL_CONFIG: u8 = 0b0000_1000;
/// Full resolution, right-justified, active-high interrupts, 4-wire SPI.
pub const DATA_FORMAT_CONFIG: u8 = 0b0000_1001;
/// Z-axis trim written at bring-up.
pub const DEFAULT_Z_OFFSET: u8 = 0xF3;

/// Minimal register access the driver needs.
pub trait RegisterBus {
    fn write_register(&mut self, reg: u8, value: u8) -> Result<()>;
    fn read_registers(&mut self, start: u8, buf: &mut [u8]) -> Result<()>;
}

/// Decode the six little-endian output bytes into signed axis counts.
#[inline]
pub fn decode_axes(buf: &[u8; 6]) -> RawSample {
    RawSample {
        x: i16::from_le_bytes([buf[0], buf[1]]),
        y: i16::from_le_bytes([buf[2], buf[3]]),
        z: i16::from_le_bytes([buf[4], buf[5]]),
    }
}

pub struct Adxl345<B: RegisterBus> {
    bus: B,
}

impl<B: RegisterBus> Adxl345<B> {
    /// Apply rate, power, format and Z offset configuration.
    pub fn new(mut bus: B, z_offset: u8) -> Result<Self> {
        bus.write_register(REG_BW_RATE, BW_RATE_CONFIG)?;
        bus.write_register(REG_POWER_CTL, POWER_CTL_CONFIG)?;
        bus.write_register(REG_DATA_FORMAT, DATA_FORMAT_CONFIG)?;
        bus.write_register(REG_OFSZ, z_offset)?;
        debug!(z_offset, "adxl345 configured");
        Ok(Self { bus })
    }

    pub fn device_id(&mut self) -> Result<u8> {
        let mut id = [0u8; 1];
        self.bus.read_registers(REG_DEVID, &mut id)?;
        Ok(id[0])
    }

    /// Fails with `HwError::DeviceId` unless the identity register reads 0xE5.
    /// A loose wire usually shows up here first.
    pub fn check_identity(&mut self) -> Result<()> {
        let found = self.device_id()?;
        if found != DEVID_EXPECTED {
            return Err(HwError::DeviceId {
                expected: DEVID_EXPECTED,
                found,
            });
        }
        Ok(())
    }

    /// Identity check followed by a burst read of all three axes.
    pub fn read_sample(&mut self) -> Result<RawSample> {
        self.check_identity()?;
        let mut buf = [0u8; 6];
        self.bus.read_registers(REG_DATAX0, &mut buf)?;
        let sample = decode_axes(&buf);
        trace!(x = sample.x, y = sample.y, z = sample.z, "adxl345 raw read");
        Ok(sample)
    }

    pub fn into_bus(self) -> B {
        self.bus
    }
}

impl<B: RegisterBus> SampleSource for Adxl345<B> {
    fn read(&mut self) -> std::result::Result<RawSample, BoxError> {
        self.read_sample().map_err(|e| Box::new(e) as BoxError)
    }
}
