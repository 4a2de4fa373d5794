pub mod adxl345;
pub mod error;

use breath_traits::{BoxError, Display, RawSample, SampleSource};
use std::io::Write;

use crate::error::HwError;

/// One g in full-resolution counts.
const ONE_G_COUNTS: i16 = 256;

/// Simulated accelerometer lying flat on a chest.
///
/// Emits rest gravity on Z and, once per breath period, a burst of readings
/// alternating just above and below the rest band. Time is derived from the
/// number of reads and the nominal sampling period, not from a clock, so a
/// given configuration always produces the same sequence.
pub struct SimulatedAccelerometer {
    period_ms: u64,
    breath_every_ms: u64,
    breath_len_ms: u64,
    amplitude: i16,
    apnea_after_ms: Option<u64>,
    device_id: u8,
    reads: u64,
}

impl SimulatedAccelerometer {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms: period_ms.max(1),
            breath_every_ms: 4_000,
            breath_len_ms: 600,
            amplitude: 16,
            apnea_after_ms: None,
            device_id: adxl345::DEVID_EXPECTED,
            reads: 0,
        }
    }

    /// Stop producing breath excursions after this much simulated time.
    pub fn with_apnea_after_ms(mut self, ms: u64) -> Self {
        self.apnea_after_ms = Some(ms);
        self
    }

    pub fn with_breathing(mut self, every_ms: u64, len_ms: u64) -> Self {
        self.breath_every_ms = every_ms.max(1);
        self.breath_len_ms = len_ms.min(self.breath_every_ms);
        self
    }

    /// Report a foreign identity register value, as a miswired board would.
    pub fn with_device_id(mut self, id: u8) -> Self {
        self.device_id = id;
        self
    }

    /// Simulated milliseconds since the first read.
    pub fn elapsed_ms(&self) -> u64 {
        self.reads.saturating_mul(self.period_ms)
    }

    fn breathing_at(&self, t_ms: u64) -> bool {
        if let Some(limit) = self.apnea_after_ms
            && t_ms >= limit
        {
            return false;
        }
        t_ms % self.breath_every_ms < self.breath_len_ms
    }
}

impl Default for SimulatedAccelerometer {
    fn default() -> Self {
        Self::new(10)
    }
}

impl SampleSource for SimulatedAccelerometer {
    fn read(&mut self) -> Result<RawSample, BoxError> {
        if self.device_id != adxl345::DEVID_EXPECTED {
            return Err(Box::new(HwError::DeviceId {
                expected: adxl345::DEVID_EXPECTED,
                found: self.device_id,
            }));
        }
        let t_ms = self.elapsed_ms();
        self.reads = self.reads.saturating_add(1);
        let z = if self.breathing_at(t_ms) {
            // Chest rise and fall alternate around gravity.
            if self.reads % 2 == 0 {
                ONE_G_COUNTS + self.amplitude
            } else {
                ONE_G_COUNTS - self.amplitude
            }
        } else {
            ONE_G_COUNTS
        };
        Ok(RawSample::new(0, 0, z))
    }
}

/// Text stand-in for the LCD: one line per render on the given writer.
pub struct ConsoleDisplay<W: Write + Send = std::io::Stdout> {
    out: W,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write + Send> ConsoleDisplay<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn frame(&mut self, text: &str) -> Result<(), BoxError> {
        writeln!(self.out, "{text}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> Display for ConsoleDisplay<W> {
    fn render_alert(&mut self) -> Result<(), BoxError> {
        tracing::debug!("render alert");
        self.frame("display: ALERT (red circle)")
    }

    fn render_normal(&mut self) -> Result<(), BoxError> {
        tracing::debug!("render normal");
        self.frame("display: normal (blue circle)")
    }

    fn clear(&mut self) -> Result<(), BoxError> {
        self.frame("display: cleared")
    }
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub mod hardware {
    //! Linux drivers: ADXL345 on an I2C adapter and a GPIO override button.

    use crate::adxl345::{Adxl345, RegisterBus};
    use crate::error::{HwError, Result};
    use rppal::gpio::{Gpio, Trigger};
    use rppal::i2c::I2c;

    pub use rppal::gpio::InputPin;

    pub struct I2cBus {
        i2c: I2c,
    }

    impl I2cBus {
        pub fn open(bus: u8, address: u16) -> Result<Self> {
            let mut i2c = I2c::with_bus(bus).map_err(|e| HwError::Bus(e.to_string()))?;
            i2c.set_slave_address(address)
                .map_err(|e| HwError::Bus(e.to_string()))?;
            Ok(Self { i2c })
        }
    }

    impl RegisterBus for I2cBus {
        fn write_register(&mut self, reg: u8, value: u8) -> Result<()> {
            self.i2c
                .write(&[reg, value])
                .map(|_| ())
                .map_err(|e| HwError::Bus(e.to_string()))
        }

        fn read_registers(&mut self, start: u8, buf: &mut [u8]) -> Result<()> {
            self.i2c
                .write_read(&[start], buf)
                .map_err(|e| HwError::Bus(e.to_string()))
        }
    }

    pub type HardwareAccelerometer = Adxl345<I2cBus>;

    /// Open the adapter and run the bring-up sequence.
    pub fn open_accelerometer(bus: u8, address: u16, z_offset: u8) -> Result<HardwareAccelerometer> {
        let i2c = I2cBus::open(bus, address)?;
        let dev = Adxl345::new(i2c, z_offset)?;
        tracing::info!(bus, address, "adxl345 opened");
        Ok(dev)
    }

    /// Register `on_press` for rising edges on `pin` (pull-down button).
    /// The returned pin must be kept alive for the interrupt to stay armed.
    pub fn make_override_button<F>(pin: u8, mut on_press: F) -> Result<InputPin>
    where
        F: FnMut() + Send + 'static,
    {
        let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
        let mut input = gpio
            .get(pin)
            .map_err(|e| HwError::Gpio(e.to_string()))?
            .into_input_pulldown();
        input
            .set_async_interrupt(Trigger::RisingEdge, move |_level| on_press())
            .map_err(|e| HwError::Gpio(e.to_string()))?;
        tracing::info!(pin, "override button armed");
        Ok(input)
    }
}
