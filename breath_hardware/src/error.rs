use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("i2c bus error: {0}")]
    Bus(String),
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("device id mismatch: expected {expected:#04x}, found {found:#04x}")]
    DeviceId { expected: u8, found: u8 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
