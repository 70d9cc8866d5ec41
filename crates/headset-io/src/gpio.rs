//! Linux GPIO character device backend.

use std::fmt;

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};
use gpio_cdev::{Chip, LineHandle, LineRequestFlags};
use headset_core::HardwareIoError;
use tracing::debug;

const CONSUMER: &str = "hfp-headset";

/// Error from a line read or write.
#[derive(Debug)]
pub struct GpioError {
    pin: &'static str,
    reason: String,
}

impl fmt::Display for GpioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.pin, self.reason)
    }
}

impl Error for GpioError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// An opened `/dev/gpiochipN`.
pub struct GpioChip {
    chip: Chip,
}

impl GpioChip {
    pub fn open(path: &str) -> Result<Self, HardwareIoError> {
        let chip = Chip::new(path)
            .map_err(|e| HardwareIoError::ChipUnavailable(format!("{}: {}", path, e)))?;
        debug!(
            "Opened GPIO chip {} ({} lines)",
            chip.name(),
            chip.num_lines()
        );
        Ok(Self { chip })
    }

    /// Request `line` as an input named `pin`.
    pub fn input(&mut self, pin: &'static str, line: u32) -> Result<CdevInput, HardwareIoError> {
        let handle = self.request(pin, line, LineRequestFlags::INPUT, 0)?;
        Ok(CdevInput { pin, handle })
    }

    /// Request `line` as an output named `pin`, initially low.
    pub fn output(&mut self, pin: &'static str, line: u32) -> Result<CdevOutput, HardwareIoError> {
        let handle = self.request(pin, line, LineRequestFlags::OUTPUT, 0)?;
        Ok(CdevOutput { pin, handle })
    }

    fn request(
        &mut self,
        pin: &'static str,
        line: u32,
        flags: LineRequestFlags,
        default: u8,
    ) -> Result<LineHandle, HardwareIoError> {
        let gpio_err = |e: gpio_cdev::Error| HardwareIoError::Gpio {
            pin: format!("{} (line {})", pin, line),
            reason: e.to_string(),
        };
        self.chip
            .get_line(line)
            .map_err(gpio_err)?
            .request(flags, default, CONSUMER)
            .map_err(gpio_err)
    }
}

/// Input line.
pub struct CdevInput {
    pin: &'static str,
    handle: LineHandle,
}

impl CdevInput {
    fn read(&self) -> Result<bool, GpioError> {
        self.handle.get_value().map(|v| v != 0).map_err(|e| GpioError {
            pin: self.pin,
            reason: e.to_string(),
        })
    }
}

impl ErrorType for CdevInput {
    type Error = GpioError;
}

impl InputPin for CdevInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.read()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.read().map(|high| !high)
    }
}

/// Output line.
pub struct CdevOutput {
    pin: &'static str,
    handle: LineHandle,
}

impl CdevOutput {
    fn write(&self, value: u8) -> Result<(), GpioError> {
        self.handle.set_value(value).map_err(|e| GpioError {
            pin: self.pin,
            reason: e.to_string(),
        })
    }
}

impl ErrorType for CdevOutput {
    type Error = GpioError;
}

impl OutputPin for CdevOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(0)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(1)
    }
}
