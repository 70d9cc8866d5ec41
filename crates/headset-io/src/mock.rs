//! In-memory pins for tests.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{Error, ErrorKind, ErrorType, InputPin, OutputPin};

#[derive(Debug)]
pub struct PinFault;

impl Error for PinFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// Input pin whose level is set from the test through a shared handle.
#[derive(Debug, Clone, Default)]
pub struct MockInput {
    high: Arc<AtomicBool>,
}

impl MockInput {
    pub fn set_high(&self, high: bool) {
        self.high.store(high, Ordering::SeqCst);
    }
}

impl ErrorType for MockInput {
    type Error = Infallible;
}

impl InputPin for MockInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.high.load(Ordering::SeqCst))
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.high.load(Ordering::SeqCst))
    }
}

/// Input pin that always fails and counts how often it was read.
#[derive(Debug, Clone, Default)]
pub struct FaultyInput {
    pub reads: Arc<AtomicUsize>,
}

impl ErrorType for FaultyInput {
    type Error = PinFault;
}

impl InputPin for FaultyInput {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        Err(PinFault)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.is_high()
    }
}

/// Output pin that records every level written.
#[derive(Debug, Clone, Default)]
pub struct RecordingOutput {
    pub writes: Arc<Mutex<Vec<bool>>>,
    pub fail: bool,
}

impl RecordingOutput {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn levels(&self) -> Vec<bool> {
        self.writes.lock().unwrap().clone()
    }

    fn write(&mut self, level: bool) -> Result<(), PinFault> {
        self.writes.lock().unwrap().push(level);
        if self.fail {
            Err(PinFault)
        } else {
            Ok(())
        }
    }
}

impl ErrorType for RecordingOutput {
    type Error = PinFault;
}

impl OutputPin for RecordingOutput {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(false)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(true)
    }
}
