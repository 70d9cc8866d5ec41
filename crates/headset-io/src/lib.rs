//! # headset-io
//!
//! Physical inputs and outputs of the headset.
//!
//! - [`Debouncer`] turns raw button levels into presses and long presses
//! - [`ButtonPoller`] samples the button pins and feeds a [`ButtonEvents`] receiver
//! - [`LedDriver`] renders the published [`LedFrame`] onto the two LEDs
//!
//! Pins are `embedded-hal` digital pins. On Linux, [`gpio::GpioChip`] hands
//! out pins backed by the GPIO character device.
//!
//! [`LedFrame`]: headset_core::LedFrame

pub mod debounce;
#[cfg(target_os = "linux")]
pub mod gpio;
pub mod led;
pub mod poller;

#[cfg(test)]
pub(crate) mod mock;

pub use debounce::{DebounceConfig, Debouncer};
pub use led::{LedDriver, LedRenderer};
pub use poller::{ButtonEvents, ButtonPoller};
