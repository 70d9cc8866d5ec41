//! # headset-at
//!
//! The AT command channel of the Hands-Free Profile.
//!
//! Inbound bytes from the RFCOMM link are split into lines and parsed into
//! [`AtMessage`]s; outbound [`OutgoingCommand`]s are serialized with a
//! `\r\n` terminator and written in the order they are requested.
//!
//! Parsing never fails. Lines that match no known pattern, including unknown
//! vendor extensions, come back as [`AtMessageKind::Unknown`].
//!
//! ## Example
//!
//! ```ignore
//! use headset_at::{split, AtSender};
//! use headset_core::OutgoingCommand;
//!
//! async fn example(stream: bluer::rfcomm::Stream) {
//!     let (mut reader, mut writer) = split(stream, std::time::Duration::from_secs(2));
//!     writer.send(&OutgoingCommand::ListCalls).await.ok();
//!     while let Some(Ok(message)) = reader.next_message().await {
//!         println!("{:?}", message.kind);
//!     }
//! }
//! ```

pub mod channel;
pub mod framer;
pub mod parser;
pub mod traits;

pub use channel::{split, AtReader, AtWriter, DEFAULT_SEND_TIMEOUT};
pub use framer::{AtFramer, Frame, MAX_LINE_LEN};
pub use parser::parse_line;
pub use traits::AtSender;

pub use headset_core::{AtMessage, AtMessageKind, OutgoingCommand};
