//! **grow-r503** is an embedded-hal driver for the GROW R503 (and similar
//! ZhianTec ZFM / Adafruit FPM10A) optical fingerprint modules.
//!
//! The driver speaks the module's half-duplex packet protocol over a raw
//! UART: it frames and checksums outbound commands, reassembles inbound
//! frames through a byte-at-a-time state machine, and exposes one method per
//! sensor operation (capture, feature extraction, enrollment, search,
//! template management, LED control).
//!
//! Reception is interrupt-driven: create an [`RxQueue`], [`split`] it, push
//! every received byte into the [`Producer`] from your UART receive
//! interrupt handler, and hand the [`Consumer`] to the driver. The driver
//! polls the queue with a millisecond backoff while waiting for a reply and
//! gives up with [`Error::Timeout`] when the budget runs out.
//!
//! [`split`]: RxQueue::split
//!
//! ## Example
//!
//! To authenticate with the sensor:
//! ```
//! # use embedded_hal::blocking::delay::DelayMs;
//! # use embedded_hal::serial::Write;
//! use grow_r503::{Fingerprint, RxQueue};
//! # struct TestTx;
//! #
//! # impl Write<u8> for TestTx {
//! #     type Error = ();
//! #     fn write(&mut self, _word: u8) -> nb::Result<(), Self::Error> {
//! #         return Ok(());
//! #     }
//! #     fn flush(&mut self) -> nb::Result<(), Self::Error> {
//! #         return Ok(());
//! #     }
//! # }
//! #
//! # struct TestDelay;
//! #
//! # impl DelayMs<u16> for TestDelay {
//! #     fn delay_ms(&mut self, _ms: u16) {}
//! # }
//! #
//! # const RES_DATA: &[u8] = &[ 0xef, 0x01, 0xff, 0xff, 0xff, 0xff, 0x07, 0x00, 0x03, 0x00, 0x00, 0x0a ];
//! # let tx = TestTx;
//! # let delay = TestDelay;
//!
//! let mut queue = RxQueue::new();
//! let (mut producer, consumer) = queue.split();
//! // Wire `producer` into the UART receive interrupt; obtain `tx` and
//! // `delay` from your HAL.
//! # for byte in RES_DATA {
//! #     producer.push(*byte);
//! # }
//! let mut sensor = Fingerprint::new(tx, consumer, delay, 0x00000000);
//! match sensor.verify_password() {
//!     Ok(true) => println!("Handshake ok"),
//!     Ok(false) => println!("Wrong password"),
//!     Err(error) => panic!("Error: {:#?}", error),
//! }
//! ```
//!
//! For host-side demos against a USB serial adapter, see the `demos`
//! directory.
#![warn(missing_debug_implementations, rust_2018_idioms)]
#![no_std]

mod commands;
mod driver;
mod packet;
mod responses;
mod ring;
mod utils;

pub use crate::commands::{AuraColor, AuraControl, Instruction};
pub use crate::driver::{Fingerprint, DEFAULT_TIMEOUT_MS};
pub use crate::packet::{Packet, PacketKind, PacketParser, PACKET_DATA_SIZE, START_CODE};
pub use crate::responses::{Status, SystemParameters};
pub use crate::ring::{Consumer, Producer, RxQueue, RX_CAPACITY};
pub use crate::utils::{Error, FromPayload};
