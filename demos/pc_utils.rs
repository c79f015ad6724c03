//! Host-side glue for running the driver against a USB serial adapter.
//!
//! We're cheating here and use the host OS's serial port as our UART: the
//! write half is adapted to the embedded-hal interface, and a reader thread
//! pumping bytes into the queue's producer stands in for the receive
//! interrupt.

use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial::Write;
use grow_r503::Producer;
use serialport::prelude::*;
use std::io::Read;
use std::{thread, time::Duration};

pub struct SerialWriter(pub Box<dyn SerialPort>);

impl Write<u8> for SerialWriter {
    type Error = std::io::Error;

    fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
        let buf: [u8; 1] = [word];
        loop {
            match self.0.write(&buf) {
                Ok(n) => {
                    if n == 1 {
                        return Ok(());
                    }
                }
                Err(e) => {
                    return Err(nb::Error::from(e));
                }
            }
        }
    }

    fn flush(&mut self) -> nb::Result<(), Self::Error> {
        match self.0.flush() {
            Ok(_) => Ok(()),
            Err(e) => Err(nb::Error::from(e)),
        }
    }
}

pub struct StdDelay;

impl DelayMs<u16> for StdDelay {
    fn delay_ms(&mut self, ms: u16) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// Pumps bytes from the serial port into the receive queue, as the UART
/// receive interrupt would on a real target.
pub fn spawn_reader(mut port: Box<dyn SerialPort>, mut producer: Producer<'static>) {
    thread::spawn(move || {
        let mut buf = [0u8; 32];
        loop {
            match port.read(&mut buf) {
                Ok(n) => {
                    for byte in &buf[..n] {
                        producer.push(*byte);
                    }
                }
                // Read timeouts just mean the line is idle.
                Err(_) => {}
            }
        }
    });
}
