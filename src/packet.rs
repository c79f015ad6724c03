//! Wire framing for the R503 serial protocol.
//!
//! Every exchange with the module uses the same frame layout, all
//! multi-byte integers big-endian:
//!
//! ```text
//! headr  | 0xEF 0x01 [2]
//! addr   | device address [4]
//! ident  | packet kind [1]
//! length | payload length + 2 [2]
//! data   | payload [length - 2]
//! chksum | checksum [2]
//! ```

use arrayvec::ArrayVec;
use byteorder::{BigEndian, ByteOrder};

use crate::utils::Error;

/// Fixed 16-bit marker at the start of every valid frame.
pub const START_CODE: u16 = 0xEF01;

/// Payload buffer capacity. The largest negotiated data packet is 256
/// bytes, and the wire length field also counts the two trailing checksum
/// bytes, so the buffer is sized above that.
pub const PACKET_DATA_SIZE: usize = 384;

/// Size of the serialized command buffer. Command payloads are all under a
/// dozen bytes.
pub(crate) const CMD_BUFFER_SIZE: usize = 128;

/// Frame type identifier, byte 7 of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    /// A command sent to the module.
    Command,
    /// A chunk of bulk data (template or image transfer).
    Data,
    /// The module's acknowledgment of a command.
    Ack,
    /// The final chunk of a bulk transfer.
    EndOfData,
    /// Any identifier outside the documented set. Preserved rather than
    /// rejected; the driver decides what to do with it.
    Other(u8),
}

impl PacketKind {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x01 => Self::Command,
            0x02 => Self::Data,
            0x07 => Self::Ack,
            0x08 => Self::EndOfData,
            other => Self::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Command => 0x01,
            Self::Data => 0x02,
            Self::Ack => 0x07,
            Self::EndOfData => 0x08,
            Self::Other(byte) => byte,
        }
    }
}

/// One protocol frame, in either direction.
///
/// A packet never outlives a single command call: requests are built on the
/// stack of the issuing method, and replies are assembled by
/// [`PacketParser`] and inspected immediately.
#[derive(Debug, PartialEq, Eq)]
pub struct Packet {
    pub start_code: u16,
    pub address: u32,
    pub kind: PacketKind,
    pub data: ArrayVec<[u8; PACKET_DATA_SIZE]>,
}

impl Packet {
    /// Builds a command packet for the given device address.
    pub fn command(address: u32, payload: &[u8]) -> Self {
        let mut data = ArrayVec::new();
        data.try_extend_from_slice(payload).unwrap();
        Self {
            start_code: START_CODE,
            address,
            kind: PacketKind::Command,
            data,
        }
    }

    /// Truncated 16-bit sum over the wire length bytes, the kind byte and
    /// the payload.
    pub fn checksum(&self) -> u16 {
        let wire_length = self.data.len() as u16 + 2;
        let mut sum = (wire_length >> 8)
            .wrapping_add(wire_length & 0xFF)
            .wrapping_add(self.kind.as_byte() as u16);
        for byte in &self.data {
            sum = sum.wrapping_add(*byte as u16);
        }
        sum
    }

    /// Serializes the full frame, checksum included, into `buffer`.
    pub(crate) fn serialize_into(&self, buffer: &mut ArrayVec<[u8; CMD_BUFFER_SIZE]>) {
        let wire_length = self.data.len() as u16 + 2;
        buffer.try_extend_from_slice(&self.start_code.to_be_bytes()).unwrap();
        buffer.try_extend_from_slice(&self.address.to_be_bytes()).unwrap();
        buffer.try_extend_from_slice(&[self.kind.as_byte()]).unwrap();
        buffer.try_extend_from_slice(&wire_length.to_be_bytes()).unwrap();
        buffer.try_extend_from_slice(&self.data).unwrap();
        buffer.try_extend_from_slice(&self.checksum().to_be_bytes()).unwrap();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseState {
    StartHigh,
    StartLow,
    Address(usize),
    Kind,
    LengthHigh,
    LengthLow,
    Payload,
}

/// Byte-at-a-time receive state machine.
///
/// Feed it bytes as they are drained from the receive queue; it discards
/// anything before a start-code high byte, which is what resynchronizes the
/// stream after a timed-out command left stray bytes behind.
#[derive(Debug)]
pub struct PacketParser {
    state: ParseState,
    start_code: u16,
    address: [u8; 4],
    kind: PacketKind,
    length: usize,
    data: ArrayVec<[u8; PACKET_DATA_SIZE]>,
}

impl PacketParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StartHigh,
            start_code: 0,
            address: [0; 4],
            kind: PacketKind::Other(0),
            length: 0,
            data: ArrayVec::new(),
        }
    }

    /// Advances the state machine by one byte.
    ///
    /// Returns `Ok(true)` once the frame is complete, `Ok(false)` while more
    /// bytes are needed, `Err(Error::BadPacket)` on a start-code mismatch or
    /// an implausible length field.
    pub fn feed(&mut self, byte: u8) -> Result<bool, Error> {
        match self.state {
            ParseState::StartHigh => {
                if byte == (START_CODE >> 8) as u8 {
                    self.start_code = (byte as u16) << 8;
                    self.state = ParseState::StartLow;
                }
            }
            ParseState::StartLow => {
                self.start_code |= byte as u16;
                if self.start_code != START_CODE {
                    return Err(Error::BadPacket);
                }
                self.state = ParseState::Address(0);
            }
            ParseState::Address(index) => {
                self.address[index] = byte;
                self.state = if index == 3 {
                    ParseState::Kind
                } else {
                    ParseState::Address(index + 1)
                };
            }
            ParseState::Kind => {
                self.kind = PacketKind::from_byte(byte);
                self.state = ParseState::LengthHigh;
            }
            ParseState::LengthHigh => {
                self.length = (byte as usize) << 8;
                self.state = ParseState::LengthLow;
            }
            ParseState::LengthLow => {
                self.length |= byte as usize;
                if self.length > PACKET_DATA_SIZE {
                    return Err(Error::BadPacket);
                }
                self.state = ParseState::Payload;
                if self.length == 0 {
                    return Ok(true);
                }
            }
            ParseState::Payload => {
                // The declared length counts the two trailing checksum
                // bytes, so they end up at the tail of `data` along with the
                // payload; the checksum is not verified on receive.
                self.data.push(byte);
                if self.data.len() == self.length {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }

    /// Consumes the parser, yielding the assembled packet.
    pub fn into_packet(self) -> Packet {
        Packet {
            start_code: self.start_code,
            address: BigEndian::read_u32(&self.address),
            kind: self.kind,
            data: self.data,
        }
    }
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new()
    }
}
