use byteorder::{BigEndian, ByteOrder};

use crate::utils::FromPayload;

/// Status codes reported by the sensor in the first byte of an ack payload.
///
/// Which codes a given command can actually produce is listed on each
/// command method; everything else decodes to [`Unknown`](Status::Unknown)
/// rather than being rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Command executed.
    Ok,
    /// The sensor could not make sense of the packet it received.
    PacketReceiveError,
    /// No finger on the sensor surface.
    NoFinger,
    /// Failed to capture an image.
    ImageFail,
    /// Image too messy to extract features from.
    ImageMess,
    /// Could not identify fingerprint features.
    FeatureFail,
    /// The two character buffers do not match.
    NoMatch,
    /// No matching template in the searched range.
    NotFound,
    /// The two enrollment captures belong to different fingers.
    EnrollMismatch,
    /// Library location out of range.
    BadLocation,
    /// Error reading a template from the library.
    DbRangeFail,
    /// Error uploading a character buffer.
    UploadFeatureFail,
    /// The sensor cannot receive further data packets.
    PacketResponseFail,
    /// Error uploading an image.
    UploadFail,
    /// Failed to delete the template.
    DeleteFail,
    /// Failed to clear the template library.
    DbClearFail,
    /// Wrong device password.
    WrongPassword,
    /// The image buffer holds no valid primary image.
    InvalidImage,
    /// Error writing to flash.
    FlashError,
    /// Invalid register number.
    InvalidRegister,
    /// Address code.
    AddressCode,
    /// Password handshake succeeded.
    PasswordVerified,
    /// Any code outside the documented set.
    Unknown(u8),
}

impl From<u8> for Status {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Self::Ok,
            0x01 => Self::PacketReceiveError,
            0x02 => Self::NoFinger,
            0x03 => Self::ImageFail,
            0x06 => Self::ImageMess,
            0x07 => Self::FeatureFail,
            0x08 => Self::NoMatch,
            0x09 => Self::NotFound,
            0x0A => Self::EnrollMismatch,
            0x0B => Self::BadLocation,
            0x0C => Self::DbRangeFail,
            0x0D => Self::UploadFeatureFail,
            0x0E => Self::PacketResponseFail,
            0x0F => Self::UploadFail,
            0x10 => Self::DeleteFail,
            0x11 => Self::DbClearFail,
            0x13 => Self::WrongPassword,
            0x15 => Self::InvalidImage,
            0x18 => Self::FlashError,
            0x1A => Self::InvalidRegister,
            0x20 => Self::AddressCode,
            0x21 => Self::PasswordVerified,
            other => Self::Unknown(other),
        }
    }
}

/// System status and configuration, populated by `get_parameters`.
///
/// Fields hold the power-on assumptions until the query succeeds; callers
/// must not assume freshness without re-querying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemParameters {
    /// Status information. Use the instance methods to get to individual
    /// bits.
    pub status_register: u16,

    /// System identifier code - the datasheet says this has a constant
    /// value of 0x0009.
    pub system_id: u16,

    /// Template library capacity.
    pub capacity: u16,

    /// Security level [1-5].
    pub security_level: u16,

    /// Device address, broadcast (0xFFFFFFFF) by default.
    pub device_address: u32,

    /// Maximum data packet length in bytes, decoded from the size code
    /// (0 = 32, 1 = 64, 2 = 128, 3 = 256).
    pub packet_length: u16,

    /// UART baud rate in baud, decoded as code x 9600.
    pub baud_rate: u32,
}

impl SystemParameters {
    /// True if the sensor is busy executing another command.
    ///
    /// *Busy* in the datasheet.
    pub fn busy(&self) -> bool {
        self.status_register & (1u16 << 0) != 0
    }

    /// True if the module found a matching finger - however you should
    /// always check the response to the actual matching request.
    ///
    /// *Pass* in the datasheet.
    pub fn has_finger_match(&self) -> bool {
        self.status_register & (1u16 << 1) != 0
    }

    /// True if the password given in the handshake is correct.
    ///
    /// *PWD* in the datasheet.
    pub fn password_ok(&self) -> bool {
        self.status_register & (1u16 << 2) != 0
    }

    /// True if the image buffer contains a valid image.
    ///
    /// *ImgBufStat* in the datasheet.
    pub fn has_valid_image(&self) -> bool {
        self.status_register & (1u16 << 3) != 0
    }
}

impl Default for SystemParameters {
    fn default() -> Self {
        Self {
            status_register: 0,
            system_id: 0,
            capacity: 64,
            security_level: 0,
            device_address: 0xFFFFFFFF,
            packet_length: 64,
            baud_rate: 57600,
        }
    }
}

impl FromPayload for SystemParameters {
    /// Decodes the 16 parameter bytes that follow the confirmation code in
    /// a `ReadSysPara` ack.
    fn from_payload(payload: &[u8]) -> Self {
        let packet_code = BigEndian::read_u16(&payload[12..14]);
        Self {
            status_register: BigEndian::read_u16(&payload[0..2]),
            system_id: BigEndian::read_u16(&payload[2..4]),
            capacity: BigEndian::read_u16(&payload[4..6]),
            security_level: BigEndian::read_u16(&payload[6..8]),
            device_address: BigEndian::read_u32(&payload[8..12]),
            packet_length: match packet_code {
                0 => 32,
                1 => 64,
                2 => 128,
                3 => 256,
                other => other,
            },
            baud_rate: BigEndian::read_u16(&payload[14..16]) as u32 * 9600,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_documented_codes() {
        assert_eq!(Status::from(0x00), Status::Ok);
        assert_eq!(Status::from(0x02), Status::NoFinger);
        assert_eq!(Status::from(0x09), Status::NotFound);
        assert_eq!(Status::from(0x18), Status::FlashError);
    }

    #[test]
    fn unknown_codes_do_not_panic() {
        assert_eq!(Status::from(0x5A), Status::Unknown(0x5A));
    }

    #[test]
    fn decodes_system_parameters() {
        let payload = [
            0x00, 0x04, // status register: password ok
            0x00, 0x09, // system id
            0x00, 0xC8, // capacity 200
            0x00, 0x03, // security level
            0xFF, 0xFF, 0xFF, 0xFF, // address
            0x00, 0x02, // packet code 2 -> 128 bytes
            0x00, 0x06, // baud code 6 -> 57600
        ];
        let params = SystemParameters::from_payload(&payload);
        assert!(params.password_ok());
        assert!(!params.busy());
        assert_eq!(params.capacity, 200);
        assert_eq!(params.packet_length, 128);
        assert_eq!(params.baud_rate, 57600);
        assert_eq!(params.device_address, 0xFFFFFFFF);
    }
}
