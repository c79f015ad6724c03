//# Naming conventions etc follow the R503 datasheet, see:
//# https://www.dropbox.com/sh/epucei8lmoz7xpp/AAAmon04b1DiSOeh1q4nAhzAa?dl=0&preview=R502+fingerprint+module+user+manual-V1.2.pdf

/// Instruction codes understood by the module. Names match the datasheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Instruction {
    /// Capture a finger image into the image buffer.
    GenImg = 0x01,
    /// Convert the image buffer into a character file in buffer 1 or 2.
    Img2Tz = 0x02,
    /// Search the library for the character file in a buffer.
    Search = 0x04,
    /// Combine the two character buffers into a template.
    RegModel = 0x05,
    /// Store the template at a library location.
    Store = 0x06,
    /// Load a stored template into a character buffer.
    LoadChar = 0x07,
    /// Upload a character buffer over the UART.
    UpChar = 0x08,
    /// Delete stored templates.
    DeletChar = 0x0C,
    /// Erase the whole template library.
    Empty = 0x0D,
    /// Read system status and configuration.
    ReadSysPara = 0x0F,
    /// Change the device password.
    SetPwd = 0x12,
    /// Handshake with the device password.
    VfyPwd = 0x13,
    /// High-speed library search.
    HiSpeedSearch = 0x1B,
    /// Read the number of stored templates.
    TempleteNum = 0x1D,
    /// Configure the aura LED ring.
    AuraLedConfig = 0x35,
    LedOn = 0x50,
    LedOff = 0x51,
}

/// Aura LED behaviour for [`AuraLedConfig`](Instruction::AuraLedConfig).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuraControl {
    Breathing = 0x01,
    Flashing = 0x02,
    On = 0x03,
    Off = 0x04,
    GraduallyOn = 0x05,
    GraduallyOff = 0x06,
}

/// Aura LED colour index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AuraColor {
    Red = 0x01,
    Blue = 0x02,
    Purple = 0x03,
}
