/// Communication-level failures, distinct from the status codes the sensor
/// itself reports in an ack payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No byte arrived within the receive budget.
    Timeout,
    /// Start code mismatch, or a length field larger than any valid frame.
    BadPacket,
    /// The reply was not an acknowledgment packet, or carried no
    /// confirmation byte.
    UnexpectedReply,
}

/// Field extraction from an ack payload.
pub trait FromPayload {
    fn from_payload(payload: &[u8]) -> Self;
}
