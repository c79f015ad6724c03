use arrayvec::ArrayVec;
use byteorder::{BigEndian, ByteOrder};
use embedded_hal::blocking::delay::DelayMs;
use embedded_hal::serial::Write;
use nb::block;

use crate::commands::{AuraColor, AuraControl, Instruction};
use crate::packet::{Packet, PacketKind, PacketParser, CMD_BUFFER_SIZE};
use crate::responses::{Status, SystemParameters};
use crate::ring::Consumer;
use crate::utils::{Error, FromPayload};

/// Receive budget for one reply frame, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u16 = 1000;

/// Granularity of the receive poll loop.
const POLL_INTERVAL_MS: u16 = 1;

/// Sentinel written into the search outputs before each search attempt.
const NO_MATCH: u16 = 0xFFFF;

/// Represents an R503 device on a U(S)ART.
///
/// The driver owns the transmit half of the serial line and the consumer
/// half of the interrupt-fed [`RxQueue`](crate::RxQueue); the application
/// wires the producer half into its receive interrupt handler. `DELAY`
/// provides the millisecond sleep used while waiting for reply bytes.
///
/// The session is strictly request-then-response: each command method sends
/// one frame, blocks for one ack and returns the sensor's [`Status`], with
/// communication failures surfaced separately as [`Error`].
#[derive(Debug)]
pub struct Fingerprint<'a, TX, DELAY> {
    tx: TX,
    rx: Consumer<'a>,
    delay: DELAY,
    password: u32,
    address: u32,
    timeout_ms: u16,
    cmd_buffer: ArrayVec<[u8; CMD_BUFFER_SIZE]>,
    params: SystemParameters,
    matched_id: u16,
    match_confidence: u16,
    template_count: u16,
}

impl<'a, TX, DELAY> Fingerprint<'a, TX, DELAY>
where
    TX: Write<u8>,
    DELAY: DelayMs<u16>,
{
    /// Creates a driver for the sensor at the broadcast address.
    ///
    /// `password` is the device password used by [`check_password`]; the
    /// factory default is 0x00000000.
    ///
    /// [`check_password`]: Fingerprint::check_password
    pub fn new(tx: TX, rx: Consumer<'a>, delay: DELAY, password: u32) -> Self {
        Self {
            tx,
            rx,
            delay,
            password,
            address: 0xFFFFFFFF,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            cmd_buffer: ArrayVec::new(),
            params: SystemParameters::default(),
            matched_id: NO_MATCH,
            match_confidence: NO_MATCH,
            template_count: 0,
        }
    }

    /// Releases the transport and delay resources.
    pub fn free(self) -> (TX, Consumer<'a>, DELAY) {
        (self.tx, self.rx, self.delay)
    }

    /// Adjusts the receive budget for a whole reply frame.
    pub fn set_timeout(&mut self, timeout_ms: u16) {
        self.timeout_ms = timeout_ms;
    }

    /// Performs the password handshake with the device.
    ///
    /// Returns `Status::Ok` when the password matches. A good way to check
    /// that the sensor is wired up and responding at all.
    pub fn check_password(&mut self) -> Result<Status, Error> {
        let pw = self.password.to_be_bytes();
        let reply = self.transact(&[Instruction::VfyPwd as u8, pw[0], pw[1], pw[2], pw[3]])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Convenience wrapper around [`check_password`](Fingerprint::check_password).
    pub fn verify_password(&mut self) -> Result<bool, Error> {
        Ok(self.check_password()? == Status::Ok)
    }

    /// Sets the device password. Future sessions will need it for the
    /// handshake, so don't forget it.
    pub fn set_password(&mut self, password: u32) -> Result<Status, Error> {
        let pw = password.to_be_bytes();
        let reply = self.transact(&[Instruction::SetPwd as u8, pw[0], pw[1], pw[2], pw[3]])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Reads the sensor's status and configuration block.
    ///
    /// On `Status::Ok` the decoded block is available through
    /// [`parameters`](Fingerprint::parameters).
    pub fn get_parameters(&mut self) -> Result<Status, Error> {
        let reply = self.transact(&[Instruction::ReadSysPara as u8])?;
        let status = Status::from(reply.data[0]);
        if status == Status::Ok {
            if reply.data.len() < 17 {
                return Err(Error::UnexpectedReply);
            }
            self.params = SystemParameters::from_payload(&reply.data[1..17]);
        }
        Ok(status)
    }

    /// Captures an image of the finger on the sensor surface.
    ///
    /// `Status::NoFinger` when nothing is pressed on the window,
    /// `Status::ImageFail` on an imaging error.
    pub fn get_image(&mut self) -> Result<Status, Error> {
        let reply = self.transact(&[Instruction::GenImg as u8])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Converts the captured image into a character file.
    ///
    /// `slot` selects the character buffer (1 or 2; put one capture in each
    /// to create a model). `Status::ImageMess`, `Status::FeatureFail` and
    /// `Status::InvalidImage` report the various extraction failures.
    pub fn image_to_tz(&mut self, slot: u8) -> Result<Status, Error> {
        let reply = self.transact(&[Instruction::Img2Tz as u8, slot])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Combines character buffers 1 and 2 into a template.
    ///
    /// `Status::EnrollMismatch` if the two captures do not belong to the
    /// same finger.
    pub fn create_model(&mut self) -> Result<Status, Error> {
        let reply = self.transact(&[Instruction::RegModel as u8])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Stores the template from buffer 1 at `location`.
    ///
    /// `Status::BadLocation` if the location is out of range,
    /// `Status::FlashError` if the write failed.
    pub fn store_model(&mut self, location: u16) -> Result<Status, Error> {
        let loc = location.to_be_bytes();
        let reply = self.transact(&[Instruction::Store as u8, 0x01, loc[0], loc[1]])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Loads the template at `location` into buffer 1.
    pub fn load_model(&mut self, location: u16) -> Result<Status, Error> {
        let loc = location.to_be_bytes();
        let reply = self.transact(&[Instruction::LoadChar as u8, 0x01, loc[0], loc[1]])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Asks the sensor to upload the template in buffer 1 over the UART.
    ///
    /// Only the acknowledgment is consumed here; the data packets that
    /// follow are left in the receive queue for the caller.
    pub fn get_model(&mut self) -> Result<Status, Error> {
        let reply = self.transact(&[Instruction::UpChar as u8, 0x01])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Deletes the template stored at `location`.
    pub fn delete_model(&mut self, location: u16) -> Result<Status, Error> {
        let loc = location.to_be_bytes();
        let reply = self.transact(&[Instruction::DeletChar as u8, loc[0], loc[1], 0x00, 0x01])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Erases every template in the library.
    pub fn empty_database(&mut self) -> Result<Status, Error> {
        let reply = self.transact(&[Instruction::Empty as u8])?;
        Ok(Status::from(reply.data[0]))
    }

    /// High-speed search of the library for the character file in buffer 1.
    ///
    /// On `Status::Ok` the match is available through
    /// [`matched_id`](Fingerprint::matched_id) and
    /// [`match_confidence`](Fingerprint::match_confidence);
    /// `Status::NotFound` when no template matched. Both outputs hold the
    /// 0xFFFF sentinel before the ack is decoded.
    pub fn finger_fast_search(&mut self) -> Result<Status, Error> {
        self.matched_id = NO_MATCH;
        self.match_confidence = NO_MATCH;
        let reply = self.transact(&[
            Instruction::HiSpeedSearch as u8,
            0x01, // buffer
            0x00,
            0x00, // start page
            0x00,
            0xA3, // page count
        ])?;
        self.read_match_outputs(&reply);
        Ok(Status::from(reply.data[0]))
    }

    /// Searches the whole library (page 0 up to the known capacity) for the
    /// character file in `slot`.
    ///
    /// Outputs behave as for [`finger_fast_search`](Fingerprint::finger_fast_search).
    pub fn finger_search(&mut self, slot: u8) -> Result<Status, Error> {
        self.matched_id = NO_MATCH;
        self.match_confidence = NO_MATCH;
        let cap = self.params.capacity.to_be_bytes();
        let reply = self.transact(&[
            Instruction::Search as u8,
            slot,
            0x00,
            0x00, // start page
            cap[0],
            cap[1],
        ])?;
        self.read_match_outputs(&reply);
        Ok(Status::from(reply.data[0]))
    }

    /// Reads the number of templates stored in the library.
    ///
    /// On `Status::Ok` the count is available through
    /// [`template_count`](Fingerprint::template_count).
    pub fn get_template_count(&mut self) -> Result<Status, Error> {
        let reply = self.transact(&[Instruction::TempleteNum as u8])?;
        if reply.data.len() >= 3 {
            self.template_count = BigEndian::read_u16(&reply.data[1..3]);
        }
        Ok(Status::from(reply.data[0]))
    }

    /// Switches the built-in LED on or off.
    pub fn led_control(&mut self, on: bool) -> Result<Status, Error> {
        let instruction = if on {
            Instruction::LedOn
        } else {
            Instruction::LedOff
        };
        let reply = self.transact(&[instruction as u8])?;
        Ok(Status::from(reply.data[0]))
    }

    /// Configures the aura LED ring, on modules that have one.
    ///
    /// `speed` scales the breathing/flashing cycle time and `count` the
    /// number of cycles (0 = forever).
    pub fn aura_led_config(
        &mut self,
        control: AuraControl,
        speed: u8,
        color: AuraColor,
        count: u8,
    ) -> Result<Status, Error> {
        let reply = self.transact(&[
            Instruction::AuraLedConfig as u8,
            control as u8,
            speed,
            color as u8,
            count,
        ])?;
        Ok(Status::from(reply.data[0]))
    }

    /// The configuration block from the last successful
    /// [`get_parameters`](Fingerprint::get_parameters) call, or the
    /// power-on defaults.
    pub fn parameters(&self) -> &SystemParameters {
        &self.params
    }

    /// Library location of the last search match, 0xFFFF if none.
    pub fn matched_id(&self) -> u16 {
        self.matched_id
    }

    /// Confidence score of the last search match, 0xFFFF if none.
    pub fn match_confidence(&self) -> u16 {
        self.match_confidence
    }

    /// Template count from the last successful
    /// [`get_template_count`](Fingerprint::get_template_count) call.
    pub fn template_count(&self) -> u16 {
        self.template_count
    }

    /// Bytes lost to receive-queue overflow since the queue was created.
    pub fn overflow_count(&self) -> usize {
        self.rx.overflow_count()
    }

    /// Sends one command frame and blocks for its acknowledgment.
    ///
    /// The returned packet is guaranteed to be an ack with at least the
    /// confirmation byte in its payload; everything else is a communication
    /// error.
    fn transact(&mut self, payload: &[u8]) -> Result<Packet, Error> {
        let request = Packet::command(self.address, payload);
        self.write_packet(&request);

        let reply = self.read_packet()?;
        if reply.kind != PacketKind::Ack || reply.data.is_empty() {
            return Err(Error::UnexpectedReply);
        }
        Ok(reply)
    }

    fn write_packet(&mut self, packet: &Packet) {
        self.cmd_buffer.clear();
        packet.serialize_into(&mut self.cmd_buffer);

        let cmd_bytes = &self.cmd_buffer[..];
        for byte in cmd_bytes {
            block!(self.tx.write(*byte)).ok();
        }
        block!(self.tx.flush()).ok();
    }

    /// Drains the receive queue through the parser until a frame completes.
    ///
    /// The timeout budget is cumulative over the whole frame: every poll
    /// interval spent with the queue empty counts against it, and exhausting
    /// it mid-frame abandons the bytes read so far. The parser's start-code
    /// scan resynchronizes the next exchange past any stragglers.
    fn read_packet(&mut self) -> Result<Packet, Error> {
        let mut parser = PacketParser::new();
        let mut timer = 0u16;
        loop {
            while self.rx.is_empty() {
                self.delay.delay_ms(POLL_INTERVAL_MS);
                timer = timer.saturating_add(POLL_INTERVAL_MS);
                if timer >= self.timeout_ms {
                    return Err(Error::Timeout);
                }
            }
            if let Some(byte) = self.rx.pop() {
                if parser.feed(byte)? {
                    return Ok(parser.into_packet());
                }
            }
        }
    }

    /// Decodes matched id and confidence from a search ack, leaving the
    /// sentinels in place when the payload is short.
    fn read_match_outputs(&mut self, reply: &Packet) {
        if reply.data.len() >= 5 {
            self.matched_id = BigEndian::read_u16(&reply.data[1..3]);
            self.match_confidence = BigEndian::read_u16(&reply.data[3..5]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::START_CODE;
    use crate::ring::{Producer, RxQueue};

    struct MockTx {
        written: ArrayVec<[u8; 512]>,
    }

    impl MockTx {
        fn new() -> Self {
            Self {
                written: ArrayVec::new(),
            }
        }
    }

    impl Write<u8> for MockTx {
        type Error = ();

        fn write(&mut self, word: u8) -> nb::Result<(), Self::Error> {
            self.written.push(word);
            Ok(())
        }

        fn flush(&mut self) -> nb::Result<(), Self::Error> {
            Ok(())
        }
    }

    struct MockDelay;

    impl DelayMs<u16> for MockDelay {
        fn delay_ms(&mut self, _ms: u16) {}
    }

    /// Frames `payload` as an acknowledgment from the broadcast address and
    /// loads it into the queue, as the receive interrupt would.
    fn queue_ack(producer: &mut Producer<'_>, payload: &[u8]) {
        let packet = Packet {
            start_code: START_CODE,
            address: 0xFFFFFFFF,
            kind: PacketKind::Ack,
            data: {
                let mut data = ArrayVec::new();
                data.try_extend_from_slice(payload).unwrap();
                data
            },
        };
        let mut frame = ArrayVec::<[u8; CMD_BUFFER_SIZE]>::new();
        packet.serialize_into(&mut frame);
        for byte in &frame {
            assert!(producer.push(*byte));
        }
    }

    fn queue_bytes(producer: &mut Producer<'_>, bytes: &[u8]) {
        for byte in bytes {
            assert!(producer.push(*byte));
        }
    }

    #[test]
    fn check_password_emits_canonical_frame() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_ack(&mut producer, &[0x00]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0x00000000);
        assert_eq!(sensor.check_password(), Ok(Status::Ok));

        let (tx, _, _) = sensor.free();
        let expected = [
            0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x07, 0x13, 0x00, 0x00, 0x00, 0x00,
            0x00, 0x1B,
        ];
        assert_eq!(&tx.written[..], &expected[..]);
    }

    #[test]
    fn get_parameters_decodes_configuration() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_ack(
            &mut producer,
            &[
                0x00, // confirmation
                0x00, 0x00, // status register
                0x00, 0x00, // system id
                0x00, 0x40, // capacity 64
                0x00, 0x00, // security level
                0x00, 0x00, 0x00, 0x00, // device address
                0x00, 0x01, // packet code 1 -> 64 bytes
                0x00, 0x06, // baud code 6 -> 57600
            ],
        );

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_parameters(), Ok(Status::Ok));
        assert_eq!(sensor.parameters().capacity, 64);
        assert_eq!(sensor.parameters().packet_length, 64);
        assert_eq!(sensor.parameters().baud_rate, 57600);
    }

    #[test]
    fn fast_search_not_found_keeps_outputs_readable() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_ack(&mut producer, &[0x09, 0x00, 0x12, 0x00, 0x34]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.finger_fast_search(), Ok(Status::NotFound));
        assert_eq!(sensor.matched_id(), 0x0012);
        assert_eq!(sensor.match_confidence(), 0x0034);
    }

    #[test]
    fn finger_search_uses_known_capacity() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_ack(&mut producer, &[0x00, 0x00, 0x07, 0x00, 0x99]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.finger_search(1), Ok(Status::Ok));
        assert_eq!(sensor.matched_id(), 0x0007);
        assert_eq!(sensor.match_confidence(), 0x0099);

        let (tx, _, _) = sensor.free();
        // instruction, slot, start page, then the default capacity of 64.
        assert_eq!(&tx.written[9..15], &[0x04, 0x01, 0x00, 0x00, 0x00, 0x40]);
    }

    #[test]
    fn template_count_is_stored() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_ack(&mut producer, &[0x00, 0x00, 0x2A]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_template_count(), Ok(Status::Ok));
        assert_eq!(sensor.template_count(), 42);
    }

    #[test]
    fn empty_queue_times_out() {
        let mut queue = RxQueue::new();
        let (_producer, consumer) = queue.split();

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_image(), Err(Error::Timeout));
    }

    #[test]
    fn garbage_without_start_code_times_out() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_bytes(&mut producer, &[0x00, 0x13, 0x37, 0x42, 0x00]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_image(), Err(Error::Timeout));
    }

    #[test]
    fn truncated_reply_times_out() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        // Header declares a 5-byte payload but only 3 bytes ever arrive.
        queue_bytes(
            &mut producer,
            &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x00, 0x05, 0x00, 0x11, 0x22],
        );

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_image(), Err(Error::Timeout));
    }

    #[test]
    fn bad_start_code_is_rejected() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_bytes(&mut producer, &[0xEF, 0x02, 0xFF, 0xFF]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_image(), Err(Error::BadPacket));
    }

    #[test]
    fn stray_bytes_resynchronize_on_start_code() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        // Leftovers from an abandoned frame, then a clean ack.
        queue_bytes(&mut producer, &[0x42, 0x42, 0x42]);
        queue_ack(&mut producer, &[0x00]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_image(), Ok(Status::Ok));
    }

    #[test]
    fn non_ack_reply_is_a_communication_error() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        // A data packet where an ack was expected.
        queue_bytes(
            &mut producer,
            &[0xEF, 0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0x02, 0x00, 0x03, 0x00, 0x00, 0x05],
        );

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0);
        assert_eq!(sensor.get_image(), Err(Error::UnexpectedReply));
    }

    #[test]
    fn wrong_password_is_reported_as_status() {
        let mut queue = RxQueue::new();
        let (mut producer, consumer) = queue.split();
        queue_ack(&mut producer, &[0x13]);

        let mut sensor = Fingerprint::new(MockTx::new(), consumer, MockDelay, 0xDEADBEEF);
        assert_eq!(sensor.verify_password(), Ok(false));
    }
}
