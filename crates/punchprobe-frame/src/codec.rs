use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;

use crate::error::FrameError;
use crate::time::PunchTime;

/// STX, first byte of every punch.
pub const PREAMBLE: u8 = 0x02;

/// Record-type marker, one byte after the preamble.
pub const HEADER: u8 = 0xD3;

/// Payload length carried in the length byte.
pub const PAYLOAD_LEN: u8 = 13;

/// Preamble (1) + header (1) + length (1) + checksum (2).
pub const FRAME_OVERHEAD: usize = 5;

/// Total wire size of a punch: 18 bytes.
pub const PUNCH_LEN: usize = PAYLOAD_LEN as usize + FRAME_OVERHEAD;

/// Constant checksum placeholder. Transmitted, never validated.
pub const CHECKSUM: u16 = 0xABCD;

/// Largest value representable in the 3-byte store index field.
pub const STORE_INDEX_MAX: u32 = 0x00FF_FFFF;

const HEADER_OFFSET: usize = 1;
const LENGTH_OFFSET: usize = 2;
pub const STATION_OFFSET: usize = 3;
pub const SERIAL_OFFSET: usize = 5;
const DAY_FLAGS_OFFSET: usize = 9;
const TIME_OFFSET: usize = 10;
const SUB_SECOND_OFFSET: usize = 12;
const STORE_INDEX_OFFSET: usize = 13;
const CHECKSUM_OFFSET: usize = 16;

/// Field values of a punch, as handed to the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PunchFields {
    /// Logical station the punch originates from.
    pub station: u16,
    /// Sequence number, unique within one test level.
    pub serial: u32,
    /// Position in the generation sequence. Only the low 24 bits are sent.
    pub store_index: u32,
    pub time: PunchTime,
}

/// One complete frame, exactly as it appears on the wire.
///
/// Punches built by [`Punch::encode`] always have the standard 18-byte layout.
/// Punches cut from a received stream may not, so field accessors return
/// `None` when the frame is too short to hold the field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Punch(Bytes);

impl Punch {
    /// Encode a standard punch.
    pub fn encode(fields: &PunchFields) -> Self {
        let mut buf = BytesMut::with_capacity(PUNCH_LEN);
        encode_punch(fields, &mut buf);
        Self(buf.freeze())
    }

    /// Wrap raw frame bytes without validation.
    pub fn from_bytes(raw: impl Into<Bytes>) -> Self {
        Self(raw.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Size of this frame on the wire.
    pub fn wire_size(&self) -> usize {
        self.0.len()
    }

    pub fn station(&self) -> Option<u16> {
        self.be_u16(STATION_OFFSET)
    }

    /// The serial id, used as the lookup key during identifier-keyed verification.
    pub fn serial(&self) -> Option<u32> {
        self.0
            .get(SERIAL_OFFSET..SERIAL_OFFSET + 4)
            .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn day_flags(&self) -> Option<u8> {
        self.0.get(DAY_FLAGS_OFFSET).copied()
    }

    pub fn time_of_day(&self) -> Option<u16> {
        self.be_u16(TIME_OFFSET)
    }

    pub fn sub_second(&self) -> Option<u8> {
        self.0.get(SUB_SECOND_OFFSET).copied()
    }

    pub fn store_index(&self) -> Option<u32> {
        self.0
            .get(STORE_INDEX_OFFSET..STORE_INDEX_OFFSET + 3)
            .map(|b| u32::from_be_bytes([0, b[0], b[1], b[2]]))
    }

    pub fn checksum(&self) -> Option<u16> {
        self.be_u16(CHECKSUM_OFFSET)
    }

    /// All payload fields, if the frame has the standard layout length.
    pub fn fields(&self) -> Option<PunchFields> {
        if self.0.len() < PUNCH_LEN {
            return None;
        }
        Some(PunchFields {
            station: self.station()?,
            serial: self.serial()?,
            store_index: self.store_index()?,
            time: PunchTime {
                day_flags: self.day_flags()?,
                time_of_day: self.time_of_day()?,
                sub_second: self.sub_second()?,
            },
        })
    }

    fn be_u16(&self, offset: usize) -> Option<u16> {
        self.0
            .get(offset..offset + 2)
            .map(|b| u16::from_be_bytes([b[0], b[1]]))
    }
}

impl fmt::Display for Punch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, byte) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl AsRef<[u8]> for Punch {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

/// Encode a punch into the wire format.
///
/// Wire format (multi-byte fields big-endian):
/// ```text
/// ┌─────┬─────┬─────┬─────────┬─────────┬────┬─────────┬─────┬─────────┬─────────┐
/// │ STX │ HDR │ LEN │ Station │ Serial  │ TD │ Timer   │ TSS │ Store   │ CRC     │
/// │ 02  │ D3  │ 0D  │ (2B)    │ (4B)    │(1B)│ (2B)    │(1B) │ (3B)    │ AB CD   │
/// └─────┴─────┴─────┴─────────┴─────────┴────┴─────────┴─────┴─────────┴─────────┘
/// ```
pub fn encode_punch(fields: &PunchFields, dst: &mut BytesMut) {
    dst.reserve(PUNCH_LEN);
    dst.put_u8(PREAMBLE);
    dst.put_u8(HEADER);
    dst.put_u8(PAYLOAD_LEN);
    dst.put_u16(fields.station);
    dst.put_u32(fields.serial);
    dst.put_u8(fields.time.day_flags);
    dst.put_u16(fields.time.time_of_day);
    dst.put_u8(fields.time.sub_second);
    dst.put_uint(u64::from(fields.store_index & STORE_INDEX_MAX), 3);
    dst.put_u16(CHECKSUM);
}

/// Controls how strictly frame boundaries are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeConfig {
    /// Require the preamble byte at each frame boundary.
    pub check_preamble: bool,
    /// Require this exact value in the length byte. `None` accepts any length.
    pub expected_length: Option<u8>,
}

impl DecodeConfig {
    /// Header-only recognition: any preamble byte, any length.
    pub fn lenient() -> Self {
        Self {
            check_preamble: false,
            expected_length: None,
        }
    }
}

impl Default for DecodeConfig {
    fn default() -> Self {
        Self {
            check_preamble: true,
            expected_length: Some(PAYLOAD_LEN),
        }
    }
}

/// Result of splitting a byte stream into punches.
#[derive(Debug, Clone, Default)]
pub struct DecodedStream {
    /// Punches extracted before decoding stopped, in stream order.
    pub punches: Vec<Punch>,
    /// Bytes consumed by the extracted punches.
    pub consumed: usize,
    /// Set when decoding stopped before the end of the stream.
    pub error: Option<FrameError>,
}

impl DecodedStream {
    /// True when the whole stream was consumed without a framing error.
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }

    /// Discard the partial result on error.
    pub fn into_result(self) -> crate::Result<Vec<Punch>> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.punches),
        }
    }
}

/// Split a byte stream into punches with the default (strict) configuration.
pub fn decode_stream(stream: impl Into<Bytes>) -> DecodedStream {
    decode_stream_with(stream, &DecodeConfig::default())
}

/// Split a byte stream into punches.
///
/// Scans left to right. At each frame boundary the header byte must sit one
/// byte past the boundary; the frame size is the length byte plus
/// [`FRAME_OVERHEAD`]. The first boundary that fails recognition stops the
/// decode: the punches found so far are returned together with the error, and
/// no attempt is made to find a later boundary.
pub fn decode_stream_with(stream: impl Into<Bytes>, config: &DecodeConfig) -> DecodedStream {
    let stream = stream.into();
    let mut out = DecodedStream::default();
    let mut pos = 0usize;

    while pos < stream.len() {
        match frame_len_at(&stream, pos, config) {
            Ok(len) => {
                out.punches.push(Punch(stream.slice(pos..pos + len)));
                pos += len;
            }
            Err(err) => {
                debug!(
                    offset = pos,
                    decoded = out.punches.len(),
                    error = %err,
                    "punch stream desynchronized"
                );
                out.error = Some(err);
                break;
            }
        }
    }

    out.consumed = pos;
    out
}

fn frame_len_at(stream: &[u8], pos: usize, config: &DecodeConfig) -> Result<usize, FrameError> {
    let available = stream.len() - pos;

    let header = stream.get(pos + HEADER_OFFSET).copied();
    if header != Some(HEADER) {
        return Err(FrameError::Desynchronized {
            offset: pos,
            found: header,
        });
    }

    if config.check_preamble && stream[pos] != PREAMBLE {
        return Err(FrameError::BadPreamble {
            offset: pos,
            found: stream[pos],
        });
    }

    let length = match stream.get(pos + LENGTH_OFFSET) {
        Some(length) => *length,
        None => {
            return Err(FrameError::Truncated {
                offset: pos,
                needed: LENGTH_OFFSET + 1,
                available,
            })
        }
    };

    if let Some(expected) = config.expected_length {
        if length != expected {
            return Err(FrameError::UnexpectedLength {
                offset: pos,
                found: length,
                expected,
            });
        }
    }

    let needed = length as usize + FRAME_OVERHEAD;
    if needed > available {
        return Err(FrameError::Truncated {
            offset: pos,
            needed,
            available,
        });
    }

    Ok(needed)
}
