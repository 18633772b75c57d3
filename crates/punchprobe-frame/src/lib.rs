//! Punch record codec and stream framer.
//!
//! Every punch is a fixed 18-byte frame:
//! - A preamble byte (STX) and a header byte (0xD3) marking the record start
//! - A length byte (13) giving the payload size
//! - 13 payload bytes (station, serial, time, store index), big-endian
//! - A 2-byte checksum placeholder that is carried but never validated
//!
//! The stream framer has no escaping and no resynchronization: once a frame
//! boundary is lost, the rest of the stream is unrecoverable.

pub mod codec;
pub mod error;
pub mod time;

pub use codec::{
    decode_stream, decode_stream_with, encode_punch, DecodeConfig, DecodedStream, Punch,
    PunchFields, CHECKSUM, FRAME_OVERHEAD, HEADER, PAYLOAD_LEN, PREAMBLE, PUNCH_LEN,
    SERIAL_OFFSET, STATION_OFFSET,
};
pub use error::{FrameError, Result};
pub use time::PunchTime;
