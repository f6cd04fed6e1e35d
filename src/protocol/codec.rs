//! Packet encoding and decoding.
//!
//! # Responsibilities
//! - Parse and validate the fixed 12 byte header
//! - Parse the `key=value\n` field section up to its NUL terminator
//! - Render a packet back to bytes, folding the ticket into the id
//!
//! # Design Decisions
//! - Byte order is always explicit big-endian, never host order
//! - The length word is recomputed on encode and checked on decode
//! - Escaping of individual values is the producer's job, not the codec's

use crate::protocol::error::FramingError;
use crate::protocol::packet::{Class, Fields, Packet};

/// Size of the fixed frame header: class, id, length.
pub const HEADER_LEN: usize = 12;

const ENTRY_SEPARATOR: u8 = b'\n';
const KEY_VALUE_SEPARATOR: u8 = b'=';
const TERMINATOR: u8 = 0;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub class: Class,
    pub id: u32,
    /// Total frame length, header included.
    pub length: u32,
}

impl Header {
    /// Parse the header at the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, FramingError> {
        if bytes.len() < HEADER_LEN {
            return Err(FramingError::ShortHeader(bytes.len()));
        }

        let tag = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let class = Class::from_bytes(tag).ok_or(FramingError::InvalidClass(tag))?;
        let id = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let length = u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);

        Ok(Self { class, id, length })
    }
}

/// Combine a message id with the connection's ticket counter.
pub fn correlation_id(id: u32, ticket: u32) -> u32 {
    id.wrapping_add(ticket)
}

/// Decode exactly one packet. The buffer must hold the whole frame and
/// nothing else.
pub fn decode(buf: &[u8]) -> Result<Packet, FramingError> {
    let header = Header::parse(buf)?;

    if header.length as usize != buf.len() {
        return Err(FramingError::LengthMismatch {
            declared: header.length,
            actual: buf.len(),
        });
    }

    let fields = decode_fields(&buf[HEADER_LEN..])?;
    Ok(Packet::new(header.class, header.id, fields))
}

fn decode_fields(section: &[u8]) -> Result<Fields, FramingError> {
    let end = section
        .iter()
        .position(|&b| b == TERMINATOR)
        .ok_or(FramingError::Unterminated)?;

    let trailing = section.len() - end - 1;
    if trailing > 0 {
        return Err(FramingError::TrailingBytes(trailing));
    }

    let text = std::str::from_utf8(&section[..end]).map_err(|_| FramingError::InvalidText)?;

    let mut fields = Fields::new();
    for entry in text.split(ENTRY_SEPARATOR as char) {
        if entry.is_empty() {
            continue;
        }
        match entry.split_once(KEY_VALUE_SEPARATOR as char) {
            Some((key, value)) if !key.is_empty() => fields.insert(key, value),
            _ => return Err(FramingError::MalformedEntry(entry.to_string())),
        }
    }

    Ok(fields)
}

/// Encode a packet, emitting `packet.id() + ticket` as the wire id.
pub fn encode(packet: &Packet, ticket: u32) -> Result<Vec<u8>, FramingError> {
    let mut section = Vec::new();
    for (key, value) in packet.fields().iter() {
        if key.is_empty() || key.bytes().any(|b| matches!(b, KEY_VALUE_SEPARATOR | ENTRY_SEPARATOR | TERMINATOR)) {
            return Err(FramingError::InvalidKey(key.to_string()));
        }
        if value.bytes().any(|b| matches!(b, ENTRY_SEPARATOR | TERMINATOR)) {
            return Err(FramingError::InvalidValue(key.to_string()));
        }
        section.extend_from_slice(key.as_bytes());
        section.push(KEY_VALUE_SEPARATOR);
        section.extend_from_slice(value.as_bytes());
        section.push(ENTRY_SEPARATOR);
    }
    section.push(TERMINATOR);

    let total = HEADER_LEN + section.len();
    let length = u32::try_from(total).map_err(|_| FramingError::TooLarge(total))?;

    let mut frame = Vec::with_capacity(total);
    frame.extend_from_slice(packet.class().as_bytes());
    frame.extend_from_slice(&correlation_id(packet.id(), ticket).to_be_bytes());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(&section);

    Ok(frame)
}
