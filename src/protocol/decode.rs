//! Protocol message decoding

use super::constants::{tags, MAX_ARRAY_LENGTH, MAX_BULK_LENGTH, MAX_NESTING_DEPTH};
use super::message::Frame;
use bytes::{Bytes, BytesMut};
use std::io;

/// Decode one reply frame from the front of a buffer without consuming it
///
/// The caller must advance the buffer by the returned byte count.
///
/// # Returns
/// `Ok((frame, consumed))` - Frame and number of bytes it occupied
/// `Err(e)` with `UnexpectedEof` - more data is needed
/// `Err(e)` with `InvalidData` - the stream is not valid RESP
pub fn decode_frame(data: &BytesMut) -> io::Result<(Frame, usize)> {
    decode_at(&data[..], 0, 0)
}

fn decode_at(data: &[u8], start: usize, depth: usize) -> io::Result<(Frame, usize)> {
    if depth > MAX_NESTING_DEPTH {
        return Err(invalid(format!(
            "array nesting exceeds maximum depth {}",
            MAX_NESTING_DEPTH
        )));
    }

    let (line, after_line) = read_line(data, start)?;
    if line.is_empty() {
        return Err(invalid("empty frame header".to_string()));
    }
    let body = &line[1..];

    let frame = match line[0] {
        tags::SIMPLE_STRING => (Frame::Simple(lossy(body)), after_line),
        tags::ERROR => (Frame::Error(lossy(body)), after_line),
        tags::INTEGER => (Frame::Integer(parse_int(body)?), after_line),
        tags::BULK_STRING => decode_bulk(data, body, after_line)?,
        tags::ARRAY => decode_array(data, body, after_line, depth)?,
        other => {
            return Err(invalid(format!("unknown frame tag: 0x{:02X}", other)));
        }
    };

    Ok((frame.0, frame.1 - start))
}

fn decode_bulk(data: &[u8], header: &[u8], offset: usize) -> io::Result<(Frame, usize)> {
    let len = parse_int(header)?;
    if len < 0 {
        return Ok((Frame::Bulk(None), offset));
    }

    let len = len as usize;
    if len > MAX_BULK_LENGTH {
        return Err(invalid(format!(
            "bulk length {} exceeds maximum allowed {}",
            len, MAX_BULK_LENGTH
        )));
    }

    let end = offset + len;
    if data.len() < end + 2 {
        return Err(incomplete("incomplete bulk string"));
    }
    if &data[end..end + 2] != b"\r\n" {
        return Err(invalid("bulk string not terminated by CRLF".to_string()));
    }

    let payload = Bytes::copy_from_slice(&data[offset..end]);
    Ok((Frame::Bulk(Some(payload)), end + 2))
}

fn decode_array(
    data: &[u8],
    header: &[u8],
    offset: usize,
    depth: usize,
) -> io::Result<(Frame, usize)> {
    let len = parse_int(header)?;
    if len < 0 {
        return Ok((Frame::Array(None), offset));
    }

    let len = len as usize;
    if len > MAX_ARRAY_LENGTH {
        return Err(invalid(format!(
            "array length {} exceeds maximum allowed {}",
            len, MAX_ARRAY_LENGTH
        )));
    }

    // Every element needs at least 3 bytes, so a short buffer cannot hold them all.
    if data.len().saturating_sub(offset) < len.saturating_mul(3) {
        return Err(incomplete("incomplete array"));
    }

    let mut items = Vec::with_capacity(len);
    let mut cursor = offset;
    for _ in 0..len {
        let (item, consumed) = decode_at(data, cursor, depth + 1)?;
        items.push(item);
        cursor += consumed;
    }

    Ok((Frame::Array(Some(items)), cursor))
}

/// Return the line starting at `start` (without CRLF) and the offset after it
fn read_line(data: &[u8], start: usize) -> io::Result<(&[u8], usize)> {
    let rest = data
        .get(start..)
        .ok_or_else(|| incomplete("incomplete frame header"))?;
    match rest.windows(2).position(|w| w == b"\r\n") {
        Some(pos) => Ok((&rest[..pos], start + pos + 2)),
        None => Err(incomplete("incomplete frame header")),
    }
}

fn parse_int(data: &[u8]) -> io::Result<i64> {
    std::str::from_utf8(data)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| invalid(format!("invalid integer: {:?}", lossy(data))))
}

fn lossy(data: &[u8]) -> String {
    String::from_utf8_lossy(data).into_owned()
}

fn incomplete(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::UnexpectedEof, msg)
}

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
