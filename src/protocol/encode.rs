//! Protocol message encoding

use super::constants::{tags, CRLF};
use super::message::Cmd;
use bytes::{BufMut, BytesMut};

/// Encode a command as a RESP array of bulk strings
pub fn encode_command(cmd: &Cmd) -> BytesMut {
    let args = cmd.args();
    let payload: usize = args.iter().map(|a| a.len() + 16).sum();
    let mut buf = BytesMut::with_capacity(payload + 16);
    encode_command_into(cmd, &mut buf);
    buf
}

/// Encode a command into an existing buffer
pub fn encode_command_into(cmd: &Cmd, buf: &mut BytesMut) {
    let args = cmd.args();
    buf.put_u8(tags::ARRAY);
    put_decimal(buf, args.len());
    buf.put_slice(CRLF);

    for arg in args {
        buf.put_u8(tags::BULK_STRING);
        put_decimal(buf, arg.len());
        buf.put_slice(CRLF);
        buf.put_slice(arg);
        buf.put_slice(CRLF);
    }
}

fn put_decimal(buf: &mut BytesMut, n: usize) {
    buf.put_slice(n.to_string().as_bytes());
}
