#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use shortkv::protocol::decode_frame;

fuzz_target!(|data: &[u8]| {
    let mut buf = BytesMut::from(data);

    // Feed the buffer in a loop to simulate several replies arriving
    // in a single TCP segment.
    while !buf.is_empty() {
        match decode_frame(&buf) {
            Ok((_, consumed)) => {
                assert!(consumed > 0 && consumed <= buf.len());
                let _ = buf.split_to(consumed);
            }
            Err(_) => break,
        }
    }
});
