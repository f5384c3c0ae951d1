#![no_main]

use libfuzzer_sys::fuzz_target;
use shortkv::connection::split_host_port;

fuzz_target!(|data: &[u8]| {
    if let Ok(addr) = std::str::from_utf8(data) {
        if let Ok((host, _port)) = split_host_port(addr) {
            assert!(host.len() < addr.len());
            assert!(!host.contains(']'));
        }
    }
});
