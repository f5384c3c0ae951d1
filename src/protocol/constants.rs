//! RESP2 protocol constants

/// Frame type prefixes
pub mod tags {
    /// Simple string (`+OK`)
    pub const SIMPLE_STRING: u8 = b'+';

    /// Error reply (`-ERR ...`)
    pub const ERROR: u8 = b'-';

    /// Integer reply (`:1`)
    pub const INTEGER: u8 = b':';

    /// Bulk string (`$3\r\nfoo`)
    pub const BULK_STRING: u8 = b'$';

    /// Array (`*2\r\n...`)
    pub const ARRAY: u8 = b'*';
}

/// Line terminator
pub const CRLF: &[u8] = b"\r\n";

/// Largest bulk string a server may send (matches the store's `proto-max-bulk-len` default)
pub const MAX_BULK_LENGTH: usize = 512 * 1024 * 1024;

/// Largest array element count accepted before allocation
pub const MAX_ARRAY_LENGTH: usize = 1024 * 1024;

/// Deepest array nesting accepted
pub const MAX_NESTING_DEPTH: usize = 32;

/// Administrative command keywords
pub mod admin {
    /// `CONFIG`
    pub const CONFIG: &str = "CONFIG";

    /// `SET` subcommand of `CONFIG`
    pub const SET: &str = "SET";

    /// Parameter announcing this node's reachable address
    pub const CLUSTER_ANNOUNCE_IP: &str = "cluster-announce-ip";

    /// Parameter holding the replication authentication secret
    pub const MASTERAUTH: &str = "masterauth";
}

/// Placeholder printed in place of secret command arguments
pub const REDACTED: &str = "<redacted>";
