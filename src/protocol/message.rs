//! Protocol message types

use super::constants::{admin, REDACTED};
use crate::{Error, Result};
use bytes::Bytes;
use std::fmt;

/// A command sent to the store (client → server)
///
/// Arguments are binary-safe. Arguments marked secret are written to the
/// wire unchanged but never appear in `Display` or `Debug` output, so a
/// command can be embedded in error messages and logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Cmd {
    args: Vec<Bytes>,
    secret: Vec<bool>,
}

impl Cmd {
    /// Start a command with its name
    pub fn new(name: impl Into<Bytes>) -> Self {
        Self {
            args: vec![name.into()],
            secret: vec![false],
        }
    }

    /// Append an argument
    pub fn arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self.secret.push(false);
        self
    }

    /// Append an argument that must never be printed
    pub fn secret_arg(mut self, arg: impl Into<Bytes>) -> Self {
        self.args.push(arg.into());
        self.secret.push(true);
        self
    }

    /// `GET <key>`
    pub fn get(key: impl Into<Bytes>) -> Self {
        Self::new("GET").arg(key)
    }

    /// `SET <key> <value>`
    pub fn set(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::new("SET").arg(key).arg(value)
    }

    /// `SET <key> <value> NX`
    pub fn set_nx(key: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::set(key, value).arg("NX")
    }

    /// `CONFIG SET <parameter> <value>`
    ///
    /// The value of `masterauth` is treated as a secret.
    pub fn config_set(parameter: &str, value: impl Into<Bytes>) -> Self {
        let cmd = Self::new(admin::CONFIG)
            .arg(admin::SET)
            .arg(Bytes::copy_from_slice(parameter.as_bytes()));
        if parameter.eq_ignore_ascii_case(admin::MASTERAUTH) {
            cmd.secret_arg(value)
        } else {
            cmd.arg(value)
        }
    }

    /// `AUTH [<username>] <password>`
    pub fn auth(username: &str, password: &str) -> Self {
        let cmd = Self::new("AUTH");
        let cmd = if username.is_empty() {
            cmd
        } else {
            cmd.arg(Bytes::copy_from_slice(username.as_bytes()))
        };
        cmd.secret_arg(Bytes::copy_from_slice(password.as_bytes()))
    }

    /// `PING`
    pub fn ping() -> Self {
        Self::new("PING")
    }

    /// Command name (first argument)
    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.args[0]).to_uppercase()
    }

    /// All arguments, including the name
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (arg, secret)) in self.args.iter().zip(&self.secret).enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            if *secret {
                f.write_str(REDACTED)?;
            } else {
                f.write_str(&String::from_utf8_lossy(arg))?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cmd({})", self)
    }
}

/// A reply frame (server → client)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// `+OK`
    Simple(String),

    /// `-ERR message`
    Error(String),

    /// `:42`
    Integer(i64),

    /// `$n` bulk string, `None` for the null bulk (`$-1`)
    Bulk(Option<Bytes>),

    /// `*n` array, `None` for the null array (`*-1`)
    Array(Option<Vec<Frame>>),
}

impl Frame {
    /// Whether this frame is a null bulk or null array
    pub fn is_null(&self) -> bool {
        matches!(self, Frame::Bulk(None) | Frame::Array(None))
    }

    /// Interpret the frame as an optional UTF-8 string
    ///
    /// Null replies map to `None`; integers are rendered in decimal.
    pub fn into_string(self) -> Result<Option<String>> {
        match self {
            Frame::Simple(s) => Ok(Some(s)),
            Frame::Integer(n) => Ok(Some(n.to_string())),
            Frame::Bulk(Some(data)) => String::from_utf8(data.to_vec())
                .map(Some)
                .map_err(|e| Error::Protocol(format!("bulk reply is not UTF-8: {}", e))),
            Frame::Bulk(None) | Frame::Array(None) => Ok(None),
            Frame::Error(msg) => Err(Error::Server(msg)),
            Frame::Array(Some(_)) => Err(Error::Protocol(
                "expected a string reply, got an array".into(),
            )),
        }
    }

    /// Check for a `+OK` status reply
    pub fn expect_ok(self) -> Result<()> {
        match self {
            Frame::Simple(s) if s.eq_ignore_ascii_case("OK") => Ok(()),
            Frame::Error(msg) => Err(Error::Server(msg)),
            other => Err(Error::Protocol(format!("expected OK, got {:?}", other))),
        }
    }
}
