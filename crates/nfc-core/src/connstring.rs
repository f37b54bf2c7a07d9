//! Bounded connection strings.
//!
//! A connection string names a device as `driver:param1:param2`. The empty string
//! asks the driver for the first device it can detect.

use crate::error::{NfcError, Result};
use std::fmt;

/// Size of the native connection-string buffer, terminator included.
pub const CONNSTRING_BUFSIZE: usize = 1024;

/// Longest connection string accepted, in bytes.
pub const MAX_CONNSTRING_LEN: usize = CONNSTRING_BUFSIZE - 1;

/// A validated connection string. Oversized input is rejected, never truncated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ConnString(String);

impl ConnString {
    pub fn new(value: &str) -> Result<Self> {
        if value.len() > MAX_CONNSTRING_LEN {
            return Err(NfcError::validation(format!(
                "connection string is {} bytes, maximum is {}",
                value.len(),
                MAX_CONNSTRING_LEN
            )));
        }
        if value.contains('\0') {
            return Err(NfcError::validation(
                "connection string contains a NUL byte",
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// The empty connection string: first auto-detected device.
    pub fn auto() -> Self {
        Self::default()
    }

    pub fn is_auto(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split against a driver name and an alternative bus name.
    pub fn decode(&self, driver: &str, bus: &str) -> Decoded<'_> {
        decode(&self.0, driver, bus)
    }
}

impl fmt::Display for ConnString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ConnString {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Result of matching a connection string against a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded<'a> {
    /// Another driver's connection string.
    Mismatch,
    /// Driver named, no device selected.
    DriverOnly,
    /// Driver and at least one parameter.
    Device {
        param1: &'a str,
        param2: Option<&'a str>,
    },
}

impl Decoded<'_> {
    /// Number of matched fields; 0 for a mismatch.
    pub fn level(&self) -> usize {
        match self {
            Decoded::Mismatch => 0,
            Decoded::DriverOnly => 1,
            Decoded::Device { param2: None, .. } => 2,
            Decoded::Device { param2: Some(_), .. } => 3,
        }
    }
}

pub fn decode<'a>(connstring: &'a str, driver: &str, bus: &str) -> Decoded<'a> {
    let mut fields = connstring.splitn(3, ':');
    let head = fields.next().unwrap_or_default();
    if head.is_empty() || (head != driver && head != bus) {
        return Decoded::Mismatch;
    }
    match fields.next().filter(|p| !p.is_empty()) {
        None => Decoded::DriverOnly,
        Some(param1) => Decoded::Device {
            param1,
            param2: fields.next().filter(|p| !p.is_empty()),
        },
    }
}
