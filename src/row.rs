//! # Row Codec
//!
//! Rows are fixed-width: a 4-byte little-endian id, a 32-byte username
//! field, and a 255-byte email field, for 291 bytes total. Text fields are
//! zero-padded on write and trimmed at the first NUL on read. The storage
//! engine never interprets these bytes; it stores the serialized row as an
//! opaque value blob.

use std::fmt;

use eyre::{ensure, Result, WrapErr};

pub const ID_SIZE: usize = 4;
pub const USERNAME_SIZE: usize = 32;
pub const EMAIL_SIZE: usize = 255;

pub const ID_OFFSET: usize = 0;
pub const USERNAME_OFFSET: usize = ID_OFFSET + ID_SIZE;
pub const EMAIL_OFFSET: usize = USERNAME_OFFSET + USERNAME_SIZE;

pub const ROW_SIZE: usize = ID_SIZE + USERNAME_SIZE + EMAIL_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: u32,
    pub username: String,
    pub email: String,
}

impl Row {
    pub fn new(id: u32, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
        }
    }

    /// Writes the fixed-width representation into `out`.
    pub fn serialize(&self, out: &mut [u8]) -> Result<()> {
        ensure!(
            out.len() == ROW_SIZE,
            "row buffer must be exactly {} bytes, got {}",
            ROW_SIZE,
            out.len()
        );
        ensure!(
            self.username.len() <= USERNAME_SIZE,
            "username exceeds {} bytes",
            USERNAME_SIZE
        );
        ensure!(
            self.email.len() <= EMAIL_SIZE,
            "email exceeds {} bytes",
            EMAIL_SIZE
        );

        out.fill(0);
        out[ID_OFFSET..USERNAME_OFFSET].copy_from_slice(&self.id.to_le_bytes());
        out[USERNAME_OFFSET..USERNAME_OFFSET + self.username.len()]
            .copy_from_slice(self.username.as_bytes());
        out[EMAIL_OFFSET..EMAIL_OFFSET + self.email.len()].copy_from_slice(self.email.as_bytes());
        Ok(())
    }

    pub fn deserialize(data: &[u8]) -> Result<Self> {
        ensure!(
            data.len() == ROW_SIZE,
            "row buffer must be exactly {} bytes, got {}",
            ROW_SIZE,
            data.len()
        );

        let id = u32::from_le_bytes(data[ID_OFFSET..USERNAME_OFFSET].try_into()?);
        let username = padded_str(&data[USERNAME_OFFSET..EMAIL_OFFSET])?;
        let email = padded_str(&data[EMAIL_OFFSET..ROW_SIZE])?;

        Ok(Self {
            id,
            username,
            email,
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.id, self.username, self.email)
    }
}

/// Decodes a zero-padded text field, stopping at the first NUL.
fn padded_str(bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    let text = std::str::from_utf8(&bytes[..end]).wrap_err("invalid utf-8 in stored row")?;
    Ok(text.to_string())
}
