//! Wire protocol of the control socket.
//!
//! Every integer is a little-endian `i32`. A connection carries exactly one
//! request: the request code, then its arguments. The reply is a status code;
//! a successful `LsList` follows it with `package|process` records and a
//! zero-length terminator.
//!
//! | Request  | Arguments              | Reply                          |
//! |----------|------------------------|--------------------------------|
//! | Enable   | late props (bool)      | status                         |
//! | Disable  |                        | status                         |
//! | AddList  | package, process (str) | status                         |
//! | RmList   | package, process (str) | status                         |
//! | LsList   |                        | status, records..., 0          |
//! | Status   |                        | `IsEnabled` / `NotEnabled`     |

use std::fmt;
use std::io::{self, Read, Write};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Largest string accepted on the wire, in bytes.
pub const MAX_STRING_LEN: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestCode {
    Enable = 0,
    Disable = 1,
    AddList = 2,
    RmList = 3,
    LsList = 4,
    Status = 5,
}

impl TryFrom<i32> for RequestCode {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, Self::Error> {
        Ok(match code {
            0 => RequestCode::Enable,
            1 => RequestCode::Disable,
            2 => RequestCode::AddList,
            3 => RequestCode::RmList,
            4 => RequestCode::LsList,
            5 => RequestCode::Status,
            other => return Err(other),
        })
    }
}

/// Reply codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Error = -1,
    Success = 0,
    RootRequired = 1,
    IsEnabled = 2,
    NotEnabled = 3,
    ItemExists = 4,
    ItemNotExist = 5,
    NoNamespace = 6,
    InvalidPackage = 7,
}

impl Status {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for Status {
    type Error = i32;

    fn try_from(code: i32) -> Result<Self, <Self as TryFrom<i32>>::Error> {
        Ok(match code {
            -1 => Status::Error,
            0 => Status::Success,
            1 => Status::RootRequired,
            2 => Status::IsEnabled,
            3 => Status::NotEnabled,
            4 => Status::ItemExists,
            5 => Status::ItemNotExist,
            6 => Status::NoNamespace,
            7 => Status::InvalidPackage,
            other => return Err(other),
        })
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Status::Error => "Daemon error",
            Status::Success => "Success",
            Status::RootRequired => "Root access required",
            Status::IsEnabled => "Hiding is enabled",
            Status::NotEnabled => "Hiding is not enabled",
            Status::ItemExists => "Target already exists in hide list",
            Status::ItemNotExist => "Target does not exist in hide list",
            Status::NoNamespace => "Kernel does not support mount namespaces",
            Status::InvalidPackage => "Invalid package name",
        };
        f.write_str(msg)
    }
}

fn too_long(len: i32) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("string length {} out of range (max {})", len, MAX_STRING_LEN),
    )
}

fn checked_len(len: i32) -> io::Result<usize> {
    match usize::try_from(len) {
        Ok(len) if len <= MAX_STRING_LEN => Ok(len),
        _ => Err(too_long(len)),
    }
}

fn decode_string(buf: Vec<u8>) -> io::Result<String> {
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn encoded_len(s: &str) -> io::Result<i32> {
    if s.len() > MAX_STRING_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("string of {} bytes exceeds {}", s.len(), MAX_STRING_LEN),
        ));
    }
    // Bounded by MAX_STRING_LEN above
    Ok(s.len() as i32)
}

// Async side, used by the daemon

pub async fn read_i32<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<i32> {
    reader.read_i32_le().await
}

pub async fn write_i32<W: AsyncWrite + Unpin>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_i32_le(value).await
}

pub async fn read_bool<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<bool> {
    Ok(read_i32(reader).await? != 0)
}

pub async fn read_string<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<String> {
    let len = checked_len(read_i32(reader).await?)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    decode_string(buf)
}

pub async fn write_string<W: AsyncWrite + Unpin>(writer: &mut W, s: &str) -> io::Result<()> {
    write_i32(writer, encoded_len(s)?).await?;
    writer.write_all(s.as_bytes()).await
}

// Blocking side, used by the CLI client

pub fn read_i32_sync<R: Read>(reader: &mut R) -> io::Result<i32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

pub fn write_i32_sync<W: Write>(writer: &mut W, value: i32) -> io::Result<()> {
    writer.write_all(&value.to_le_bytes())
}

pub fn write_bool_sync<W: Write>(writer: &mut W, value: bool) -> io::Result<()> {
    write_i32_sync(writer, i32::from(value))
}

pub fn read_string_sync<R: Read>(reader: &mut R) -> io::Result<String> {
    let len = checked_len(read_i32_sync(reader)?)?;
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf)?;
    decode_string(buf)
}

pub fn write_string_sync<W: Write>(writer: &mut W, s: &str) -> io::Result<()> {
    write_i32_sync(writer, encoded_len(s)?)?;
    writer.write_all(s.as_bytes())
}
