// ayc-vm - Bytecode compiler and virtual machine for the ayc programming language
// Copyright (c) 2025 Tom Waddington. MIT licensed.

//! Reading and writing `.aycb` bytecode files.
//!
//! A file is a 4-byte magic, a little-endian u32 format version, and the
//! bincode encoding of the instruction vector. Version 1 files used the
//! old stack-return calling convention and are rejected as incompatible.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::program::Program;

const MAGIC: [u8; 4] = *b"AYCB";

/// Current bytecode format version.
pub const FORMAT_VERSION: u32 = 2;

/// File extension for compiled bytecode.
pub const EXTENSION: &str = "aycb";

/// Error reading or writing a bytecode file.
#[derive(Debug)]
pub enum BytecodeError {
    /// Underlying filesystem failure.
    Io(String),
    /// The file does not start with the bytecode magic.
    BadMagic,
    /// The file's format version is not supported.
    UnsupportedVersion(u32),
    /// The instruction vector could not be encoded.
    Encode(String),
    /// The instruction vector could not be decoded.
    Decode(String),
}

impl fmt::Display for BytecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BytecodeError::Io(msg) => write!(f, "IOError: {}", msg),
            BytecodeError::BadMagic => write!(f, "IOError: not an ayc bytecode file"),
            BytecodeError::UnsupportedVersion(1) => write!(
                f,
                "IOError: bytecode format version 1 uses an incompatible calling convention"
            ),
            BytecodeError::UnsupportedVersion(v) => {
                write!(f, "IOError: unsupported bytecode format version {}", v)
            }
            BytecodeError::Encode(msg) => write!(f, "IOError: encoding bytecode: {}", msg),
            BytecodeError::Decode(msg) => write!(f, "IOError: decoding bytecode: {}", msg),
        }
    }
}

impl std::error::Error for BytecodeError {}

/// Result type for bytecode serialization.
pub type Result<T> = std::result::Result<T, BytecodeError>;

/// Serialize a program to bytes.
pub fn to_bytes(program: &Program) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    let body = bincode::serialize(&program.instructions)
        .map_err(|e| BytecodeError::Encode(e.to_string()))?;
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Deserialize a program from bytes.
pub fn from_bytes(bytes: &[u8]) -> Result<Program> {
    if bytes.len() < 8 || bytes[..4] != MAGIC {
        return Err(BytecodeError::BadMagic);
    }
    let version = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    if version != FORMAT_VERSION {
        return Err(BytecodeError::UnsupportedVersion(version));
    }
    let instructions =
        bincode::deserialize(&bytes[8..]).map_err(|e| BytecodeError::Decode(e.to_string()))?;
    Ok(Program::new(instructions))
}

/// Write a program to a bytecode file, appending the `.aycb` extension
/// when absent. Returns the path actually written.
pub fn write_file(path: &Path, program: &Program) -> Result<PathBuf> {
    let path = ensure_extension(path);
    let bytes = to_bytes(program)?;
    fs::write(&path, bytes).map_err(|e| BytecodeError::Io(e.to_string()))?;
    Ok(path)
}

/// Read a program from a bytecode file.
pub fn read_file(path: &Path) -> Result<Program> {
    let bytes = fs::read(path).map_err(|e| BytecodeError::Io(e.to_string()))?;
    from_bytes(&bytes)
}

fn ensure_extension(path: &Path) -> PathBuf {
    if path.extension().and_then(|e| e.to_str()) == Some(EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}
