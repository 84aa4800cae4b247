//! Versioned, self-describing snapshot files shared by both stores.
//!
//! Layout: one line of JSON header, then a zstd-compressed JSON body.
//! The header names the format and schema version so a reader can refuse a
//! snapshot written by a newer release before touching the body.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::constants::SNAPSHOT_COMPRESSION_LEVEL;
use crate::errors::{LumenResult, StorageError};

/// First line of every snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub format: String,
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    /// Number of top-level records in the body.
    pub entries: usize,
    /// blake3 of the uncompressed body.
    pub checksum: String,
    pub writer: String,
}

fn corrupted(details: impl Into<String>) -> StorageError {
    StorageError::Corrupted {
        details: details.into(),
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io {
        path: path.display().to_string(),
        message: e.to_string(),
    }
}

/// Encode `body` into snapshot bytes.
pub fn encode<T: Serialize>(
    format: &str,
    schema_version: u32,
    entries: usize,
    body: &T,
) -> LumenResult<(SnapshotHeader, Vec<u8>)> {
    let raw = serde_json::to_vec(body)?;
    let header = SnapshotHeader {
        format: format.to_string(),
        schema_version,
        created_at: Utc::now(),
        entries,
        checksum: blake3::hash(&raw).to_hex().to_string(),
        writer: format!("lumen/{}", crate::constants::LUMEN_VERSION),
    };
    let compressed = zstd::encode_all(raw.as_slice(), SNAPSHOT_COMPRESSION_LEVEL)
        .map_err(|e| corrupted(format!("compression failed: {e}")))?;

    let mut out = serde_json::to_vec(&header)?;
    out.push(b'\n');
    out.extend_from_slice(&compressed);
    Ok((header, out))
}

/// Decode snapshot bytes, checking format, schema version, and checksum.
pub fn decode<T: DeserializeOwned>(
    bytes: &[u8],
    expected_format: &str,
    max_schema_version: u32,
) -> LumenResult<(SnapshotHeader, T)> {
    let mut reader = BufReader::new(bytes);
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|e| corrupted(format!("unreadable header: {e}")))?;
    let header: SnapshotHeader = serde_json::from_str(line.trim_end())
        .map_err(|e| corrupted(format!("invalid header: {e}")))?;

    if header.format != expected_format {
        return Err(StorageError::FormatMismatch {
            expected: expected_format.to_string(),
            found: header.format,
        }
        .into());
    }
    if header.schema_version > max_schema_version {
        return Err(StorageError::UnsupportedSchema {
            format: header.format,
            found: header.schema_version,
            supported: max_schema_version,
        }
        .into());
    }

    let mut compressed = Vec::new();
    reader
        .read_to_end(&mut compressed)
        .map_err(|e| corrupted(format!("unreadable body: {e}")))?;
    let raw = zstd::decode_all(compressed.as_slice())
        .map_err(|e| corrupted(format!("decompression failed: {e}")))?;
    let checksum = blake3::hash(&raw).to_hex().to_string();
    if checksum != header.checksum {
        return Err(corrupted(format!(
            "checksum mismatch: header {}, body {checksum}",
            header.checksum
        ))
        .into());
    }
    let body = serde_json::from_slice(&raw).map_err(|e| corrupted(format!("invalid body: {e}")))?;
    Ok((header, body))
}

/// Write a snapshot to `path` via a temporary sibling file and rename.
pub fn write_file<T: Serialize>(
    path: &Path,
    format: &str,
    schema_version: u32,
    entries: usize,
    body: &T,
) -> LumenResult<SnapshotHeader> {
    let (header, bytes) = encode(format, schema_version, entries, body)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut file = std::fs::File::create(&tmp).map_err(|e| io_error(&tmp, e))?;
        file.write_all(&bytes).map_err(|e| io_error(&tmp, e))?;
        file.sync_all().map_err(|e| io_error(&tmp, e))?;
    }
    std::fs::rename(&tmp, path).map_err(|e| io_error(path, e))?;
    Ok(header)
}

/// Read and validate a snapshot file.
pub fn read_file<T: DeserializeOwned>(
    path: &Path,
    expected_format: &str,
    max_schema_version: u32,
) -> LumenResult<(SnapshotHeader, T)> {
    let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
    decode(&bytes, expected_format, max_schema_version)
}
