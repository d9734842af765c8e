use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::error::{LoadError, LoadResult};

/// Bytes inspected when sniffing a file without extension.
const SNIFF_LEN: u64 = 512;

const HDF5_SIGNATURE: &[u8] = b"\x89HDF\r\n\x1a\n";
const EDF_SIGNATURE: &[u8] = b"0       ";

// ---------------------------------------------------------------------------
// Format – closed set of containers
// ---------------------------------------------------------------------------

/// Container formats written by OpenSignals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// Tab-separated text with a JSON header line.
    Text,
    /// HDF5, one group per device.
    Hdf5,
    /// European Data Format. Recognised but not readable.
    Edf,
}

impl Format {
    /// Map a format tag (extension or media subtype) to a format.
    ///
    /// Tags are compared as given; `TXT` is not `txt`.
    pub fn from_tag(tag: &str) -> LoadResult<Self> {
        match tag {
            "txt" | "plain" | "bat" => Ok(Format::Text),
            "h5" | "hdf5" | "x-hdf" | "x-hdf5" | "a" => Ok(Format::Hdf5),
            "edf" | "octet-stream" => Ok(Format::Edf),
            other => Err(LoadError::unsupported(
                other,
                "file type does not match any supported OpenSignals format",
            )),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Text => "text",
            Format::Hdf5 => "hdf5",
            Format::Edf => "edf",
        }
    }
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// Return the format tag of a file.
///
/// The extension wins when present. Otherwise the first bytes of the file are
/// sniffed and the subtype of the resulting media type is the tag
/// (`text/plain` → `plain`).
pub fn detect(path: &Path) -> LoadResult<String> {
    if let Some(ext) = path.extension() {
        let tag = ext.to_string_lossy().into_owned();
        debug!("{}: format tag '{tag}' from extension", path.display());
        return Ok(tag);
    }

    let media_type = sniff_media_type(path)?;
    let tag = media_type
        .rsplit('/')
        .next()
        .unwrap_or(media_type)
        .to_string();
    debug!("{}: sniffed {media_type}, format tag '{tag}'", path.display());
    Ok(tag)
}

/// Resolve the format of `path`, honouring an explicit tag when one is given.
pub fn resolve_format(path: &Path, hint: Option<&str>) -> LoadResult<Format> {
    match hint {
        Some(tag) => Format::from_tag(tag),
        None => Format::from_tag(&detect(path)?),
    }
}

/// Media type of a file judged from its leading bytes.
pub fn sniff_media_type(path: &Path) -> LoadResult<&'static str> {
    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let mut head = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN)
        .read_to_end(&mut head)
        .map_err(|e| LoadError::io(path, e))?;
    Ok(media_type_of(&head))
}

fn media_type_of(head: &[u8]) -> &'static str {
    if head.is_empty() {
        return "application/x-empty";
    }
    if head.starts_with(HDF5_SIGNATURE) {
        return "application/x-hdf";
    }
    if head.starts_with(EDF_SIGNATURE) {
        return "application/octet-stream";
    }
    if head.starts_with(b"%PDF-") {
        return "application/pdf";
    }
    if head.starts_with(b"\x89PNG\r\n\x1a\n") {
        return "image/png";
    }
    if head.starts_with(&[0x1f, 0x8b]) {
        return "application/gzip";
    }
    if head.starts_with(b"PK\x03\x04") {
        return "application/zip";
    }
    if looks_like_text(head) {
        return "text/plain";
    }
    "application/octet-stream"
}

/// UTF-8 without NUL bytes. The sniff window may cut a multi-byte character,
/// so an incomplete sequence at the very end is tolerated.
fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none() && head.len() - e.valid_up_to() < 4,
    }
}
