//! Error types for loading OpenSignals recordings.
//!
//! Every failure of a load call maps to exactly one [`LoadError`] variant:
//!
//! - **`Io`**: the file could not be opened or read.
//! - **`UnsupportedFormat`**: the detected tag has no parser, matches the
//!   declared-unsupported EDF format, or needs a cargo feature that is off.
//! - **`HeaderParse`**: the metadata block is missing or malformed.
//! - **`Selection`**: the caller's device/channel selection has the wrong
//!   shape or names something the file does not contain.
//! - **`Extraction`**: reading or decoding sample data failed.
//!
//! Nothing is retried and there is no partial result: the first error aborts
//! the call.

use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type LoadResult<T> = std::result::Result<T, LoadError>;

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unsupported file format '{tag}': {reason}")]
    UnsupportedFormat { tag: String, reason: String },

    #[error("malformed header in {}: {message}", .path.display())]
    HeaderParse {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("invalid selection ({field}): {message}")]
    Selection {
        field: SelectionField,
        message: String,
    },

    #[error("failed to extract {device}/CH{channel}: {message}")]
    Extraction {
        device: String,
        channel: u32,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

/// Category of a [`LoadError`], for callers that only need to branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    UnsupportedFormat,
    HeaderParse,
    Selection,
    Extraction,
}

/// Which side of a selection was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionField {
    Devices,
    Channels,
    /// A channel list belonging to one particular device.
    DeviceChannels(String),
    /// The selection document itself, before either side is known.
    Input,
}

impl fmt::Display for SelectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionField::Devices => write!(f, "devices"),
            SelectionField::Channels => write!(f, "channels"),
            SelectionField::DeviceChannels(device) => write!(f, "channels of {device}"),
            SelectionField::Input => write!(f, "selection input"),
        }
    }
}

impl LoadError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::Io { .. } => ErrorKind::Io,
            LoadError::UnsupportedFormat { .. } => ErrorKind::UnsupportedFormat,
            LoadError::HeaderParse { .. } => ErrorKind::HeaderParse,
            LoadError::Selection { .. } => ErrorKind::Selection,
            LoadError::Extraction { .. } => ErrorKind::Extraction,
        }
    }

    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        LoadError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn unsupported(tag: &str, reason: impl Into<String>) -> Self {
        LoadError::UnsupportedFormat {
            tag: tag.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn header(path: &Path, message: impl Into<String>) -> Self {
        LoadError::HeaderParse {
            path: path.to_path_buf(),
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn header_caused_by<E>(path: &Path, message: impl Into<String>, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        LoadError::HeaderParse {
            path: path.to_path_buf(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn selection(field: SelectionField, message: impl Into<String>) -> Self {
        LoadError::Selection {
            field,
            message: message.into(),
        }
    }

    pub(crate) fn extraction(device: &str, channel: u32, message: impl Into<String>) -> Self {
        LoadError::Extraction {
            device: device.to_string(),
            channel,
            message: message.into(),
            source: None,
        }
    }

    pub(crate) fn extraction_caused_by<E>(
        device: &str,
        channel: u32,
        message: impl Into<String>,
        source: E,
    ) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        LoadError::Extraction {
            device: device.to_string(),
            channel,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}
