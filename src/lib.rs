//! Reader for OpenSignals recordings.
//!
//! Text (`.txt`) and HDF5 (`.h5`) recordings are parsed into one normalized
//! header schema and loaded into a [`Dataset`] keyed by device id and
//! channel label (`"CH1"`, `"CH2"`, ...). EDF recordings are recognised but
//! rejected with [`LoadError::UnsupportedFormat`].
//!
//! ```no_run
//! use std::path::Path;
//! use opensignals_reader::{load, LoadOptions, Selection};
//!
//! # fn main() -> Result<(), opensignals_reader::LoadError> {
//! let selection = Selection::devices([("00:07:80:3B:46:61", vec![1, 2])]);
//! let loaded = load(Path::new("recording.txt"), &selection, &LoadOptions::default())?;
//! let ecg = loaded.dataset.channel("00:07:80:3B:46:61", 1);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod error;

pub use config::{LoadOptions, TextOptions};
pub use data::detect::{detect, Format};
pub use data::loader::{load, load_all, read_header, read_header_with, Loaded};
pub use data::model::{
    channel_label, ChannelData, ColumnLocator, Dataset, DeviceHeader, FileHeader, SensorId,
};
pub use data::selection::{DeviceSelection, ResolvedDevice, Selection};
pub use data::summary::SampleSummary;
pub use error::{ErrorKind, LoadError, LoadResult, SelectionField};
