use std::path::Path;

use log::{debug, info};

use super::detect::{resolve_format, Format};
use super::model::{Dataset, FileHeader};
use super::selection::Selection;
use super::{h5, text};
use crate::config::{LoadOptions, TextOptions};
use crate::error::{LoadError, LoadResult};

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Result of a load call.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded {
    pub dataset: Dataset,
    /// Present when [`LoadOptions::with_header`] was set.
    pub header: Option<FileHeader>,
}

/// Load the selected devices and channels of a recording.
///
/// Stages run in order and the first failure aborts the call:
/// detect format → parse header → resolve selection → extract samples.
/// The selection is fully checked before any sample is read.
pub fn load(path: &Path, selection: &Selection, opts: &LoadOptions) -> LoadResult<Loaded> {
    let format = resolve_format(path, opts.format_hint.as_deref())?;
    let header = parse_header(path, format, &opts.text)?;
    let plan = selection.resolve(&header)?;

    let dataset = match format {
        Format::Text => text::extract(path, &header, &plan, &opts.text)?,
        Format::Hdf5 => h5::extract(path, &header, &plan)?,
        Format::Edf => return Err(edf_unsupported()),
    };

    info!(
        "{}: loaded {} channel(s) from {} device(s)",
        path.display(),
        plan.iter().map(|d| d.channels.len()).sum::<usize>(),
        dataset.len()
    );

    Ok(Loaded {
        dataset,
        header: opts.with_header.then_some(header),
    })
}

/// Load every channel of every device with default options.
pub fn load_all(path: &Path) -> LoadResult<Dataset> {
    load(path, &Selection::Unspecified, &LoadOptions::default()).map(|loaded| loaded.dataset)
}

/// Read only the header of a recording.
pub fn read_header(path: &Path) -> LoadResult<FileHeader> {
    read_header_with(path, &LoadOptions::default())
}

/// Read only the header, honouring the format hint and text settings.
pub fn read_header_with(path: &Path, opts: &LoadOptions) -> LoadResult<FileHeader> {
    let format = resolve_format(path, opts.format_hint.as_deref())?;
    parse_header(path, format, &opts.text)
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn parse_header(path: &Path, format: Format, text_opts: &TextOptions) -> LoadResult<FileHeader> {
    debug!("{}: reading {} header", path.display(), format.name());
    match format {
        Format::Text => text::read_header(path, text_opts),
        Format::Hdf5 => h5::read_header(path),
        Format::Edf => Err(edf_unsupported()),
    }
}

fn edf_unsupported() -> LoadError {
    LoadError::unsupported(
        "edf",
        "reading EDF recordings is not implemented in this version",
    )
}
