use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use log::{debug, trace};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

use super::detect::Format;
use super::model::{ColumnLocator, Dataset, DeviceHeader, FileHeader, SensorId};
use super::selection::ResolvedDevice;
use crate::config::TextOptions;
use crate::error::{LoadError, LoadResult};

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Per-device record of the header line, as OpenSignals writes it:
///
/// ```json
/// {"00:07:80:3B:46:61": {"sensor": ["ECG", "EMG"], "channels": [1, 2],
///   "column": ["nSeq", "I1", "I2", "O1", "O2", "A1", "A2"],
///   "label": ["A1", "A2"], "sampling rate": 1000, "resolution": [4, 1, 1, 1, 1, 16, 16],
///   "date": "2018-11-7", "time": "10:32:14.254", "comments": "",
///   "special": [{}, {}], "position": 0, "mode": 0, ...}}
/// ```
///
/// Only the fields below are read; `special`, `position`, `mode` and anything
/// else the software adds are ignored.
#[derive(Debug, Deserialize)]
struct RawTextDevice {
    sensor: Vec<SensorId>,
    channels: Vec<u32>,
    #[serde(rename = "sampling rate")]
    sampling_rate: f64,
    #[serde(default)]
    resolution: Vec<u32>,
    #[serde(default)]
    date: String,
    #[serde(default)]
    time: String,
    #[serde(default)]
    comments: String,
    /// Names of every column this device contributes to the data matrix.
    column: Vec<String>,
    /// Column name of each entry of `channels`.
    label: Vec<String>,
    #[serde(default)]
    device: Option<String>,
    #[serde(rename = "device name", default)]
    device_name: Option<String>,
    #[serde(rename = "device connection", default)]
    device_connection: Option<String>,
    #[serde(rename = "firmware version", default)]
    firmware_version: Option<i64>,
    #[serde(rename = "sync interval", default)]
    sync_interval: Option<i64>,
    #[serde(rename = "digital IO", default)]
    digital_io: Vec<i64>,
}

impl RawTextDevice {
    /// Build the normalized header. `offset` is the number of matrix columns
    /// occupied by the devices before this one.
    fn into_header(self, id: String, offset: usize) -> Result<DeviceHeader, String> {
        let mut column_labels = BTreeMap::new();
        for (i, &channel) in self.channels.iter().enumerate() {
            let label = self.label.get(i).ok_or_else(|| {
                format!(
                    "device {id}: channel {channel} has no entry in 'label' ({} labels for {} channels)",
                    self.label.len(),
                    self.channels.len()
                )
            })?;
            let local = self
                .column
                .iter()
                .position(|c| c == label)
                .ok_or_else(|| format!("device {id}: label '{label}' is not one of its columns"))?;
            column_labels.insert(channel, ColumnLocator::Column(offset + local));
        }

        Ok(DeviceHeader {
            id,
            sensors: self.sensor,
            channels: self.channels,
            sampling_rate: self.sampling_rate,
            resolution: self.resolution,
            date: self.date,
            time: self.time,
            comments: self.comments,
            column_labels,
            device: self.device,
            device_name: self.device_name,
            device_connection: self.device_connection,
            firmware_version: self.firmware_version,
            sync_interval: self.sync_interval,
            digital_io: self.digital_io,
        })
    }
}

/// Read the header of an OpenSignals text recording.
///
/// The header is the JSON object on the second line, after the comment marker.
pub fn read_header(path: &Path, opts: &TextOptions) -> LoadResult<FileHeader> {
    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let mut lines = BufReader::new(file).lines();

    let line = match lines.nth(1) {
        Some(Ok(line)) => line,
        Some(Err(e)) if e.kind() == io::ErrorKind::InvalidData => {
            return Err(LoadError::header_caused_by(path, "header line is not valid UTF-8", e))
        }
        Some(Err(e)) => return Err(LoadError::io(path, e)),
        None => return Err(LoadError::header(path, "file has no header line")),
    };
    parse_header_line(path, &line, opts)
}

fn parse_header_line(path: &Path, line: &str, opts: &TextOptions) -> LoadResult<FileHeader> {
    let prefix = opts.header_prefix();
    let (_, literal) = line.split_once(prefix.as_str()).ok_or_else(|| {
        LoadError::header(path, format!("second line does not start with '{prefix}'"))
    })?;

    let root: Map<String, JsonValue> = serde_json::from_str(literal.trim_end())
        .map_err(|e| LoadError::header_caused_by(path, "header is not a JSON object", e))?;

    // Devices sit side by side in the data matrix, so each one's columns start
    // where the previous device's columns end.
    let (devices, width) = root.into_iter().try_fold(
        (Vec::new(), 0usize),
        |(mut devices, offset), (id, value)| {
            let raw: RawTextDevice = serde_json::from_value(value).map_err(|e| {
                LoadError::header_caused_by(path, format!("device {id}: invalid fields"), e)
            })?;
            let width = raw.column.len();
            let header = raw
                .into_header(id, offset)
                .map_err(|msg| LoadError::header(path, msg))?;
            header.check().map_err(|msg| LoadError::header(path, msg))?;
            devices.push(header);
            Ok::<_, LoadError>((devices, offset + width))
        },
    )?;

    if devices.is_empty() {
        return Err(LoadError::header(path, "header lists no devices"));
    }
    debug!(
        "{}: {} device(s), {width} data columns",
        path.display(),
        devices.len()
    );
    Ok(FileHeader::new(Format::Text, devices))
}

// ---------------------------------------------------------------------------
// Samples
// ---------------------------------------------------------------------------

/// One requested channel and the matrix column holding it.
struct Target<'a> {
    device: &'a str,
    channel: u32,
    column: usize,
}

/// Read the requested channels of a text recording in a single pass over
/// the sample rows.
pub fn extract(
    path: &Path,
    header: &FileHeader,
    plan: &[ResolvedDevice],
    opts: &TextOptions,
) -> LoadResult<Dataset> {
    let mut dataset = Dataset::new();
    let mut targets = Vec::new();
    for entry in plan {
        dataset.ensure_device(&entry.device);
        let dev = header.device(&entry.device).ok_or_else(|| {
            LoadError::extraction(&entry.device, 0, "device is not in the header")
        })?;
        for &channel in &entry.channels {
            let column = match dev.locator(channel) {
                Some(ColumnLocator::Column(column)) => *column,
                Some(other) => {
                    return Err(LoadError::extraction(
                        &entry.device,
                        channel,
                        format!("{other} is not a text column"),
                    ))
                }
                None => {
                    return Err(LoadError::extraction(
                        &entry.device,
                        channel,
                        "channel has no column label",
                    ))
                }
            };
            targets.push(Target {
                device: &entry.device,
                channel,
                column,
            });
        }
    }

    let Some(first) = targets.first() else {
        return Ok(dataset);
    };
    let row_error = |message: String| LoadError::extraction(first.device, first.channel, message);

    let delimiter = ascii_byte(opts.delimiter)
        .ok_or_else(|| row_error(format!("delimiter {:?} is not ASCII", opts.delimiter)))?;
    let comment = ascii_byte(opts.comment_marker).ok_or_else(|| {
        row_error(format!("comment marker {:?} is not ASCII", opts.comment_marker))
    })?;

    let file = File::open(path).map_err(|e| LoadError::io(path, e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .comment(Some(comment))
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let mut columns: Vec<Vec<f64>> = targets.iter().map(|_| Vec::new()).collect();
    let mut expected_width = None;
    let rows = reader
        .records()
        .skip(opts.skip_rows)
        .take(opts.max_rows.unwrap_or(usize::MAX));

    for (row_no, result) in rows.enumerate() {
        let record = result.map_err(|e| {
            LoadError::extraction_caused_by(
                first.device,
                first.channel,
                format!("data row {row_no} is unreadable"),
                e,
            )
        })?;

        // OpenSignals ends each row with a delimiter; drop the empty tail.
        let width = (0..record.len())
            .rev()
            .find(|&i| !record[i].is_empty())
            .map_or(0, |last| last + 1);
        if width == 0 {
            continue;
        }
        match expected_width {
            None => expected_width = Some(width),
            Some(w) if w != width => {
                return Err(row_error(format!(
                    "data row {row_no} has {width} columns, expected {w}"
                )))
            }
            Some(_) => {}
        }

        for (target, samples) in targets.iter().zip(columns.iter_mut()) {
            let cell = record
                .get(target.column)
                .filter(|_| target.column < width)
                .ok_or_else(|| {
                    LoadError::extraction(
                        target.device,
                        target.channel,
                        format!("data row {row_no} has no column {}", target.column),
                    )
                })?;
            let value = cell.parse::<f64>().map_err(|e| {
                LoadError::extraction_caused_by(
                    target.device,
                    target.channel,
                    format!("data row {row_no}, column {}: '{cell}' is not a number", target.column),
                    e,
                )
            })?;
            samples.push(value);
        }
    }

    for (target, samples) in targets.iter().zip(columns) {
        trace!(
            "{}/CH{}: {} samples from column {}",
            target.device,
            target.channel,
            samples.len(),
            target.column
        );
        dataset.insert(target.device, target.channel, samples);
    }
    Ok(dataset)
}

fn ascii_byte(c: char) -> Option<u8> {
    if c.is_ascii() {
        Some(c as u8)
    } else {
        None
    }
}
