//! Fixture recordings shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::{json, Map, Value as JsonValue};

/// Sample of `channel` of the `device_index`-th device at `row`.
pub fn sample(device_index: usize, channel: u32, row: usize) -> f64 {
    (device_index * 1000 + channel as usize * 100 + row) as f64
}

/// Text recording in OpenSignals layout. Each device gets the columns
/// `nSeq`, `I1` and one `A<ch>` per channel, ascending by channel.
pub fn text_recording(devices: &[(&str, &[u32])], rows: usize) -> String {
    let mut header = Map::new();
    for (position, (id, channels)) in devices.iter().enumerate() {
        let mut sorted = channels.to_vec();
        sorted.sort_unstable();
        let mut columns = vec!["nSeq".to_string(), "I1".to_string()];
        columns.extend(sorted.iter().map(|ch| format!("A{ch}")));

        header.insert(
            id.to_string(),
            json!({
                "sensor": channels.iter().map(|_| "RAW").collect::<Vec<_>>(),
                "device name": id,
                "column": columns,
                "sync interval": 2,
                "time": "10:32:14.254",
                "comments": "",
                "channels": channels,
                "date": "2018-11-7",
                "mode": 0,
                "digital IO": [0, 1],
                "firmware version": 772,
                "device": "biosignalsplux",
                "position": position,
                "sampling rate": 1000,
                "label": channels.iter().map(|ch| format!("A{ch}")).collect::<Vec<_>>(),
                "resolution": [4, 1, 16, 16],
                "special": channels.iter().map(|_| json!({})).collect::<Vec<_>>(),
            }),
        );
    }

    let mut out = String::new();
    out.push_str("# OpenSignals Text File Format\n");
    out.push_str(&format!("# {}\n", JsonValue::Object(header)));
    out.push_str("# EndOfHeader\n");
    for row in 0..rows {
        for (d, (_, channels)) in devices.iter().enumerate() {
            let mut sorted = channels.to_vec();
            sorted.sort_unstable();
            out.push_str(&format!("{}\t0\t", row % 16));
            for ch in sorted {
                out.push_str(&format!("{}\t", sample(d, ch, row)));
            }
        }
        out.push('\n');
    }
    out
}

pub fn write(dir: &Path, name: &str, contents: impl AsRef<[u8]>) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

/// Shape of an HDF5 fixture.
#[cfg(feature = "hdf5")]
#[derive(Debug, Clone, Copy)]
pub struct H5Layout {
    /// Store channels as `(rows / 2, 2)` blocks instead of `(rows, 1)`.
    pub blocked: bool,
    /// Write `duration`, `nsamples`, `macaddress` and `keywords`.
    pub volatile_attrs: bool,
    /// Write the `raw` group below each device.
    pub raw_group: bool,
    /// Channel listed in `channels` whose dataset is left out.
    pub missing_dataset: Option<u32>,
}

#[cfg(feature = "hdf5")]
impl Default for H5Layout {
    fn default() -> Self {
        Self {
            blocked: false,
            volatile_attrs: true,
            raw_group: true,
            missing_dataset: None,
        }
    }
}

/// HDF5 recording in OpenSignals layout. Channel `ch` of device `d` is a
/// `(rows / 2, 2)` block when `blocked` is set, `(rows, 1)` otherwise.
#[cfg(feature = "hdf5")]
pub fn write_h5_recording(path: &Path, devices: &[(&str, &[u32])], rows: usize, blocked: bool) {
    write_h5_with(
        path,
        devices,
        rows,
        H5Layout {
            blocked,
            ..H5Layout::default()
        },
    );
}

#[cfg(feature = "hdf5")]
pub fn write_h5_with(path: &Path, devices: &[(&str, &[u32])], rows: usize, layout: H5Layout) {
    use hdf5::types::VarLenUnicode;

    let text = |s: &str| s.parse::<VarLenUnicode>().unwrap();
    let file = hdf5::File::create(path).unwrap();
    for (d, (id, channels)) in devices.iter().enumerate() {
        let group = file.create_group(id).unwrap();
        group
            .new_attr::<u32>()
            .shape(channels.len())
            .create("channels")
            .unwrap()
            .write_raw(*channels)
            .unwrap();
        group
            .new_attr::<u32>()
            .create("sampling rate")
            .unwrap()
            .write_scalar(&1000u32)
            .unwrap();
        group
            .new_attr::<u32>()
            .shape(channels.len())
            .create("resolution")
            .unwrap()
            .write_raw(&vec![16u32; channels.len()])
            .unwrap();
        group
            .new_attr::<u32>()
            .create("firmware version")
            .unwrap()
            .write_scalar(&772u32)
            .unwrap();
        let mut strings = vec![
            ("date", "2018-11-7"),
            ("time", "10:32:14.254"),
            ("comments", "fixture"),
            ("device", "biosignalsplux"),
        ];
        if layout.volatile_attrs {
            // Volatile attributes the reader must ignore.
            group
                .new_attr::<f64>()
                .create("duration")
                .unwrap()
                .write_scalar(&1.5f64)
                .unwrap();
            group
                .new_attr::<u32>()
                .create("nsamples")
                .unwrap()
                .write_scalar(&(rows as u32))
                .unwrap();
            strings.push(("macaddress", *id));
            strings.push(("keywords", "a b c"));
        }
        for (key, value) in strings {
            group
                .new_attr::<VarLenUnicode>()
                .create(key)
                .unwrap()
                .write_scalar(&text(value))
                .unwrap();
        }

        if !layout.raw_group {
            continue;
        }
        let raw = group.create_group("raw").unwrap();
        for &ch in channels.iter() {
            if layout.missing_dataset == Some(ch) {
                continue;
            }
            let samples: Vec<f64> = (0..rows).map(|r| sample(d, ch, r)).collect();
            let shape = if layout.blocked { (rows / 2, 2) } else { (rows, 1) };
            let ds = raw
                .new_dataset::<f64>()
                .shape(shape)
                .create(format!("channel_{ch}").as_str())
                .unwrap();
            ds.write_raw(&samples).unwrap();
            ds.new_attr::<VarLenUnicode>()
                .create("sensor")
                .unwrap()
                .write_scalar(&text(&format!("SENSOR{ch}")))
                .unwrap();
        }
    }
}
