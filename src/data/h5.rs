//! HDF5 recordings.
//!
//! Layout written by OpenSignals:
//!
//! ```text
//! /<device id>                 group, attributes = device metadata
//! /<device id>/raw/channel_<n> samples of channel n, attribute "sensor"
//! ```
//!
//! Needs the `hdf5` cargo feature; without it both entry points fail with
//! [`crate::LoadError::UnsupportedFormat`].

use std::path::Path;

use super::model::{Dataset, FileHeader};
use super::selection::ResolvedDevice;
use crate::error::LoadResult;

/// Group below each device that holds the channel datasets.
pub const RAW_GROUP: &str = "raw";

/// Dataset name of a channel below [`RAW_GROUP`].
pub fn channel_dataset_name(channel: u32) -> String {
    format!("channel_{channel}")
}

#[cfg(feature = "hdf5")]
pub fn read_header(path: &Path) -> LoadResult<FileHeader> {
    imp::read_header(path)
}

#[cfg(feature = "hdf5")]
pub fn extract(path: &Path, header: &FileHeader, plan: &[ResolvedDevice]) -> LoadResult<Dataset> {
    imp::extract(path, header, plan)
}

#[cfg(not(feature = "hdf5"))]
pub fn read_header(_path: &Path) -> LoadResult<FileHeader> {
    Err(feature_disabled())
}

#[cfg(not(feature = "hdf5"))]
pub fn extract(_path: &Path, _header: &FileHeader, _plan: &[ResolvedDevice]) -> LoadResult<Dataset> {
    Err(feature_disabled())
}

#[cfg(not(feature = "hdf5"))]
fn feature_disabled() -> crate::error::LoadError {
    crate::error::LoadError::unsupported(
        "h5",
        "HDF5 support is not enabled. Please build with --features hdf5",
    )
}

#[cfg(feature = "hdf5")]
mod imp {
    use std::collections::BTreeMap;
    use std::path::Path;

    use hdf5::types::{FixedAscii, VarLenAscii, VarLenUnicode};
    use hdf5::{Attribute, File, Group};
    use log::{debug, trace};

    use super::{channel_dataset_name, RAW_GROUP};
    use crate::data::detect::Format;
    use crate::data::model::{ColumnLocator, Dataset, DeviceHeader, FileHeader, SensorId};
    use crate::data::selection::ResolvedDevice;
    use crate::error::{LoadError, LoadResult};

    /// A missing file is an I/O error; what the HDF5 library rejects is
    /// mapped by `rejected`, since its meaning depends on the stage.
    fn open(path: &Path, rejected: impl FnOnce(hdf5::Error) -> LoadError) -> LoadResult<File> {
        std::fs::metadata(path).map_err(|e| LoadError::io(path, e))?;
        File::open(path).map_err(rejected)
    }

    pub(super) fn read_header(path: &Path) -> LoadResult<FileHeader> {
        let file = open(path, |e| {
            LoadError::header_caused_by(path, "not a readable HDF5 file", e)
        })?;
        let ids = file
            .member_names()
            .map_err(|e| LoadError::header_caused_by(path, "cannot list device groups", e))?;

        let mut devices = Vec::with_capacity(ids.len());
        for id in ids {
            let group = file.group(&id).map_err(|e| {
                LoadError::header_caused_by(path, format!("{id} is not a device group"), e)
            })?;
            let header = read_device(path, &id, &group)?;
            header.check().map_err(|msg| LoadError::header(path, msg))?;
            devices.push(header);
        }

        if devices.is_empty() {
            return Err(LoadError::header(path, "file contains no device groups"));
        }
        debug!("{}: {} device(s)", path.display(), devices.len());
        Ok(FileHeader::new(Format::Hdf5, devices))
    }

    /// Copy the recognised attributes of a device group into the schema.
    /// Volatile attributes (`duration`, `nsamples`, `macaddress`, ...) are
    /// never read.
    fn read_device(path: &Path, id: &str, group: &Group) -> LoadResult<DeviceHeader> {
        let present = group
            .attr_names()
            .map_err(|e| LoadError::header_caused_by(path, format!("{id}: cannot list attributes"), e))?;
        let attrs = DeviceAttrs { path, id, group, present };

        let channels: Vec<u32> = attrs.required("channels", |a| a.read_raw::<u32>())?;
        let sampling_rate: f64 = attrs.required("sampling rate", |a| a.read_scalar::<f64>())?;
        let resolution = attrs
            .optional("resolution", |a| a.read_raw::<u32>())?
            .unwrap_or_default();

        let raw = group.group(RAW_GROUP).map_err(|e| {
            LoadError::header_caused_by(path, format!("{id}: missing '{RAW_GROUP}' group"), e)
        })?;

        let mut sensors = Vec::with_capacity(channels.len());
        let mut column_labels = BTreeMap::new();
        for &channel in &channels {
            let name = channel_dataset_name(channel);
            let sensor = raw
                .dataset(&name)
                .and_then(|ds| ds.attr("sensor"))
                .and_then(|attr| read_sensor(&attr))
                .map_err(|e| {
                    LoadError::header_caused_by(
                        path,
                        format!("{id}: cannot read sensor of {RAW_GROUP}/{name}"),
                        e,
                    )
                })?;
            sensors.push(sensor);
            column_labels.insert(channel, ColumnLocator::Dataset(name));
        }

        Ok(DeviceHeader {
            id: id.to_string(),
            sensors,
            channels,
            sampling_rate,
            resolution,
            date: attrs.optional("date", read_string)?.unwrap_or_default(),
            time: attrs.optional("time", read_string)?.unwrap_or_default(),
            comments: attrs.optional("comments", read_string)?.unwrap_or_default(),
            column_labels,
            device: attrs.optional("device", read_string)?,
            device_name: attrs.optional("device name", read_string)?,
            device_connection: attrs.optional("device connection", read_string)?,
            firmware_version: attrs.optional("firmware version", |a| a.read_scalar::<i64>())?,
            sync_interval: attrs.optional("sync interval", |a| a.read_scalar::<i64>())?,
            digital_io: attrs
                .optional("digital IO", |a| a.read_raw::<i64>())?
                .unwrap_or_default(),
        })
    }

    struct DeviceAttrs<'a> {
        path: &'a Path,
        id: &'a str,
        group: &'a Group,
        present: Vec<String>,
    }

    impl DeviceAttrs<'_> {
        fn required<T>(
            &self,
            key: &str,
            read: impl Fn(&Attribute) -> hdf5::Result<T>,
        ) -> LoadResult<T> {
            self.optional(key, read)?.ok_or_else(|| {
                LoadError::header(self.path, format!("{}: missing attribute '{key}'", self.id))
            })
        }

        fn optional<T>(
            &self,
            key: &str,
            read: impl Fn(&Attribute) -> hdf5::Result<T>,
        ) -> LoadResult<Option<T>> {
            if !self.present.iter().any(|name| name == key) {
                return Ok(None);
            }
            self.group
                .attr(key)
                .and_then(|attr| read(&attr))
                .map(Some)
                .map_err(|e| {
                    LoadError::header_caused_by(
                        self.path,
                        format!("{}: unreadable attribute '{key}'", self.id),
                        e,
                    )
                })
        }
    }

    fn read_string(attr: &Attribute) -> hdf5::Result<String> {
        if let Ok(s) = attr.read_scalar::<VarLenUnicode>() {
            return Ok(s.as_str().to_owned());
        }
        if let Ok(s) = attr.read_scalar::<VarLenAscii>() {
            return Ok(s.as_str().to_owned());
        }
        attr.read_scalar::<FixedAscii<256>>()
            .map(|s| s.as_str().to_owned())
    }

    fn read_sensor(attr: &Attribute) -> hdf5::Result<SensorId> {
        match read_string(attr) {
            Ok(name) => Ok(SensorId::Name(name)),
            Err(_) => attr.read_scalar::<i64>().map(SensorId::Code),
        }
    }

    pub(super) fn extract(
        path: &Path,
        header: &FileHeader,
        plan: &[ResolvedDevice],
    ) -> LoadResult<Dataset> {
        let mut dataset = Dataset::new();
        for entry in plan {
            dataset.ensure_device(&entry.device);
        }
        let Some((first_device, first_channel)) = plan
            .iter()
            .find_map(|d| d.channels.first().map(|&ch| (d.device.as_str(), ch)))
        else {
            return Ok(dataset);
        };

        let file = open(path, |e| {
            LoadError::extraction_caused_by(
                first_device,
                first_channel,
                "not a readable HDF5 file",
                e,
            )
        })?;

        for entry in plan {
            let dev = header.device(&entry.device).ok_or_else(|| {
                LoadError::extraction(&entry.device, 0, "device is not in the header")
            })?;

            for &channel in &entry.channels {
                let name = match dev.locator(channel) {
                    Some(ColumnLocator::Dataset(name)) => name,
                    Some(other) => {
                        return Err(LoadError::extraction(
                            &entry.device,
                            channel,
                            format!("{other} is not a dataset name"),
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

                // Channels are stored as (n, 1) blocks; a raw read returns
                // the rows back to back, which is the flattened series.
                let samples = file
                    .group(&entry.device)
                    .and_then(|g| g.group(RAW_GROUP))
                    .and_then(|raw| raw.dataset(name))
                    .and_then(|ds| ds.read_raw::<f64>())
                    .map_err(|e| {
                        LoadError::extraction_caused_by(
                            &entry.device,
                            channel,
                            format!("cannot read {RAW_GROUP}/{name}"),
                            e,
                        )
                    })?;

                trace!("{}/CH{channel}: {} samples", entry.device, samples.len());
                dataset.insert(&entry.device, channel, samples);
            }
        }
        Ok(dataset)
    }
}
