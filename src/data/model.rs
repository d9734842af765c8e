use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::detect::Format;

// ---------------------------------------------------------------------------
// SensorId – what is plugged into a channel
// ---------------------------------------------------------------------------

/// Sensor identifier as stored by the acquisition software.
/// Text recordings use names (`"ECG"`, `"RAW"`), some older files numeric codes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorId {
    Name(String),
    Code(i64),
}

impl fmt::Display for SensorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorId::Name(s) => write!(f, "{s}"),
            SensorId::Code(c) => write!(f, "{c}"),
        }
    }
}

// ---------------------------------------------------------------------------
// ColumnLocator – where a channel's samples live
// ---------------------------------------------------------------------------

/// Addressing key of one channel inside its storage layout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnLocator {
    /// Absolute column of the row-major text matrix (all devices side by side).
    Column(usize),
    /// Name of the channel dataset below the device's `raw` group.
    Dataset(String),
}

impl fmt::Display for ColumnLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnLocator::Column(c) => write!(f, "column {c}"),
            ColumnLocator::Dataset(name) => write!(f, "{name}"),
        }
    }
}

// ---------------------------------------------------------------------------
// DeviceHeader – normalized metadata of one device
// ---------------------------------------------------------------------------

/// Metadata of one device, identical in shape for every source format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceHeader {
    /// Device id, usually the hardware (MAC) address.
    pub id: String,
    /// Sensor attached to each channel, in channel order.
    pub sensors: Vec<SensorId>,
    /// Channels recorded for this device, in file order.
    pub channels: Vec<u32>,
    /// Samples per second.
    pub sampling_rate: f64,
    /// Bit depths as stored by the file.
    pub resolution: Vec<u32>,
    pub date: String,
    pub time: String,
    pub comments: String,
    /// Channel id → locator of its samples. Keys are exactly `channels`.
    pub column_labels: BTreeMap<u32, ColumnLocator>,

    /// Device model, e.g. `biosignalsplux`.
    pub device: Option<String>,
    pub device_name: Option<String>,
    pub device_connection: Option<String>,
    pub firmware_version: Option<i64>,
    pub sync_interval: Option<i64>,
    pub digital_io: Vec<i64>,
}

impl DeviceHeader {
    /// Channels that can be requested for this device, ascending.
    pub fn available_channels(&self) -> Vec<u32> {
        self.column_labels.keys().copied().collect()
    }

    pub fn has_channel(&self, channel: u32) -> bool {
        self.column_labels.contains_key(&channel)
    }

    pub fn locator(&self, channel: u32) -> Option<&ColumnLocator> {
        self.column_labels.get(&channel)
    }

    /// Check the schema invariants every parser must uphold.
    /// Returns a description of the first violation.
    pub(crate) fn check(&self) -> Result<(), String> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(format!(
                "device {}: sampling rate must be positive, got {}",
                self.id, self.sampling_rate
            ));
        }

        if self.sensors.len() != self.channels.len() {
            return Err(format!(
                "device {}: {} sensor(s) for {} channel(s)",
                self.id,
                self.sensors.len(),
                self.channels.len()
            ));
        }

        let mut seen = BTreeSet::new();
        for channel in &self.channels {
            if !seen.insert(*channel) {
                return Err(format!("device {}: channel {channel} listed twice", self.id));
            }
        }

        let keys: BTreeSet<u32> = self.column_labels.keys().copied().collect();
        if keys != seen {
            return Err(format!(
                "device {}: column labels cover channels {:?} but the device lists {:?}",
                self.id, keys, seen
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FileHeader – all devices of one file
// ---------------------------------------------------------------------------

/// Parsed header of a whole recording: one [`DeviceHeader`] per device, in
/// file order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileHeader {
    pub format: Format,
    devices: Vec<DeviceHeader>,
}

impl FileHeader {
    pub(crate) fn new(format: Format, devices: Vec<DeviceHeader>) -> Self {
        Self { format, devices }
    }

    pub fn devices(&self) -> &[DeviceHeader] {
        &self.devices
    }

    pub fn device(&self, id: &str) -> Option<&DeviceHeader> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn device_ids(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn into_devices(self) -> Vec<DeviceHeader> {
        self.devices
    }
}

// ---------------------------------------------------------------------------
// Dataset – the samples handed back to the caller
// ---------------------------------------------------------------------------

/// Channel label → samples, for one device.
pub type ChannelData = BTreeMap<String, Vec<f64>>;

/// Dataset key of a channel.
pub fn channel_label(channel: u32) -> String {
    format!("CH{channel}")
}

/// Loaded samples: device id → channel label (`"CH<id>"`) → samples.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    devices: BTreeMap<String, ChannelData>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure `device` is present even if no channel of it is requested.
    pub(crate) fn ensure_device(&mut self, device: &str) {
        self.devices.entry(device.to_string()).or_default();
    }

    pub(crate) fn insert(&mut self, device: &str, channel: u32, samples: Vec<f64>) {
        self.devices
            .entry(device.to_string())
            .or_default()
            .insert(channel_label(channel), samples);
    }

    pub fn device(&self, id: &str) -> Option<&ChannelData> {
        self.devices.get(id)
    }

    pub fn channel(&self, device: &str, channel: u32) -> Option<&[f64]> {
        self.devices
            .get(device)
            .and_then(|chans| chans.get(&channel_label(channel)))
            .map(Vec::as_slice)
    }

    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ChannelData)> {
        self.devices.iter()
    }

    /// Number of devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn into_inner(self) -> BTreeMap<String, ChannelData> {
        self.devices
    }
}
