use std::collections::BTreeSet;

use log::debug;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use super::model::FileHeader;
use crate::error::{LoadError, LoadResult, SelectionField};

// ---------------------------------------------------------------------------
// Selection – what the caller asks for
// ---------------------------------------------------------------------------

/// Devices and channels requested from a recording.
///
/// The shape is fixed by the variant, so a flat channel list can never be
/// confused with per-device lists.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
    /// Every channel of every device.
    #[default]
    Unspecified,
    /// Channels of the only device in the file.
    SingleDeviceChannels(Vec<u32>),
    /// Explicit devices, each with its own channel list (or all channels).
    MultiDevice(Vec<DeviceSelection>),
}

/// One device of a [`Selection::MultiDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelection {
    pub device: String,
    /// `None` selects every channel of the device.
    pub channels: Option<Vec<u32>>,
}

/// A device with its fully resolved channel list, ready for extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDevice {
    pub device: String,
    pub channels: Vec<u32>,
}

impl Selection {
    pub fn all() -> Self {
        Selection::Unspecified
    }

    /// Channels of a single-device recording.
    pub fn channels(channels: impl IntoIterator<Item = u32>) -> Self {
        Selection::SingleDeviceChannels(channels.into_iter().collect())
    }

    /// Explicit per-device channel lists.
    pub fn devices<D, C>(devices: impl IntoIterator<Item = (D, C)>) -> Self
    where
        D: Into<String>,
        C: IntoIterator<Item = u32>,
    {
        Selection::MultiDevice(
            devices
                .into_iter()
                .map(|(device, channels)| DeviceSelection {
                    device: device.into(),
                    channels: Some(channels.into_iter().collect()),
                })
                .collect(),
        )
    }

    /// Every channel of the listed devices.
    pub fn devices_all_channels<D: Into<String>>(devices: impl IntoIterator<Item = D>) -> Self {
        Selection::MultiDevice(
            devices
                .into_iter()
                .map(|device| DeviceSelection {
                    device: device.into(),
                    channels: None,
                })
                .collect(),
        )
    }

    /// Build a selection from parallel lists: `channels[i]` belongs to
    /// `devices[i]`. Without devices, `channels` must hold exactly one list,
    /// which is taken as the channels of a single-device recording. Devices
    /// without channel lists are rejected; use [`Selection::devices_all_channels`]
    /// to ask for every channel of named devices.
    pub fn from_parts(
        devices: Option<Vec<String>>,
        channels: Option<Vec<Vec<u32>>>,
    ) -> LoadResult<Self> {
        match (devices, channels) {
            (None, None) => Ok(Selection::Unspecified),
            (None, Some(mut lists)) => {
                if lists.len() != 1 {
                    return Err(LoadError::selection(
                        SelectionField::Channels,
                        format!(
                            "without devices, channels must be a single flat list, got {} lists",
                            lists.len()
                        ),
                    ));
                }
                Ok(Selection::SingleDeviceChannels(lists.remove(0)))
            }
            (Some(_), None) => Err(missing_channel_lists()),
            (Some(devices), Some(lists)) => {
                check_same_length(devices.len(), lists.len())?;
                Ok(Selection::devices(devices.into_iter().zip(lists)))
            }
        }
    }

    /// Build a selection from untyped JSON values, checking shape and element
    /// types:
    ///
    /// - no devices: channels absent, or a flat array of integers;
    /// - devices: an array of strings, and channels an array of the same
    ///   length whose elements are arrays of integers.
    pub fn from_json(devices: Option<&JsonValue>, channels: Option<&JsonValue>) -> LoadResult<Self> {
        let devices = devices.filter(|v| !v.is_null());
        let channels = channels.filter(|v| !v.is_null());

        let Some(devices) = devices else {
            return match channels {
                None => Ok(Selection::Unspecified),
                Some(value) => Ok(Selection::SingleDeviceChannels(flat_channel_list(
                    value,
                    SelectionField::Channels,
                )?)),
            };
        };

        let ids = devices.as_array().ok_or_else(|| {
            LoadError::selection(SelectionField::Devices, "devices must be a list of device ids")
        })?;
        let ids = ids
            .iter()
            .enumerate()
            .map(|(i, v)| {
                v.as_str().map(str::to_owned).ok_or_else(|| {
                    LoadError::selection(
                        SelectionField::Devices,
                        format!("element {i} ({v}) is not a device id string"),
                    )
                })
            })
            .collect::<LoadResult<Vec<_>>>()?;

        let Some(channels) = channels else {
            return Err(missing_channel_lists());
        };

        let lists = channels.as_array().ok_or_else(|| {
            LoadError::selection(
                SelectionField::Channels,
                "with devices given, channels must be a list of channel lists",
            )
        })?;
        check_same_length(ids.len(), lists.len())?;

        let mut selected = Vec::with_capacity(ids.len());
        for (device, list) in ids.into_iter().zip(lists) {
            let field = SelectionField::DeviceChannels(device.clone());
            let channels = flat_channel_list(list, field)?;
            selected.push(DeviceSelection {
                device,
                channels: Some(channels),
            });
        }
        Ok(Selection::MultiDevice(selected))
    }

    /// Parse `{"devices": [...], "channels": [...]}`; both keys are optional.
    pub fn from_json_str(json: &str) -> LoadResult<Self> {
        #[derive(Deserialize)]
        struct RawSelection {
            devices: Option<JsonValue>,
            channels: Option<JsonValue>,
        }

        let raw: RawSelection = serde_json::from_str(json).map_err(|e| {
            LoadError::selection(SelectionField::Input, format!("not valid JSON: {e}"))
        })?;
        Self::from_json(raw.devices.as_ref(), raw.channels.as_ref())
    }

    /// Check the selection against a parsed header and fill in every omitted
    /// part with what the file has.
    ///
    /// Devices are checked before channels; the first unknown id fails the
    /// whole selection.
    pub fn resolve(&self, header: &FileHeader) -> LoadResult<Vec<ResolvedDevice>> {
        let requested: Vec<(&str, Option<&[u32]>)> = match self {
            Selection::Unspecified => header.device_ids().into_iter().map(|id| (id, None)).collect(),
            Selection::SingleDeviceChannels(channels) => match header.devices() {
                [only] => vec![(only.id.as_str(), Some(channels.as_slice()))],
                devices => {
                    return Err(LoadError::selection(
                        SelectionField::Devices,
                        format!(
                            "a flat channel list needs a single-device file, this one has {} devices ({}); name the devices",
                            devices.len(),
                            header.device_ids().join(", ")
                        ),
                    ))
                }
            },
            Selection::MultiDevice(devices) => devices
                .iter()
                .map(|d| (d.device.as_str(), d.channels.as_deref()))
                .collect(),
        };

        for (device, _) in &requested {
            if header.device(device).is_none() {
                return Err(LoadError::selection(
                    SelectionField::Devices,
                    format!(
                        "device {device} is not in the file (available: {})",
                        header.device_ids().join(", ")
                    ),
                ));
            }
        }

        let mut resolved = Vec::with_capacity(requested.len());
        for (device, channels) in requested {
            let Some(dev) = header.device(device) else {
                continue;
            };
            let channels = match channels {
                None => dev.available_channels(),
                Some(channels) => {
                    let mut seen = BTreeSet::new();
                    let mut kept = Vec::with_capacity(channels.len());
                    for &channel in channels {
                        if !dev.has_channel(channel) {
                            return Err(LoadError::selection(
                                SelectionField::DeviceChannels(device.to_string()),
                                format!(
                                    "channel {channel} is not available (available: {:?})",
                                    dev.available_channels()
                                ),
                            ));
                        }
                        if seen.insert(channel) {
                            kept.push(channel);
                        }
                    }
                    kept
                }
            };
            resolved.push(ResolvedDevice {
                device: device.to_string(),
                channels,
            });
        }

        debug!("resolved selection: {resolved:?}");
        Ok(resolved)
    }
}

fn missing_channel_lists() -> LoadError {
    LoadError::selection(SelectionField::Channels, "devices given without channel lists")
}

fn check_same_length(devices: usize, lists: usize) -> LoadResult<()> {
    if devices != lists {
        return Err(LoadError::selection(
            SelectionField::Channels,
            format!("{devices} device(s) but {lists} channel list(s); the shapes must match"),
        ));
    }
    Ok(())
}

fn flat_channel_list(value: &JsonValue, field: SelectionField) -> LoadResult<Vec<u32>> {
    let items = value.as_array().ok_or_else(|| {
        LoadError::selection(field.clone(), format!("{value} is not a list of channel ids"))
    })?;
    items
        .iter()
        .enumerate()
        .map(|(i, v)| {
            v.as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| {
                    LoadError::selection(
                        field.clone(),
                        format!("element {i} ({v}) is not a channel id"),
                    )
                })
        })
        .collect()
}
