use std::collections::BTreeSet;

use serde::Serialize;

use super::model::{Dataset, FileHeader};

// ---------------------------------------------------------------------------
// SampleSummary – catalogue entry for a recording
// ---------------------------------------------------------------------------

/// Human-readable description of a loaded recording, in the shape the signal
/// sample library stores next to each file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleSummary {
    #[serde(rename = "Signal Type")]
    pub signal_type: String,
    #[serde(rename = "Acquisition Time")]
    pub acquisition_time: String,
    #[serde(rename = "Sample Rate")]
    pub sample_rate: String,
    #[serde(rename = "Number of Hubs")]
    pub number_of_hubs: String,
    #[serde(rename = "Number of Channels")]
    pub number_of_channels: String,
    #[serde(rename = "Resolutions")]
    pub resolutions: String,
    #[serde(rename = "Observations")]
    pub observations: String,

    #[serde(skip)]
    sensors: Vec<String>,
    #[serde(skip)]
    date: String,
}

impl SampleSummary {
    pub fn new(header: &FileHeader, dataset: &Dataset) -> Self {
        let devices = header.devices();

        let sensors: Vec<String> = devices
            .iter()
            .flat_map(|d| d.sensors.iter().map(ToString::to_string))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let number_of_channels = devices
            .iter()
            .map(|d| format!("[{}] {}", d.id, d.sensors.len()))
            .collect::<Vec<_>>()
            .join("\t");
        let resolutions = devices
            .iter()
            .map(|d| match d.resolution.first() {
                Some(bits) => format!("[{}] {bits} bits", d.id),
                None => format!("[{}] unknown bits", d.id),
            })
            .collect::<Vec<_>>()
            .join("\t");
        let observations = devices
            .iter()
            .map(|d| format!("[{}] {}", d.id, d.comments))
            .collect::<Vec<_>>()
            .join("\n");

        let first = devices.first();
        let sampling_rate = first.map_or(0.0, |d| d.sampling_rate);
        let samples = first
            .and_then(|d| dataset.device(&d.id))
            .and_then(|chans| chans.values().next())
            .map_or(0, Vec::len);

        SampleSummary {
            signal_type: sensors.join(" | "),
            acquisition_time: clock_time(samples, sampling_rate),
            sample_rate: format!("{sampling_rate} Hz"),
            number_of_hubs: devices.len().to_string(),
            number_of_channels,
            resolutions,
            observations,
            sensors,
            date: first.map(|d| d.date.clone()).unwrap_or_default(),
        }
    }

    /// File stem under which the recording is filed in the sample library,
    /// e.g. `signal_sample_single_hub_ECG_EMG_2018_11_7`.
    pub fn library_stem(&self) -> String {
        let hubs = if self.number_of_hubs == "1" {
            "single_hub"
        } else {
            "multi_hub"
        };
        format!(
            "signal_sample_{hubs}_{}_{}",
            self.sensors.join("_"),
            self.date.replace('-', "_")
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// `HH:MM:SS.0` of `samples / rate` seconds, wrapping at 24 h.
fn clock_time(samples: usize, rate: f64) -> String {
    let secs = if rate > 0.0 {
        (samples as f64 / rate).floor() as u64
    } else {
        0
    };
    format!(
        "{:02}:{:02}:{:02}.0",
        (secs / 3600) % 24,
        (secs / 60) % 60,
        secs % 60
    )
}
