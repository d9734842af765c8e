use std::fs::File;
use std::io::{BufWriter, Write};

use serde_json::{json, Map, Value as JsonValue};

const SAMPLING_RATE: u32 = 1000;
const N_SAMPLES: usize = 5000;

/// One synthetic device: id, analog channels and the sensor on each.
struct SyntheticDevice {
    id: &'static str,
    channels: Vec<u32>,
    sensors: Vec<&'static str>,
    samples: Vec<Vec<u16>>,
}

/// ECG-like pulse train on top of a baseline.
fn pulse(t: f64, period: f64, width: f64, amplitude: f64) -> f64 {
    let phase = t % period - period / 2.0;
    amplitude * (-phase.powi(2) / (2.0 * width.powi(2))).exp()
}

fn generate_channel(kind: &str, rng: &mut SimpleRng) -> Vec<u16> {
    (0..N_SAMPLES)
        .map(|i| {
            let t = i as f64 / SAMPLING_RATE as f64;
            let signal = match kind {
                "ECG" => 32768.0 + pulse(t, 0.8, 0.012, 12000.0),
                "EMG" => 32768.0 + rng.gauss(0.0, 2500.0) * (1.0 + (t * 0.5).sin()).abs(),
                "EDA" => 20000.0 + 3000.0 * (t * 0.3).sin(),
                _ => 32768.0 + 8000.0 * (2.0 * std::f64::consts::PI * t).sin(),
            };
            (signal + rng.gauss(0.0, 40.0)).clamp(0.0, 65535.0) as u16
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// Column names of a device: sequence number, digital in/out, then analog.
fn columns(dev: &SyntheticDevice) -> Vec<String> {
    let mut cols: Vec<String> = ["nSeq", "I1", "I2", "O1", "O2"]
        .iter()
        .map(|c| c.to_string())
        .collect();
    cols.extend(dev.channels.iter().map(|ch| format!("A{ch}")));
    cols
}

fn text_header(devices: &[SyntheticDevice]) -> JsonValue {
    let mut root = Map::new();
    for (position, dev) in devices.iter().enumerate() {
        let cols = columns(dev);
        let mut resolution = vec![4, 1, 1, 1, 1];
        resolution.extend(dev.channels.iter().map(|_| 16));
        root.insert(
            dev.id.to_string(),
            json!({
                "sensor": dev.sensors,
                "device name": dev.id,
                "column": cols,
                "sync interval": 2,
                "time": "10:32:14.254",
                "comments": "synthetic recording",
                "device connection": format!("BTH{}", dev.id),
                "channels": dev.channels,
                "date": "2018-11-7",
                "mode": 0,
                "digital IO": [0, 0, 1, 1],
                "firmware version": 772,
                "device": "biosignalsplux",
                "position": position,
                "sampling rate": SAMPLING_RATE,
                "label": dev.channels.iter().map(|ch| format!("A{ch}")).collect::<Vec<_>>(),
                "resolution": resolution,
                "special": dev.channels.iter().map(|_| json!({})).collect::<Vec<_>>(),
            }),
        );
    }
    JsonValue::Object(root)
}

fn write_text(path: &str, devices: &[SyntheticDevice]) -> std::io::Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "# OpenSignals Text File Format")?;
    writeln!(out, "# {}", text_header(devices))?;
    writeln!(out, "# EndOfHeader")?;

    for i in 0..N_SAMPLES {
        for dev in devices {
            write!(out, "{}\t0\t0\t0\t0\t", i % 16)?;
            for samples in &dev.samples {
                write!(out, "{}\t", samples[i])?;
            }
        }
        writeln!(out)?;
    }
    out.flush()
}

#[cfg(feature = "hdf5")]
fn write_h5(path: &str, devices: &[SyntheticDevice]) -> hdf5::Result<()> {
    use hdf5::types::VarLenUnicode;

    fn text(value: &str) -> VarLenUnicode {
        value.parse().expect("attribute text has no NUL bytes")
    }

    let file = hdf5::File::create(path)?;
    for dev in devices {
        let group = file.create_group(dev.id)?;
        group
            .new_attr::<u32>()
            .shape(dev.channels.len())
            .create("channels")?
            .write_raw(&dev.channels)?;
        group
            .new_attr::<u32>()
            .create("sampling rate")?
            .write_scalar(&SAMPLING_RATE)?;
        group
            .new_attr::<u32>()
            .shape(dev.channels.len())
            .create("resolution")?
            .write_raw(&vec![16u32; dev.channels.len()])?;
        group
            .new_attr::<u32>()
            .create("nsamples")?
            .write_scalar(&(N_SAMPLES as u32))?;
        for (key, value) in [
            ("date", "2018-11-7"),
            ("time", "10:32:14.254"),
            ("comments", "synthetic recording"),
            ("device", "biosignalsplux"),
            ("macaddress", dev.id),
        ] {
            group
                .new_attr::<VarLenUnicode>()
                .create(key)?
                .write_scalar(&text(value))?;
        }

        let raw = group.create_group("raw")?;
        for ((channel, sensor), samples) in dev.channels.iter().zip(&dev.sensors).zip(&dev.samples) {
            let ds = raw
                .new_dataset::<u16>()
                .shape((samples.len(), 1))
                .create(format!("channel_{channel}").as_str())?;
            ds.write_raw(samples)?;
            ds.new_attr::<VarLenUnicode>()
                .create("sensor")?
                .write_scalar(&text(sensor))?;
        }
    }
    Ok(())
}

fn main() {
    let mut rng = SimpleRng::new(42);

    let layout = [
        ("00:07:80:3B:46:61", vec![1, 2], vec!["ECG", "EMG"]),
        ("00:07:80:58:9B:3F", vec![1], vec!["EDA"]),
    ];
    let devices: Vec<SyntheticDevice> = layout
        .into_iter()
        .map(|(id, channels, sensors)| {
            let samples = sensors
                .iter()
                .map(|kind| generate_channel(kind, &mut rng))
                .collect();
            SyntheticDevice {
                id,
                channels,
                sensors,
                samples,
            }
        })
        .collect();

    let output_path = "sample_recording.txt";
    write_text(output_path, &devices).expect("Failed to write text recording");
    println!(
        "Wrote {} device(s), {N_SAMPLES} samples each to {output_path}",
        devices.len()
    );

    #[cfg(feature = "hdf5")]
    {
        let h5_path = "sample_recording.h5";
        write_h5(h5_path, &devices).expect("Failed to write HDF5 recording");
        println!("Wrote the same recording to {h5_path}");
    }
}
