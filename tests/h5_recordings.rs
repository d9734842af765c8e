//! Loading OpenSignals HDF5 recordings. Needs `--features hdf5`.

#![cfg(feature = "hdf5")]

mod common;

use std::collections::HashSet;

use opensignals_reader::data::h5;
use opensignals_reader::{
    load, load_all, read_header, ColumnLocator, ErrorKind, Format, LoadError, LoadOptions,
    Selection, SensorId,
};
use tempfile::TempDir;

use common::{sample, write, write_h5_recording, write_h5_with, H5Layout};

const DEV: &str = "00:07:80:3B:46:61";

#[test]
fn test_scenario_all_channels_of_single_device() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("one.h5");
    write_h5_recording(&path, &[(DEV, &[1, 2, 3])], 50, false);

    let dataset = load_all(&path).unwrap();
    let channels = dataset.device(DEV).unwrap();
    assert_eq!(channels.keys().collect::<Vec<_>>(), vec!["CH1", "CH2", "CH3"]);

    let expected: Vec<f64> = (0..50).map(|r| sample(0, 3, r)).collect();
    assert_eq!(dataset.channel(DEV, 3).unwrap(), expected.as_slice());
}

#[test]
fn test_header_schema() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("one.h5");
    write_h5_recording(&path, &[(DEV, &[1, 2])], 4, false);

    let header = read_header(&path).unwrap();
    assert_eq!(header.format, Format::Hdf5);
    let dev = header.device(DEV).unwrap();
    assert_eq!(dev.channels, vec![1, 2]);
    assert_eq!(dev.sampling_rate, 1000.0);
    assert_eq!(dev.resolution, vec![16, 16]);
    assert_eq!(dev.date, "2018-11-7");
    assert_eq!(dev.comments, "fixture");
    assert_eq!(dev.firmware_version, Some(772));
    assert_eq!(
        dev.sensors,
        vec![SensorId::Name("SENSOR1".into()), SensorId::Name("SENSOR2".into())]
    );
    assert_eq!(
        dev.locator(2),
        Some(&ColumnLocator::Dataset("channel_2".into()))
    );
}

#[test]
fn test_dataset_labels_are_unique_per_device() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("many.h5");
    write_h5_recording(&path, &[(DEV, &[1, 2, 3, 4, 5, 6, 7, 8])], 2, false);

    let header = read_header(&path).unwrap();
    for dev in header.devices() {
        let labels: HashSet<&ColumnLocator> = dev.column_labels.values().collect();
        assert_eq!(labels.len(), dev.channels.len());
    }
}

#[test]
fn test_blocked_datasets_are_flattened_in_order() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("blocked.h5");
    write_h5_recording(&path, &[(DEV, &[1])], 10, true);

    let dataset = load_all(&path).unwrap();
    let expected: Vec<f64> = (0..10).map(|r| sample(0, 1, r)).collect();
    assert_eq!(dataset.channel(DEV, 1).unwrap(), expected.as_slice());
}

#[test]
fn test_two_devices_subset() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("two.h5");
    write_h5_recording(&path, &[("AA:BB", &[1, 2]), ("CC:DD", &[1])], 6, false);

    let loaded = load(
        &path,
        &Selection::devices([("CC:DD", vec![1])]),
        &LoadOptions::default().with_header(true),
    )
    .unwrap();
    assert_eq!(loaded.dataset.device_ids().collect::<Vec<_>>(), vec!["CC:DD"]);
    assert_eq!(loaded.header.unwrap().len(), 2);

    let full = load_all(&path).unwrap();
    let explicit = load(
        &path,
        &Selection::devices([("AA:BB", vec![1, 2]), ("CC:DD", vec![1])]),
        &LoadOptions::default(),
    )
    .unwrap()
    .dataset;
    assert_eq!(full, explicit);
}

#[test]
fn test_unknown_channel_is_selection_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("one.h5");
    write_h5_recording(&path, &[(DEV, &[1, 2, 3])], 4, false);

    let err = load(&path, &Selection::channels([4]), &LoadOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Selection);
}

#[test]
fn test_sniffed_hdf5_without_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("recording");
    write_h5_recording(&path, &[(DEV, &[1])], 4, false);

    assert_eq!(opensignals_reader::detect(&path).unwrap(), "x-hdf");
    assert_eq!(load_all(&path).unwrap().channel(DEV, 1).unwrap().len(), 4);
}

#[test]
fn test_corrupt_file_is_header_error() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "corrupt.h5", b"definitely not hdf5");

    assert_eq!(read_header(&path).unwrap_err().kind(), ErrorKind::HeaderParse);
}

#[test]
fn test_volatile_attributes_are_optional() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("plain.h5");
    let layout = H5Layout {
        volatile_attrs: false,
        ..H5Layout::default()
    };
    write_h5_with(&path, &[(DEV, &[1, 2])], 8, layout);

    let header = read_header(&path).unwrap();
    assert_eq!(header.device(DEV).unwrap().channels, vec![1, 2]);

    let dataset = load_all(&path).unwrap();
    let expected: Vec<f64> = (0..8).map(|r| sample(0, 2, r)).collect();
    assert_eq!(dataset.channel(DEV, 2).unwrap(), expected.as_slice());
}

#[test]
fn test_missing_raw_group_is_header_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("noraw.h5");
    let layout = H5Layout {
        raw_group: false,
        ..H5Layout::default()
    };
    write_h5_with(&path, &[(DEV, &[1])], 4, layout);

    let err = read_header(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HeaderParse);
    assert!(err.to_string().contains("missing 'raw' group"));
    assert_eq!(load_all(&path).unwrap_err().kind(), ErrorKind::HeaderParse);
}

#[test]
fn test_missing_channel_dataset_is_header_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("gap.h5");
    let layout = H5Layout {
        missing_dataset: Some(2),
        ..H5Layout::default()
    };
    write_h5_with(&path, &[(DEV, &[1, 2, 3])], 4, layout);

    let err = read_header(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::HeaderParse);
    assert!(err.to_string().contains("raw/channel_2"));
}

#[test]
fn test_unreadable_file_at_extraction_is_extraction_error() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.h5");
    write_h5_recording(&good, &[(DEV, &[1, 2])], 4, false);
    let header = read_header(&good).unwrap();
    let plan = Selection::channels([2]).resolve(&header).unwrap();

    // Swapped for garbage between reading the header and the samples.
    let swapped = write(dir.path(), "swapped.h5", b"definitely not hdf5");
    match h5::extract(&swapped, &header, &plan) {
        Err(LoadError::Extraction { device, channel, .. }) => {
            assert_eq!(device, DEV);
            assert_eq!(channel, 2);
        }
        other => panic!("expected an extraction error, got {other:?}"),
    }

    let gone = dir.path().join("gone.h5");
    assert_eq!(h5::extract(&gone, &header, &plan).unwrap_err().kind(), ErrorKind::Io);
}
