use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;
use opensignals_reader::{load, LoadOptions, SampleSummary, Selection};

const USAGE: &str = "usage: opensignals-reader <recording> [--header | --summary] [--select <json>]";

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        bail!(USAGE);
    };
    let path = PathBuf::from(path);

    let mut show_summary = false;
    let mut selection = Selection::all();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--header" => show_summary = false,
            "--summary" => show_summary = true,
            "--select" => {
                let json = args.next().context("--select needs a JSON argument")?;
                selection = Selection::from_json_str(&json)?;
            }
            other => bail!("unknown argument '{other}'\n{USAGE}"),
        }
    }

    let opts = LoadOptions::default().with_header(true);
    let loaded = load(&path, &selection, &opts)
        .with_context(|| format!("loading {}", path.display()))?;

    for (device, channels) in loaded.dataset.iter() {
        for (label, samples) in channels {
            info!("{device}/{label}: {} samples", samples.len());
        }
    }

    let header = loaded.header.context("loader returned no header")?;
    let output = if show_summary {
        SampleSummary::new(&header, &loaded.dataset).to_json()?
    } else {
        serde_json::to_string_pretty(&header)?
    };
    println!("{output}");
    Ok(())
}
