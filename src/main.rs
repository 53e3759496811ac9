use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use phrase_engine::{
    output::{output_device_names, CpalSink},
    source::{JsonPhraseSource, PhraseRequest, PhraseSource},
    PhrasePlayer, PlayerConfig,
};
use std::{path::PathBuf, sync::mpsc};

#[derive(Parser, Debug)]
#[command(author, version, about = "Preview recorded jazz phrases")]
struct Args {
    /// Phrase to play, read from `<dir>/<phrase>.json`
    #[arg(value_name = "PHRASE_ID", required_unless_present = "list_devices")]
    phrase: Option<u32>,

    /// Directory holding phrase files
    #[arg(long, default_value = "phrases")]
    dir: PathBuf,

    /// Index of the first note to play
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Index of the last note to play
    #[arg(long, default_value_t = usize::MAX)]
    end: usize,

    /// Path to a JSON player config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output device name (overrides config)
    #[arg(long)]
    device: Option<String>,

    /// List output devices and exit
    #[arg(long, default_value_t = false)]
    list_devices: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    if args.list_devices {
        for name in output_device_names()? {
            println!("{}", name);
        }
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => PlayerConfig::from_json_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    if args.device.is_some() {
        config.output_device = args.device.clone();
    }

    let phrase_id = args.phrase.context("No phrase given")?;
    let request = PhraseRequest::new(phrase_id, args.start, args.end);
    let notes = JsonPhraseSource::new(&args.dir)
        .phrase_notes(&request)
        .with_context(|| format!("Failed to load phrase {}", phrase_id))?;
    info!("Loaded {} notes of phrase {}", notes.len(), phrase_id);

    let player = PhrasePlayer::new(CpalSink::new(config.output_device.clone()), &config);
    let (done_tx, done_rx) = mpsc::channel();
    player.play(notes, move |result| {
        done_tx.send(result).ok();
    });

    done_rx
        .recv()
        .context("Playback ended without completing")?
        .context("Playback failed")?;
    println!("Done");

    Ok(())
}
