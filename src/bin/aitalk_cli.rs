use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use aitalk_bridge::engine::backend::{Delivery, SimulatedEngine};
use aitalk_bridge::settings::SeedSlot;
use aitalk_bridge::telemetry::TelemetrySnapshot;
use aitalk_bridge::{AppConfig, InitRequest, Synthesizer, WaveObject};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "aitalk_cli",
    about = "Drive the request adapter against the simulated AITalk engine"
)]
struct Cli {
    /// JSON configuration file (defaults to assets/aitalk_config.json)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Install directory handed to settings construction
    #[arg(long, default_value = ".")]
    base_dir: String,
    /// Voice library directory name
    #[arg(long, default_value = "yukari_44")]
    voice: String,
    #[arg(long)]
    volume: Option<f32>,
    /// Units released per simulated notification
    #[arg(long, default_value_t = 4096)]
    notify: usize,
    /// Deliver notifications on the submitting thread
    #[arg(long)]
    inline: bool,
    /// Write the JSON report here instead of stdout
    #[arg(long)]
    output: Option<PathBuf>,
    #[arg(long)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert text to intermediate notation
    Kana {
        #[arg(long)]
        text: String,
    },
    /// Synthesize audio from intermediate notation
    Speech {
        #[arg(long)]
        kana: String,
        #[arg(long)]
        wav: Option<PathBuf>,
    },
    /// Text to audio through both jobs
    Convert {
        #[arg(long)]
        text: String,
        #[arg(long)]
        wav: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    if cli.verbose {
        aitalk_bridge::init_logging();
    } else {
        aitalk_bridge::init_logging_with_level(tracing::Level::WARN);
    }

    let mut config = cli
        .config
        .as_ref()
        .map(AppConfig::load_from_file)
        .unwrap_or_else(AppConfig::load);
    // The simulated engine accepts any seed.
    for slot in [SeedSlot::A, SeedSlot::B, SeedSlot::C, SeedSlot::D, SeedSlot::E] {
        config
            .auth_seeds
            .entry(slot.name().to_string())
            .or_insert_with(|| "simulated".to_string());
    }

    let delivery = if cli.inline {
        Delivery::Inline
    } else {
        Delivery::Threaded
    };
    let engine =
        Arc::new(SimulatedEngine::with_delivery(delivery).with_default_notification_units(cli.notify));
    let synth = Synthesizer::create(
        engine,
        InitRequest {
            base_dir: cli.base_dir.clone(),
            voice: cli.voice.clone(),
            volume: cli.volume,
        },
        &config,
    )
    .context("initializing synthesizer")?;

    let report = match &cli.command {
        Commands::Kana { text } => {
            let kana = synth
                .hiragana(text.as_bytes())
                .context("converting text to intermediate notation")?;
            Report::new("kana", &synth, text.len(), kana.len())
                .with_kana(String::from_utf8_lossy(&kana).into_owned())
        }
        Commands::Speech { kana, wav } => {
            let wave = synth
                .speech(kana.as_bytes())
                .context("synthesizing speech")?;
            emit_wav(&wave, wav.as_ref())?;
            Report::new("speech", &synth, kana.len(), wave.len()).with_wave(&wave)
        }
        Commands::Convert { text, wav } => {
            let wave = synth.convert(text.as_bytes()).context("converting text")?;
            emit_wav(&wave, wav.as_ref())?;
            Report::new("convert", &synth, text.len(), wave.len()).with_wave(&wave)
        }
    };

    emit_report(&report, cli.output)?;
    Ok(ExitCode::from(0))
}

fn emit_wav(wave: &WaveObject, path: Option<&PathBuf>) -> Result<()> {
    if let Some(path) = path {
        wave.write_wav(path)
            .with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

fn emit_report(report: &Report, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

#[derive(Serialize)]
struct Report {
    command: &'static str,
    voice: String,
    sample_rate: u32,
    input_len: usize,
    output_len: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    kana: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_ms: Option<u128>,
    telemetry: TelemetrySnapshot,
}

impl Report {
    fn new(command: &'static str, synth: &Synthesizer, input_len: usize, output_len: usize) -> Self {
        Self {
            command,
            voice: synth.settings().voice_name.clone(),
            sample_rate: synth.settings().frequency,
            input_len,
            output_len,
            kana: None,
            duration_ms: None,
            telemetry: synth.telemetry().snapshot(),
        }
    }

    fn with_kana(mut self, kana: String) -> Self {
        self.kana = Some(kana);
        self
    }

    fn with_wave(mut self, wave: &WaveObject) -> Self {
        self.duration_ms = Some(wave.duration().as_millis());
        self
    }
}
