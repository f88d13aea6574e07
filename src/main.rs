use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use rollcall::{config, matcher::MatchOutcome, service, storage::FileStore, Pipeline};
use serde_json::json;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(version, about = "Face-matching attendance: enroll faces, verify them, keep the log")]
struct Cli {
    /// Config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print responses as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enroll the face found in an image
    Register {
        /// Display name (defaults to "Unknown User")
        #[arg(short, long)]
        name: Option<String>,
        /// Age (defaults to 0)
        #[arg(short, long)]
        age: Option<u32>,
        image: PathBuf,
    },
    /// Match the face in an image against the gallery and record attendance
    Verify {
        /// Override the configured distance threshold
        #[arg(short, long)]
        threshold: Option<f32>,
        image: PathBuf,
    },
    /// List enrolled identities
    Users,
    /// List recorded attendance
    Attendance,
    /// Open config file in editor
    Config,
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Register { name, age, image } => register(&cfg, cli.json, name, age, &image),
        Commands::Verify { threshold, image } => {
            verify(&cfg, cli.json, threshold.unwrap_or(cfg.threshold), &image)
        }
        Commands::Users => users(&cfg, cli.json),
        Commands::Attendance => attendance(&cfg, cli.json),
        Commands::Config => open_config(cli.config.as_deref()),
    }
}

fn open_store(cfg: &config::Config) -> Result<FileStore> {
    FileStore::open(&cfg.store_dir).context("Failed to open face store")
}

fn open_pipeline(cfg: &config::Config) -> Result<Pipeline> {
    Pipeline::new(
        &cfg.detector_model,
        &cfg.recognizer_model,
        cfg.detection_score,
        cfg.nms_threshold,
    )
    .context("Failed to initialize face recognition pipeline")
}

fn read_image(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading image {}", path.display()))
}

fn register(
    cfg: &config::Config,
    as_json: bool,
    name: Option<String>,
    age: Option<u32>,
    image: &Path,
) -> Result<()> {
    let store = open_store(cfg)?;
    let mut pipeline = open_pipeline(cfg)?;
    let bytes = read_image(image)?;

    let reg = service::register(&store, &mut pipeline, name.as_deref(), age, &bytes)
        .context("Failed to register face")?;

    if as_json {
        println!(
            "{}",
            json!({
                "message": "Face registered successfully.",
                "user_id": reg.identity_id,
                "name": reg.display_name,
                "age": reg.age,
            })
        );
    } else {
        info!(
            "✓ Registered {} (age {}) as user {}",
            reg.display_name, reg.age, reg.identity_id
        );
    }
    Ok(())
}

fn verify(cfg: &config::Config, as_json: bool, threshold: f32, image: &Path) -> Result<()> {
    let store = open_store(cfg)?;
    let mut pipeline = open_pipeline(cfg)?;
    let bytes = read_image(image)?;

    let outcome = service::verify(&store, &mut pipeline, &bytes, threshold)
        .context("Failed to verify face")?;

    match (&outcome, as_json) {
        (MatchOutcome::Matched(m), true) => println!(
            "{}",
            json!({
                "message": "Face verified successfully.",
                "user_id": m.identity_id,
                "name": m.display_name,
                "confidence": m.confidence(),
            })
        ),
        (MatchOutcome::Matched(m), false) => info!("✓ Face verified: {m}"),
        (MatchOutcome::NoMatch, true) => {
            println!("{}", json!({ "message": "No matching face found." }))
        }
        (MatchOutcome::NoMatch, false) => info!("No matching face found."),
    }
    Ok(())
}

fn users(cfg: &config::Config, as_json: bool) -> Result<()> {
    let records = service::users(&open_store(cfg)?)?;
    if as_json {
        let rows: Vec<_> = records
            .iter()
            .map(|r| {
                json!({
                    "id": r.identity_id,
                    "name": r.display_name,
                    "age": r.age,
                    "encoding": r.embedding.to_vec(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    info!("{} enrolled identit(ies)", records.len());
    for r in &records {
        println!(
            "{:>6}  {:<24} {:>3}  dim={}",
            r.identity_id,
            r.display_name,
            r.age,
            r.embedding.dim()
        );
    }
    Ok(())
}

fn attendance(cfg: &config::Config, as_json: bool) -> Result<()> {
    let log = service::attendance(&open_store(cfg)?)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&log)?);
        return Ok(());
    }

    info!("{} attendance record(s)", log.len());
    for entry in &log {
        println!(
            "{}  {:<24} {:>3}  at {}",
            entry.id, entry.display_name, entry.age, entry.recorded_at
        );
    }
    Ok(())
}

fn open_config(path: Option<&Path>) -> Result<()> {
    let config_path = path.unwrap_or(&config::CONFIG_PATH);
    if !config_path.exists() {
        config::save_config(&config::Config::default(), Some(config_path))
            .context("Failed to write default config")?;
    }
    let editor = env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    info!("Opening config file: {}", config_path.display());

    let status = std::process::Command::new(editor)
        .arg(config_path)
        .status()
        .context("Failed to open editor")?;

    if !status.success() {
        anyhow::bail!("Editor exited with non-zero status");
    }

    Ok(())
}
