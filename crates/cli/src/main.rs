mod terminal_decision_surface;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::process;

use clap::Parser;

use rollcall_core::attendance::attendance_report::AttendanceReport;
use rollcall_core::attendance::attendance_session::AttendanceSession;
use rollcall_core::config::AttendanceConfig;
use rollcall_core::pipeline::embedding_backend::{EmbeddingBackend, InlineEmbeddingBackend};
use rollcall_core::pipeline::identity_resolver::IdentityResolver;
use rollcall_core::pipeline::infrastructure::threaded_embedding_backend::ThreadedEmbeddingBackend;
use rollcall_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use rollcall_core::pipeline::track_attendance_use_case::{FrameCallback, TrackAttendanceUseCase};
use rollcall_core::recognition::domain::decision_surface::{DecisionSurface, DeclineAllSurface};
use rollcall_core::recognition::domain::face_embedder::FaceEmbedder;
use rollcall_core::recognition::domain::identity_store::IdentityStore;
use rollcall_core::recognition::infrastructure::in_memory_identity_store::InMemoryIdentityStore;
use rollcall_core::recognition::infrastructure::onnx_arcface_embedder::OnnxArcFaceEmbedder;
use rollcall_core::recognition::infrastructure::sqlite_identity_store::SqliteIdentityStore;
use rollcall_core::shared::constants::{EMBEDDING_MODEL_NAME, EMBEDDING_MODEL_URL};
use rollcall_core::shared::frame::Frame;
use rollcall_core::shared::model_resolver::ModelResolver;
use rollcall_core::shared::session_manifest::SessionManifest;
use rollcall_core::tracking::domain::track::TrackSnapshot;
use rollcall_core::tracking::infrastructure::manifest_detector::ManifestDetector;
use rollcall_core::video::infrastructure::face_snapshot_writer::FaceSnapshotWriter;
use rollcall_core::video::infrastructure::image_sequence_source::ImageSequenceSource;

use terminal_decision_surface::{TerminalDecisionSurface, THUMBNAIL_SIZE};

/// Face tracking and attendance for recorded sessions.
///
/// Replays a session manifest (frame images plus per-frame face
/// detections), tracks faces, recognises them against the identity
/// database and prints who was present.
#[derive(Parser)]
#[command(name = "rollcall")]
struct Cli {
    /// Session manifest (JSON).
    manifest: PathBuf,

    /// Identity database (SQLite). Without it, enrollments are not kept.
    #[arg(long)]
    db: Option<PathBuf>,

    /// Config file (JSON). Defaults to the user config location.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Minimum overlap for a detection to continue a track (0.0-1.0).
    #[arg(long)]
    iou_threshold: Option<f64>,

    /// Seconds a track survives without a matching detection.
    #[arg(long)]
    track_timeout: Option<f64>,

    /// Attempt recognition every Nth processed frame.
    #[arg(long)]
    resolve_every: Option<usize>,

    /// Frames skipped between processed frames.
    #[arg(long)]
    frame_skip: Option<usize>,

    /// Smallest face crop, in pixels, worth recognising.
    #[arg(long)]
    min_face_size: Option<u32>,

    /// Run the embedder on a worker thread.
    #[arg(long)]
    threaded: bool,

    /// Subject shown in the report header.
    #[arg(long)]
    subject: Option<String>,

    /// Group shown in the report header; also the default for enrollments.
    #[arg(long)]
    group: Option<String>,

    /// Also write the report to this file.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write per-frame track snapshots as JSON lines.
    #[arg(long)]
    tracks_out: Option<PathBuf>,

    /// Never ask about unrecognised faces.
    #[arg(long)]
    no_prompt: bool,

    /// Embedding model (ONNX). Downloaded on first use if omitted.
    #[arg(long)]
    model: Option<PathBuf>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = build_config(&cli)?;

    let manifest = SessionManifest::load(&cli.manifest)?;
    log::info!(
        "Loaded {} frames from {}",
        manifest.len(),
        cli.manifest.display()
    );

    let store = open_store(&cli)?;
    let backend = build_backend(&cli, &config)?;
    // keeps the snapshot directory alive until the run is over
    let snapshot_dir = tempfile::tempdir()?;
    let surface = build_surface(&cli, snapshot_dir.path().to_path_buf());
    let resolver = IdentityResolver::new(store, backend, surface)?
        .with_min_face_size(config.recognition.min_face_size);

    let mut session = AttendanceSession::new();
    if let Some(subject) = &cli.subject {
        session = session.with_subject(subject);
    }
    if let Some(group) = &cli.group {
        session = session.with_group(group);
    }

    let mut use_case = TrackAttendanceUseCase::new(
        Box::new(ImageSequenceSource::from_manifest(&manifest)),
        Box::new(ManifestDetector::new(&manifest)),
        resolver,
        &config,
    )
    .with_session(session)
    .with_logger(Box::new(StdoutPipelineLogger::default()));
    if let Some(path) = &cli.tracks_out {
        use_case = use_case.with_on_frame(track_writer(File::create(path)?));
    }

    let run = use_case.execute()?;
    log::info!(
        "{} frames processed, {} identities resolved",
        run.frames_processed,
        run.resolutions.len()
    );

    let session = use_case.into_session();
    let report = AttendanceReport::new(&session);
    print!("{}", report.render());
    if let Some(path) = &cli.report {
        report.write_to(path)?;
        log::info!("Report written to {}", path.display());
    }
    Ok(())
}

fn build_config(cli: &Cli) -> Result<AttendanceConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AttendanceConfig::load(path)?,
        None => AttendanceConfig::load_or_default()?,
    };
    if let Some(v) = cli.iou_threshold {
        config.tracker.iou_threshold = v;
    }
    if let Some(v) = cli.track_timeout {
        config.tracker.track_timeout_secs = v;
    }
    if let Some(v) = cli.resolve_every {
        config.recognition.resolve_every = v;
    }
    if let Some(v) = cli.min_face_size {
        config.recognition.min_face_size = v;
    }
    if cli.threaded {
        config.recognition.threaded_embedding = true;
    }
    if let Some(v) = cli.frame_skip {
        config.pipeline.frame_skip = v;
    }
    config.validate()?;
    Ok(config)
}

fn open_store(cli: &Cli) -> Result<Box<dyn IdentityStore>, Box<dyn std::error::Error>> {
    match &cli.db {
        Some(path) => Ok(Box::new(SqliteIdentityStore::open(path)?)),
        None => {
            log::warn!("No --db given; enrollments will be lost when the run ends");
            Ok(Box::new(InMemoryIdentityStore::new()))
        }
    }
}

fn build_backend(
    cli: &Cli,
    config: &AttendanceConfig,
) -> Result<Box<dyn EmbeddingBackend>, Box<dyn std::error::Error>> {
    let model_path = match &cli.model {
        Some(path) => path.clone(),
        None => {
            log::info!("Resolving model: {EMBEDDING_MODEL_NAME}");
            let path = ModelResolver::with_default_cache()?.resolve(
                EMBEDDING_MODEL_NAME,
                EMBEDDING_MODEL_URL,
                Some(Box::new(download_progress)),
            )?;
            eprintln!();
            path
        }
    };
    let embedder: Box<dyn FaceEmbedder> = Box::new(OnnxArcFaceEmbedder::new(&model_path)?);

    if config.recognition.threaded_embedding {
        Ok(Box::new(ThreadedEmbeddingBackend::new(embedder)))
    } else {
        Ok(Box::new(InlineEmbeddingBackend::new(embedder)))
    }
}

fn build_surface(cli: &Cli, snapshot_dir: PathBuf) -> Box<dyn DecisionSurface> {
    if cli.no_prompt {
        return Box::new(DeclineAllSurface);
    }
    let surface = TerminalDecisionSurface::new(
        BufReader::new(std::io::stdin()),
        std::io::stderr(),
        FaceSnapshotWriter::new(snapshot_dir, THUMBNAIL_SIZE),
    );
    match &cli.group {
        Some(group) => Box::new(surface.with_default_group(group)),
        None => Box::new(surface),
    }
}

/// Writes one JSON line per processed frame.
fn track_writer(file: File) -> FrameCallback {
    let mut out = BufWriter::new(file);
    Box::new(move |frame: &Frame, tracks: &[TrackSnapshot]| {
        let line = serde_json::json!({
            "frame": frame.index(),
            "timestamp": frame.timestamp().as_secs_f64(),
            "tracks": tracks,
        });
        if let Err(e) = writeln!(out, "{line}") {
            log::warn!("Failed to write track snapshot: {e}");
        }
        true
    })
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.manifest.exists() {
        return Err(format!("Manifest not found: {}", cli.manifest.display()).into());
    }
    if let Some(model) = &cli.model {
        if !model.is_file() {
            return Err(format!("Model not found: {}", model.display()).into());
        }
    }
    if let Some(config) = &cli.config {
        if !config.is_file() {
            return Err(format!("Config not found: {}", config.display()).into());
        }
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading face embedding model... {pct}%");
    } else {
        eprint!("\rDownloading face embedding model... {downloaded} bytes");
    }
}
