//! Binary entrypoint for the event totem.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use event_totem::config::{Configuration, DraftEvent};
use event_totem::messages::{QrRequest, QrUpdate, SlideFrame};
use event_totem::slideshow::{self, EventDisplay};
use event_totem::tasks::{driver, presenter, qr};

#[derive(Debug, Parser)]
#[command(name = "event-totem", version, about = "looping event display for kiosk totems")]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
    /// Play a single draft event (JSON form export) instead of the playlist
    #[arg(long, value_name = "DRAFT")]
    preview: Option<PathBuf>,
    /// Print the planned frame sequence for N transitions and exit
    #[arg(long = "dry-run", value_name = "TRANSITIONS")]
    dry_run: Option<usize>,
    /// Override the totem tick period (ms)
    #[arg(long, value_name = "MILLIS")]
    tick_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // init tracing (RUST_LOG controls level, default = info)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();

    let mut cfg = Configuration::from_yaml_file(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config.display()))?
        .validated()
        .context("invalid configuration values")?;
    if let Some(ms) = args.tick_ms {
        cfg.tick = Duration::from_millis(ms);
    }

    let preview_mode = args.preview.is_some();
    let playlist = match &args.preview {
        Some(path) => {
            let draft = DraftEvent::from_json_file(path)
                .with_context(|| format!("failed to load draft from {}", path.display()))?;
            vec![draft.into_display(cfg.default_loops)]
        }
        None => cfg.playlist(),
    };
    info!(events = playlist.len(), preview = preview_mode, "playlist loaded");

    if let Some(transitions) = args.dry_run {
        run_frame_dry_run(&playlist, &cfg, transitions);
        return Ok(());
    }

    // Channels (small/bounded)
    let (frame_tx, frame_rx) = mpsc::channel::<SlideFrame>(16); // Driver -> Presenter
    let (qr_req_tx, qr_req_rx) = mpsc::channel::<QrRequest>(16); // Driver -> Qr
    let (qr_upd_tx, qr_upd_rx) = mpsc::channel::<QrUpdate>(16); // Qr -> Presenter

    let cancel = CancellationToken::new();

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    let mut tasks = JoinSet::new();

    // Qr
    tasks.spawn({
        let cancel = cancel.clone();
        let source: Arc<dyn qr::QrSource> = Arc::new(qr::PngQrSource::new(cfg.qr_output_dir.clone()));
        async move {
            qr::run(qr_req_rx, qr_upd_tx, cancel, source)
                .await
                .context("qr task failed")
        }
    });

    // Presenter
    tasks.spawn({
        let cancel = cancel.clone();
        async move {
            presenter::run(frame_rx, qr_upd_rx, cancel, presenter::ConsoleSink)
                .await
                .context("presenter task failed")
        }
    });

    // Driver
    tasks.spawn({
        let cancel = cancel.clone();
        let tick = cfg.tick;
        let tz = cfg.timezone;
        let mut playlist = playlist;
        async move {
            if preview_mode {
                let event = playlist.remove(0);
                driver::run_preview(event, frame_tx, qr_req_tx, cancel)
                    .await
                    .context("preview driver failed")
            } else {
                driver::run_totem(playlist, tick, tz, frame_tx, qr_req_tx, cancel)
                    .await
                    .context("totem driver failed")
            }
        }
    });

    // Once any task finishes (driver peer loss, error), stop the rest.
    while let Some(res) = tasks.join_next().await {
        match res {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::error!("task error: {e:?}"),
            Err(e) => tracing::error!("join error: {e}"),
        }
        cancel.cancel();
    }

    Ok(())
}

fn run_frame_dry_run(playlist: &[EventDisplay], cfg: &Configuration, transitions: usize) {
    let now = chrono::Utc::now()
        .with_timezone(&cfg.timezone)
        .naive_local();

    println!(
        "# frame dry run\n# events: {}\n# now: {}\n# transitions: {}\n",
        playlist.len(),
        humantime::format_rfc3339(SystemTime::now()),
        transitions,
    );

    let plan = slideshow::simulate(playlist, now, transitions);
    if plan.is_empty() {
        println!("(nothing showable)");
        return;
    }
    for (idx, (event, image)) in plan.iter().enumerate() {
        let event = &playlist[*event];
        println!("  {:>4}: [{}] {}", idx + 1, event.id, event.images[*image]);
    }
}
