use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use image::Luma;
use qrcode::QrCode;
use tokio::select;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::messages::{QrRequest, QrState, QrUpdate};

/// Produces the QR image for one event. Implementations run on the blocking
/// pool, so they may do filesystem work.
pub trait QrSource: Send + Sync + 'static {
    fn produce(&self, event_id: &str, link: &str) -> Result<PathBuf>;
}

/// Renders the event link into a PNG under the configured output directory.
pub struct PngQrSource {
    output_dir: PathBuf,
}

impl PngQrSource {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl QrSource for PngQrSource {
    fn produce(&self, event_id: &str, link: &str) -> Result<PathBuf> {
        let code = QrCode::new(link.as_bytes()).context("failed to encode QR code")?;
        let image = code.render::<Luma<u8>>().min_dimensions(256, 256).build();
        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create QR dir at {}", self.output_dir.display())
        })?;
        let path = self.output_dir.join(format!("event-{event_id}.png"));
        image
            .save(&path)
            .with_context(|| format!("failed to write QR code to {}", path.display()))?;
        Ok(path)
    }
}

/// Serves QR codes for the events the driver puts on screen.
///
/// Rules:
/// - Linkless events resolve to `NotRequested`; nothing is produced.
/// - Each event id is produced at most once per session. Revisiting an event
///   republishes the cached state, whatever it is, including `Failed`.
/// - While a production is in flight the cached state is `Pending`, so a
///   repeat request cannot start a second one.
/// - A failed production is logged and cached; it is never retried.
pub async fn run(
    mut requests: Receiver<QrRequest>,
    updates: Sender<QrUpdate>,
    cancel: CancellationToken,
    source: Arc<dyn QrSource>,
) -> Result<()> {
    let mut cache: HashMap<String, QrState> = HashMap::new();
    // Completions come back from the blocking pool over this channel.
    let (done_tx, mut done_rx) = mpsc::channel::<QrUpdate>(16);

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting qr task");
                break;
            }
            maybe_req = requests.recv() => {
                let Some(request) = maybe_req else { break };
                let state = resolve(request, &mut cache, &source, &done_tx);
                if updates.send(state).await.is_err() {
                    break;
                }
            }
            Some(done) = done_rx.recv() => {
                cache.insert(done.event_id.clone(), done.state.clone());
                if updates.send(done).await.is_err() {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn resolve(
    request: QrRequest,
    cache: &mut HashMap<String, QrState>,
    source: &Arc<dyn QrSource>,
    done_tx: &Sender<QrUpdate>,
) -> QrUpdate {
    let QrRequest { event_id, link } = request;

    let Some(link) = link else {
        cache.insert(event_id.clone(), QrState::NotRequested);
        return QrUpdate {
            event_id,
            state: QrState::NotRequested,
        };
    };

    if let Some(cached) = cache.get(&event_id) {
        debug!(event = %event_id, state = ?cached, "qr cache hit");
        return QrUpdate {
            event_id,
            state: cached.clone(),
        };
    }

    cache.insert(event_id.clone(), QrState::Pending);
    let source = Arc::clone(source);
    let done_tx = done_tx.clone();
    let id = event_id.clone();
    tokio::task::spawn_blocking(move || {
        let state = match source.produce(&id, &link) {
            Ok(path) => QrState::Loaded(path),
            Err(err) => {
                warn!(event = %id, "qr production failed: {err:#}");
                QrState::Failed
            }
        };
        let _ = done_tx.blocking_send(QrUpdate {
            event_id: id,
            state,
        });
    });

    QrUpdate {
        event_id,
        state: QrState::Pending,
    }
}
