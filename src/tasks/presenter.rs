use std::collections::HashMap;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::messages::{QrState, QrUpdate, SlideFrame};

/// Everything the screen shows at one instant, derived purely from the
/// driver's frames and the QR task's updates.
#[derive(Debug, Clone, Default)]
pub struct TotemView {
    pub frame: Option<SlideFrame>,
    pub qr: QrState,
}

/// Output seam so tests can capture what would hit the screen.
pub trait RenderSink: Send + 'static {
    fn render(&mut self, view: &TotemView);
}

/// Writes one line per view change; the stand-in for a real screen surface.
pub struct ConsoleSink;

impl RenderSink for ConsoleSink {
    fn render(&mut self, view: &TotemView) {
        let Some(frame) = view.frame.as_ref() else {
            return;
        };
        let qr = match &view.qr {
            QrState::NotRequested => "-".to_string(),
            QrState::Pending => "qr:loading".to_string(),
            QrState::Loaded(path) => format!("qr:{}", path.display()),
            QrState::Failed => "qr:unavailable".to_string(),
        };
        println!(
            "[{}] {} ({}/{}) loop {} {:?}/{:?} {}",
            frame.event_id,
            frame.image,
            frame.image_index + 1,
            frame.image_count,
            frame.completed_loops,
            frame.color,
            frame.animation,
            qr,
        );
    }
}

/// Merges slide frames and QR updates into a single view and renders it.
///
/// QR updates are remembered per event id, so an update that races ahead of
/// its event's first frame (or one for an event shown earlier) still applies
/// the moment that event is back on screen. Updates for events other than the
/// one being shown never touch the visible view directly.
pub async fn run<S: RenderSink>(
    mut frames: Receiver<SlideFrame>,
    mut qr_updates: Receiver<QrUpdate>,
    cancel: CancellationToken,
    mut sink: S,
) -> Result<()> {
    let mut view = TotemView::default();
    let mut known_qr: HashMap<String, QrState> = HashMap::new();

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting presenter");
                break;
            }
            maybe_frame = frames.recv() => {
                let Some(frame) = maybe_frame else { break };
                view.qr = known_qr.get(&frame.event_id).cloned().unwrap_or_default();
                view.frame = Some(frame);
                sink.render(&view);
            }
            maybe_update = qr_updates.recv() => {
                let Some(update) = maybe_update else { break };
                known_qr.insert(update.event_id.clone(), update.state.clone());
                let current = view.frame.as_ref().map(|f| f.event_id.as_str());
                if current == Some(update.event_id.as_str()) {
                    view.qr = update.state;
                    sink.render(&view);
                } else {
                    debug!(event = %update.event_id, "qr update for off-screen event stored");
                }
            }
        }
    }

    Ok(())
}
