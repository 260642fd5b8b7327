use std::time::Duration;

use anyhow::{Result, ensure};
use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;
use tokio::select;
use tokio::sync::mpsc::Sender;
use tokio::time::{MissedTickBehavior, interval, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::messages::{QrRequest, SlideFrame};
use crate::slideshow::{self, EventDisplay, SlideshowState};

/// Drives the multi-event totem rotation.
///
/// A fixed tick accumulates elapsed time per slide; once the current event's
/// dwell is used up the transition fires. Unshowable events are stepped over
/// on the very next tick without waiting out a dwell. Every transition pushes
/// a frame to the presenter; every event change pushes a QR request.
pub async fn run_totem(
    playlist: Vec<EventDisplay>,
    tick_period: Duration,
    tz: Tz,
    to_presenter: Sender<SlideFrame>,
    to_qr: Sender<QrRequest>,
    cancel: CancellationToken,
) -> Result<()> {
    ensure!(!playlist.is_empty(), "totem playlist is empty");

    let mut state = SlideshowState::default();
    let mut shown_event = None;
    if !announce(
        &playlist,
        &state,
        &mut shown_event,
        &to_presenter,
        &to_qr,
        now_in(&tz),
    )
    .await
    {
        return Ok(());
    }

    let mut ticker = interval(tick_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // the first tick completes immediately

    let mut elapsed = Duration::ZERO;
    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting totem driver");
                break;
            }
            _ = ticker.tick() => {
                let now = now_in(&tz);
                elapsed += tick_period;
                let showable = playlist[state.current_event].is_showable(now);
                if showable && elapsed < playlist[state.current_event].dwell {
                    continue;
                }
                elapsed = Duration::ZERO;
                let advance = slideshow::tick(&mut state, &playlist, now);
                debug!(
                    ?advance,
                    event = state.current_event,
                    image = state.current_image,
                    loops = state.completed_loops,
                    "slideshow advanced"
                );
                if !announce(&playlist, &state, &mut shown_event, &to_presenter, &to_qr, now).await {
                    break;
                }
            }
        }
    }

    Ok(())
}

/// Drives the single-event preview: one timer of exactly the event's dwell
/// per slide. When the loop target is reached the preview starts over from
/// the first image; it never advances to another event.
pub async fn run_preview(
    event: EventDisplay,
    to_presenter: Sender<SlideFrame>,
    to_qr: Sender<QrRequest>,
    cancel: CancellationToken,
) -> Result<()> {
    ensure!(!event.images.is_empty(), "preview event has no images");

    let dwell = event.dwell;
    let playlist = vec![event];
    let mut state = SlideshowState::default();
    let mut shown_event = None;
    if !announce(
        &playlist,
        &state,
        &mut shown_event,
        &to_presenter,
        &to_qr,
        Utc::now().naive_utc(),
    )
    .await
    {
        return Ok(());
    }

    loop {
        select! {
            _ = cancel.cancelled() => {
                info!("cancel received; exiting preview driver");
                break;
            }
            _ = sleep(dwell) => {
                let now = Utc::now().naive_utc();
                // single-entry playlist: an Event advance wraps back to the start
                let advance = slideshow::tick(&mut state, &playlist, now);
                debug!(?advance, image = state.current_image, loops = state.completed_loops, "preview advanced");
                if !announce(&playlist, &state, &mut shown_event, &to_presenter, &to_qr, now).await {
                    break;
                }
            }
        }
    }

    Ok(())
}

fn now_in(tz: &Tz) -> NaiveDateTime {
    Utc::now().with_timezone(tz).naive_local()
}

/// Publish the current slide. Returns false when a peer has gone away and the
/// driver should stop. Nothing is sent while the current event is unshowable.
async fn announce(
    playlist: &[EventDisplay],
    state: &SlideshowState,
    shown_event: &mut Option<usize>,
    to_presenter: &Sender<SlideFrame>,
    to_qr: &Sender<QrRequest>,
    now: NaiveDateTime,
) -> bool {
    let event = &playlist[state.current_event];
    if !event.is_showable(now) {
        return true;
    }

    if *shown_event != Some(state.current_event) {
        *shown_event = Some(state.current_event);
        let request = QrRequest {
            event_id: event.id.clone(),
            link: event.link.clone(),
        };
        if to_qr.send(request).await.is_err() {
            warn!("qr channel closed");
            return false;
        }
    }

    let frame = SlideFrame {
        event_id: event.id.clone(),
        title: event.title.clone(),
        image: event.images[state.current_image].clone(),
        image_index: state.current_image,
        image_count: event.images.len(),
        completed_loops: state.completed_loops,
        color: event.color,
        animation: event.animation,
        has_link: event.link.is_some(),
    };
    if to_presenter.send(frame).await.is_err() {
        warn!("presenter channel closed");
        return false;
    }
    true
}
