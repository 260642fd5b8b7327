use std::path::PathBuf;

use crate::slideshow::{AnimationCode, ColorCode};

/// One renderable slide, emitted by the driver after every transition.
#[derive(Debug, Clone)]
pub struct SlideFrame {
    pub event_id: String,
    pub title: String,
    pub image: String,
    pub image_index: usize,
    pub image_count: usize,
    pub completed_loops: u32,
    pub color: ColorCode,
    pub animation: AnimationCode,
    pub has_link: bool,
}

/// Driver -> QR task, sent whenever the displayed event changes.
#[derive(Debug, Clone)]
pub struct QrRequest {
    pub event_id: String,
    pub link: Option<String>,
}

/// Lifecycle of one event's QR code within a display session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QrState {
    /// The event has no link; nothing to render.
    #[default]
    NotRequested,
    Pending,
    Loaded(PathBuf),
    /// Production failed; the presenter shows a fallback message. Never
    /// retried within the session.
    Failed,
}

/// QR task -> presenter.
#[derive(Debug, Clone)]
pub struct QrUpdate {
    pub event_id: String,
    pub state: QrState,
}
