use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::Deserialize;

use crate::dwell;
use crate::slideshow::{AnimationCode, ColorCode, EventDisplay, VisibilityWindow};

const DEFAULT_LOOPS: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    pub events: Vec<EventConfig>,
    /// Totem driver tick period. The preview driver ignores this and sleeps
    /// for the exact dwell instead.
    #[serde(with = "humantime_serde", default = "Configuration::default_tick")]
    pub tick: Duration,
    /// Loop target for events that do not set their own.
    #[serde(default = "Configuration::default_loops")]
    pub default_loops: u32,
    /// Directory where generated QR code PNGs are written.
    #[serde(default = "Configuration::default_qr_output_dir")]
    pub qr_output_dir: PathBuf,
    /// Timezone in which visibility windows are interpreted.
    #[serde(default = "Configuration::default_timezone")]
    pub timezone: Tz,
}

impl Configuration {
    fn default_tick() -> Duration {
        Duration::from_secs(1)
    }

    fn default_loops() -> u32 {
        DEFAULT_LOOPS
    }

    fn default_qr_output_dir() -> PathBuf {
        PathBuf::from("qr-codes")
    }

    fn default_timezone() -> Tz {
        chrono_tz::UTC
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn validated(self) -> Result<Self> {
        ensure!(!self.events.is_empty(), "events must not be empty");
        ensure!(!self.tick.is_zero(), "tick must be positive");
        ensure!(self.default_loops >= 1, "default-loops must be at least 1");

        let mut seen = HashSet::new();
        for event in &self.events {
            ensure!(!event.id.trim().is_empty(), "event id must not be blank");
            ensure!(
                seen.insert(event.id.as_str()),
                "duplicate event id '{}'",
                event.id
            );
            if let Some(loops) = event.loops {
                ensure!(
                    loops >= 1,
                    "event '{}': loops must be at least 1",
                    event.id
                );
            }
            if let (Some(from), Some(until)) = (event.visible_from, event.visible_until) {
                ensure!(
                    from < until,
                    "event '{}': visible-from must precede visible-until",
                    event.id
                );
            }
        }
        Ok(self)
    }

    /// Build the display playlist in configured order. Dwell comes from the
    /// image count; the loop target falls back to `default-loops`.
    pub fn playlist(&self) -> Vec<EventDisplay> {
        self.events
            .iter()
            .map(|event| event.display(self.default_loops))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EventConfig {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub loops: Option<u32>,
    pub link: Option<String>,
    #[serde(default)]
    pub color: ColorCode,
    #[serde(default)]
    pub animation: AnimationCode,
    pub visible_from: Option<NaiveDateTime>,
    pub visible_until: Option<NaiveDateTime>,
}

impl EventConfig {
    fn display(&self, default_loops: u32) -> EventDisplay {
        let window = if self.visible_from.is_some() || self.visible_until.is_some() {
            Some(VisibilityWindow {
                from: self.visible_from,
                until: self.visible_until,
            })
        } else {
            None
        };
        EventDisplay {
            id: self.id.clone(),
            title: self.title.clone(),
            images: self.images.clone(),
            dwell: dwell::dwell_for(self.images.len()),
            loops_target: self.loops.unwrap_or(default_loops),
            link: self.link.clone(),
            color: self.color,
            animation: self.animation,
            window,
        }
    }
}

/// Unsaved event form data, exported by the editor as JSON. Powers the
/// preview mode, which plays this one event and never advances past it.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub images: Vec<String>,
    pub loops: Option<u32>,
    pub link: Option<String>,
    #[serde(default)]
    pub color: ColorCode,
    #[serde(default)]
    pub animation: AnimationCode,
}

impl DraftEvent {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    /// A draft is previewed regardless of publication state, so the display
    /// carries no visibility window.
    pub fn into_display(self, default_loops: u32) -> EventDisplay {
        EventDisplay {
            dwell: dwell::dwell_for(self.images.len()),
            loops_target: self.loops.unwrap_or(default_loops),
            id: self.id,
            title: self.title,
            images: self.images,
            link: self.link,
            color: self.color,
            animation: self.animation,
            window: None,
        }
    }
}
