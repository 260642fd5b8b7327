use std::time::Duration;

use chrono::NaiveDateTime;
use serde::Deserialize;

/// Background color code for an event, chosen by the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ColorCode {
    #[default]
    Indigo,
    Emerald,
    Amber,
    Rose,
    Slate,
}

/// Slide transition style for an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnimationCode {
    #[default]
    Fade,
    SlideLeft,
    SlideUp,
    Zoom,
}

/// Optional publication window; events outside it are skipped by the driver.
/// Bounds are naive local datetimes interpreted in the configured timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibilityWindow {
    pub from: Option<NaiveDateTime>,
    pub until: Option<NaiveDateTime>,
}

impl VisibilityWindow {
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        if let Some(from) = self.from {
            if now < from {
                return false;
            }
        }
        if let Some(until) = self.until {
            if now > until {
                return false;
            }
        }
        true
    }
}

/// One event as the totem shows it: an ordered image cycle plus presentation
/// metadata. Immutable for the lifetime of a display session.
#[derive(Debug, Clone)]
pub struct EventDisplay {
    pub id: String,
    pub title: String,
    pub images: Vec<String>,
    /// How long each image stays up before the next transition.
    pub dwell: Duration,
    /// Full passes through `images` before the show moves on.
    pub loops_target: u32,
    pub link: Option<String>,
    pub color: ColorCode,
    pub animation: AnimationCode,
    pub window: Option<VisibilityWindow>,
}

impl EventDisplay {
    /// Whether the event can be put on screen right now. An event with no
    /// images is never showable; one with a window is showable only inside it.
    pub fn is_showable(&self, now: NaiveDateTime) -> bool {
        !self.images.is_empty() && self.window.is_none_or(|w| w.contains(now))
    }
}

/// Cursor into the playlist. Mutated only by [`tick`].
///
/// Invariants while the current event is showable:
/// `current_image < images.len()` and `completed_loops < loops_target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlideshowState {
    pub current_event: usize,
    pub current_image: usize,
    pub completed_loops: u32,
}

/// What a single transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the next image within the current loop.
    Image,
    /// The image cycle wrapped and the loop count grew.
    Loop,
    /// The show moved on to another event (counters reset).
    Event,
    /// The current event was not showable and was stepped over uncounted.
    Skipped,
}

/// Advance the slideshow by one transition.
///
/// Rules, in order:
/// 1. An unshowable event (no images, or outside its window) is stepped over
///    immediately; counters reset. One step per call so a playlist with no
///    showable event at all still terminates each tick.
/// 2. More images left in this loop: advance the image.
/// 3. End of the cycle: bump `completed_loops`; once it reaches the loop
///    target move to the next event circularly, otherwise wrap to image 0.
pub fn tick(state: &mut SlideshowState, playlist: &[EventDisplay], now: NaiveDateTime) -> Advance {
    debug_assert!(!playlist.is_empty());
    debug_assert!(state.current_event < playlist.len());

    let event = &playlist[state.current_event];
    if !event.is_showable(now) {
        state.current_event = (state.current_event + 1) % playlist.len();
        state.current_image = 0;
        state.completed_loops = 0;
        return Advance::Skipped;
    }

    if state.current_image + 1 < event.images.len() {
        state.current_image += 1;
        return Advance::Image;
    }

    state.completed_loops += 1;
    if state.completed_loops >= event.loops_target {
        state.current_event = (state.current_event + 1) % playlist.len();
        state.current_image = 0;
        state.completed_loops = 0;
        Advance::Event
    } else {
        state.current_image = 0;
        Advance::Loop
    }
}

/// Replay `transitions` ticks deterministically and collect the shown
/// `(event index, image index)` pairs, initial frame included. Used by the
/// `--dry-run` CLI mode and by tests.
pub fn simulate(
    playlist: &[EventDisplay],
    now: NaiveDateTime,
    transitions: usize,
) -> Vec<(usize, usize)> {
    let mut frames = Vec::new();
    if playlist.is_empty() {
        return frames;
    }

    let mut state = SlideshowState::default();
    if playlist[0].is_showable(now) {
        frames.push((0, 0));
    }
    for _ in 0..transitions {
        tick(&mut state, playlist, now);
        if playlist[state.current_event].is_showable(now) {
            frames.push((state.current_event, state.current_image));
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at_noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 8, 25)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn event(id: &str, image_count: usize, loops_target: u32) -> EventDisplay {
        EventDisplay {
            id: id.to_string(),
            title: id.to_string(),
            images: (0..image_count).map(|i| format!("{id}-{i}.jpg")).collect(),
            dwell: Duration::from_millis(10),
            loops_target,
            link: None,
            color: ColorCode::default(),
            animation: AnimationCode::default(),
            window: None,
        }
    }

    #[test]
    fn three_images_three_loops_then_event_advances() {
        let playlist = vec![event("a", 3, 3), event("b", 1, 1)];
        let mut state = SlideshowState::default();
        let now = at_noon();

        let mut images = vec![state.current_image];
        let mut loops_at_wrap = Vec::new();
        loop {
            let advance = tick(&mut state, &playlist, now);
            if advance == Advance::Event {
                break;
            }
            if advance == Advance::Loop {
                loops_at_wrap.push(state.completed_loops);
            }
            images.push(state.current_image);
        }

        assert_eq!(images, vec![0, 1, 2, 0, 1, 2, 0, 1, 2]);
        assert_eq!(loops_at_wrap, vec![1, 2]);
        assert_eq!(state.current_event, 1);
        assert_eq!(state.current_image, 0);
        assert_eq!(state.completed_loops, 0);
    }

    #[test]
    fn event_takes_exactly_images_times_loops_transitions() {
        for (images, loops) in [(1, 1), (1, 4), (4, 1), (3, 3), (6, 2)] {
            let playlist = vec![event("a", images, loops), event("b", 1, 1)];
            let mut state = SlideshowState::default();
            let now = at_noon();

            let mut count = 0;
            while state.current_event == 0 {
                let advance = tick(&mut state, &playlist, now);
                assert_ne!(advance, Advance::Skipped);
                // the loop counter must never exceed the target
                assert!(state.completed_loops < loops || state.current_event == 1);
                count += 1;
            }
            assert_eq!(count, images * loops as usize, "{images} images x{loops}");
        }
    }

    #[test]
    fn zero_image_event_is_skipped_on_the_next_transition() {
        let playlist = vec![event("empty", 0, 99), event("b", 2, 1)];
        let mut state = SlideshowState::default();

        assert_eq!(tick(&mut state, &playlist, at_noon()), Advance::Skipped);
        assert_eq!(state.current_event, 1);
        assert_eq!(state.current_image, 0);
        assert_eq!(state.completed_loops, 0);
    }

    #[test]
    fn event_order_is_circular() {
        let playlist = vec![event("a", 1, 1), event("b", 1, 1), event("c", 1, 1)];
        let mut state = SlideshowState::default();
        let now = at_noon();

        for expected_next in [1, 2, 0, 1] {
            assert_eq!(tick(&mut state, &playlist, now), Advance::Event);
            assert_eq!(state.current_event, expected_next);
        }
    }

    #[test]
    fn single_event_playlist_wraps_onto_itself() {
        let playlist = vec![event("solo", 2, 1)];
        let mut state = SlideshowState::default();
        let now = at_noon();

        assert_eq!(tick(&mut state, &playlist, now), Advance::Image);
        assert_eq!(tick(&mut state, &playlist, now), Advance::Event);
        assert_eq!(state.current_event, 0);
        assert_eq!(state.current_image, 0);
    }

    #[test]
    fn event_outside_window_is_skipped() {
        let mut gated = event("gated", 2, 2);
        gated.window = Some(VisibilityWindow {
            from: Some(
                NaiveDate::from_ymd_opt(2026, 9, 1)
                    .unwrap()
                    .and_hms_opt(0, 0, 0)
                    .unwrap(),
            ),
            until: None,
        });
        let playlist = vec![gated, event("b", 1, 1)];
        let mut state = SlideshowState::default();

        assert_eq!(tick(&mut state, &playlist, at_noon()), Advance::Skipped);
        assert_eq!(state.current_event, 1);
    }

    #[test]
    fn window_bounds_are_inclusive_of_interior_instants() {
        let window = VisibilityWindow {
            from: Some(
                NaiveDate::from_ymd_opt(2026, 8, 25)
                    .unwrap()
                    .and_hms_opt(9, 0, 0)
                    .unwrap(),
            ),
            until: Some(
                NaiveDate::from_ymd_opt(2026, 8, 25)
                    .unwrap()
                    .and_hms_opt(18, 0, 0)
                    .unwrap(),
            ),
        };
        assert!(window.contains(at_noon()));
        assert!(!window.contains(
            NaiveDate::from_ymd_opt(2026, 8, 24)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        ));
        assert!(!window.contains(
            NaiveDate::from_ymd_opt(2026, 8, 26)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        ));
    }

    #[test]
    fn simulate_matches_the_documented_scenario() {
        let playlist = vec![event("a", 3, 3), event("b", 1, 1)];
        let frames = simulate(&playlist, at_noon(), 9);
        assert_eq!(
            frames,
            vec![
                (0, 0),
                (0, 1),
                (0, 2),
                (0, 0),
                (0, 1),
                (0, 2),
                (0, 0),
                (0, 1),
                (0, 2),
                (1, 0),
            ]
        );
    }

    #[test]
    fn simulate_skips_unshowable_events() {
        let playlist = vec![event("empty", 0, 1), event("b", 1, 1)];
        let frames = simulate(&playlist, at_noon(), 2);
        // tick 1 skips the empty event and lands on b; tick 2 wraps b onto the
        // empty event again, which is not shown
        assert_eq!(frames, vec![(1, 0)]);
    }
}
