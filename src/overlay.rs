use crate::config::{Appearance, PersistedState};
use crate::control::{ControlMessage, Response};
use crate::platform::PlatformAdapter;
use crate::render::{render, RenderTarget, Surface, SyncState};
use crate::sync::SyncEngine;

use log::{debug, info, warn};

/// The subtitle overlay of one page: the loaded subtitles, offset and
/// appearance, plus the player it follows and the target it draws on.
pub struct Overlay<P: PlatformAdapter, R: RenderTarget> {
    engine: SyncEngine,
    appearance: Appearance,
    platform: P,
    target: R,
    active: bool,
    last: Option<Surface>,
}

impl<P: PlatformAdapter, R: RenderTarget> Overlay<P, R> {
    pub fn create(mut platform: P, target: R) -> Self {
        let bound = platform.setup_listeners();
        info!(
            "Overlay created on '{}' platform (player bound: {})",
            platform.name(),
            bound
        );

        let mut overlay = Self {
            engine: SyncEngine::new(),
            appearance: Appearance::default(),
            platform,
            target,
            active: true,
            last: None,
        };
        overlay.refresh();
        overlay
    }

    /// Restore subtitles and appearance saved by a previous session.
    pub fn prime(&mut self, state: &PersistedState) {
        if let Some(subtitles) = &state.subtitles {
            let count = self.engine.load_subtitles(subtitles);
            match state.subtitle_count {
                Some(stored) if stored != count => warn!(
                    "Stored subtitles '{}' listed {} entries, parsed {}",
                    state.subtitle_filename.as_deref().unwrap_or("<unnamed>"),
                    stored,
                    count
                ),
                _ => info!(
                    "Restored subtitles '{}'",
                    state.subtitle_filename.as_deref().unwrap_or("<unnamed>")
                ),
            }
        }
        self.appearance = state.appearance();
        self.refresh();
    }

    /// Called on every time update of the player.
    pub fn tick(&mut self) {
        if !self.active {
            return;
        }
        if self.platform.observe_player_appearance() {
            debug!("Player appeared, rebinding listeners");
            self.platform.setup_listeners();
        }
        self.refresh();
    }

    pub fn handle(&mut self, message: ControlMessage) -> Response {
        let response = match message {
            ControlMessage::GetOffset => return Response::offset(self.engine.offset()),
            ControlMessage::SetOffset { offset } => {
                let success = self.engine.set_offset(offset);
                Response::offset_changed(success, self.engine.offset())
            }
            ControlMessage::IncreaseOffset => {
                self.engine.increase_offset();
                Response::offset_changed(true, self.engine.offset())
            }
            ControlMessage::DecreaseOffset => {
                self.engine.decrease_offset();
                Response::offset_changed(true, self.engine.offset())
            }
            ControlMessage::ResetOffset => {
                self.engine.reset_offset();
                Response::offset_changed(true, self.engine.offset())
            }
            ControlMessage::LoadSubtitles { subtitles } => {
                Response::loaded(self.engine.load_subtitles(&subtitles))
            }
            ControlMessage::SetAppearance {
                font_size,
                font_color,
            } => match Appearance::new(font_size, &font_color) {
                Some(appearance) => {
                    self.appearance = appearance;
                    Response::success(true)
                }
                None => {
                    warn!(
                        "Rejecting appearance (size: {}, color: {:?})",
                        font_size, font_color
                    );
                    Response::success(false)
                }
            },
        };
        self.refresh();
        response
    }

    /// Detach from the player and remove the overlay from its target.
    /// Further ticks are ignored.
    pub fn cleanup(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        self.platform.cleanup();
        self.target.clear();
        self.last = None;
        info!("Overlay cleaned up");
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn engine(&self) -> &SyncEngine {
        &self.engine
    }

    pub fn appearance(&self) -> &Appearance {
        &self.appearance
    }

    /// The surface currently presented, if any.
    pub fn surface(&self) -> Option<&Surface> {
        self.last.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn target(&self) -> &R {
        &self.target
    }

    pub fn target_mut(&mut self) -> &mut R {
        &mut self.target
    }

    fn refresh(&mut self) {
        if !self.active {
            return;
        }
        let snapshot = self.platform.snapshot();
        let state = SyncState {
            offset: self.engine.offset(),
            appearance: self.appearance.clone(),
        };
        let active = snapshot
            .current_time
            .and_then(|time| self.engine.active_entry(time));
        let surface = render(&snapshot, active, &state);

        if self.last.as_ref() != Some(&surface) {
            self.target.present(&surface);
            self.last = Some(surface);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::SimulatedPlayer;

    const SUBS: &str = "1\n00:00:01,000 --> 00:00:03,000\nHello\n\n2\n00:00:04,000 --> 00:00:06,000\nWorld\n";

    #[derive(Default)]
    struct Recorder {
        presented: Vec<Surface>,
        clears: usize,
    }

    impl RenderTarget for Recorder {
        fn present(&mut self, surface: &Surface) {
            self.presented.push(surface.clone());
        }

        fn clear(&mut self) {
            self.clears += 1;
        }
    }

    fn playing_overlay() -> Overlay<SimulatedPlayer, Recorder> {
        let mut player = SimulatedPlayer::new();
        player.load(Some(10.0));
        Overlay::create(player, Recorder::default())
    }

    fn caption_text<P: PlatformAdapter, R: RenderTarget>(overlay: &Overlay<P, R>) -> Option<&str> {
        overlay
            .surface()
            .and_then(|s| s.caption())
            .map(|c| c.text.as_str())
    }

    fn seek(overlay: &mut Overlay<SimulatedPlayer, Recorder>, time: f64) {
        overlay.platform_mut().seek(time);
        overlay.tick();
    }

    #[test]
    fn test_placeholder_until_player_appears() {
        let mut overlay = Overlay::create(SimulatedPlayer::new(), Recorder::default());
        overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: SUBS.to_string(),
        });
        overlay.tick();

        assert_eq!(overlay.surface(), Some(&Surface::Placeholder));
        assert_eq!(overlay.target().presented.len(), 1);

        overlay.platform_mut().load(Some(10.0));
        overlay.platform_mut().seek(1.5);
        overlay.tick();

        assert!(overlay.platform().is_bound());
        assert_eq!(caption_text(&overlay), Some("Hello"));
    }

    #[test]
    fn test_tick_follows_playback() {
        let mut overlay = playing_overlay();
        overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: SUBS.to_string(),
        });

        seek(&mut overlay, 2.0);
        assert_eq!(caption_text(&overlay), Some("Hello"));
        seek(&mut overlay, 3.5);
        assert_eq!(caption_text(&overlay), None);
        seek(&mut overlay, 4.0);
        assert_eq!(caption_text(&overlay), Some("World"));
    }

    #[test]
    fn test_offset_messages_rerender_immediately() {
        let mut overlay = playing_overlay();
        overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: SUBS.to_string(),
        });
        seek(&mut overlay, 2.5);

        let response = overlay.handle(ControlMessage::IncreaseOffset);
        assert_eq!(response, Response::offset_changed(true, 1.0));
        assert_eq!(caption_text(&overlay), Some("Hello"));

        overlay.handle(ControlMessage::SetOffset { offset: 2.0 });
        assert_eq!(caption_text(&overlay), None);

        let response = overlay.handle(ControlMessage::DecreaseOffset);
        assert_eq!(response, Response::offset_changed(true, 1.0));
        assert_eq!(
            overlay.surface().map(|s| s.to_string()),
            Some("00:00:02.500 / 00:00:10.000 (+1s)\n    Hello".to_string())
        );

        let response = overlay.handle(ControlMessage::ResetOffset);
        assert_eq!(response, Response::offset_changed(true, 0.0));
        assert_eq!(
            overlay.handle(ControlMessage::GetOffset),
            Response::offset(0.0)
        );
    }

    #[test]
    fn test_loading_empty_text_clears_caption() {
        let mut overlay = playing_overlay();
        overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: SUBS.to_string(),
        });
        seek(&mut overlay, 1.0);
        assert_eq!(caption_text(&overlay), Some("Hello"));

        let response = overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: String::new(),
        });

        assert_eq!(response, Response::loaded(0));
        assert_eq!(caption_text(&overlay), None);
    }

    #[test]
    fn test_set_appearance() {
        let mut overlay = playing_overlay();
        overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: SUBS.to_string(),
        });
        seek(&mut overlay, 1.0);

        let response = overlay.handle(ControlMessage::SetAppearance {
            font_size: 40,
            font_color: "#00ff00".to_string(),
        });
        assert_eq!(response, Response::success(true));
        let caption = overlay.surface().and_then(|s| s.caption()).unwrap();
        assert_eq!(caption.font_size_px, 40);
        assert_eq!(caption.font_color, "#00ff00");

        let response = overlay.handle(ControlMessage::SetAppearance {
            font_size: 40,
            font_color: "green".to_string(),
        });
        assert_eq!(response, Response::success(false));
        assert_eq!(overlay.appearance().font_color, "#00ff00");
    }

    #[test]
    fn test_unchanged_surface_is_presented_once() {
        let mut overlay = playing_overlay();
        overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: SUBS.to_string(),
        });
        seek(&mut overlay, 1.0);
        let presented = overlay.target().presented.len();

        overlay.tick();
        overlay.tick();
        overlay.handle(ControlMessage::GetOffset);

        assert_eq!(overlay.target().presented.len(), presented);
    }

    #[test]
    fn test_prime_restores_state() {
        let mut overlay = playing_overlay();
        let state = PersistedState {
            subtitles: Some(SUBS.to_string()),
            subtitle_filename: Some("episode.srt".to_string()),
            subtitle_count: Some(2),
            font_size: Some(28),
            font_color: Some("#abc".to_string()),
        };

        overlay.prime(&state);
        seek(&mut overlay, 4.5);

        assert_eq!(overlay.engine().entries().len(), 2);
        let caption = overlay.surface().and_then(|s| s.caption()).unwrap();
        assert_eq!(caption.text, "World");
        assert_eq!(caption.font_size_px, 28);
        assert_eq!(caption.font_color, "#abc");
    }

    #[test]
    fn test_cleanup_stops_rendering() {
        let mut overlay = playing_overlay();
        overlay.handle(ControlMessage::LoadSubtitles {
            subtitles: SUBS.to_string(),
        });
        seek(&mut overlay, 1.0);

        overlay.cleanup();
        let presented = overlay.target().presented.len();
        seek(&mut overlay, 4.0);
        overlay.handle(ControlMessage::IncreaseOffset);
        overlay.cleanup();

        assert!(!overlay.is_active());
        assert!(overlay.surface().is_none());
        assert_eq!(overlay.target().presented.len(), presented);
        assert_eq!(overlay.target().clears, 1);
        assert!(!overlay.platform().is_bound());
    }
}
