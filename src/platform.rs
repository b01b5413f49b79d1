//! Binding between the overlay and a site's video player.

use crate::render::PlaybackSnapshot;

use log::debug;

/// What the overlay needs from a player integration. One implementation
/// exists per supported site.
pub trait PlatformAdapter {
    fn name(&self) -> &str;

    /// Playback position in seconds, if a player is bound and reporting.
    fn current_time(&self) -> Option<f64>;

    fn duration(&self) -> Option<f64>;

    /// Bind time-update notifications to the current player. Returns false
    /// when there is no player to bind to yet.
    fn setup_listeners(&mut self) -> bool;

    /// Whether a player element appeared (or was replaced) since the last
    /// call. The overlay re-binds listeners when this returns true.
    fn observe_player_appearance(&mut self) -> bool;

    fn cleanup(&mut self);

    fn snapshot(&self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            current_time: self.current_time(),
            duration: self.duration(),
        }
    }
}

/// A player driven entirely by its owner, used for terminal playback and in
/// tests. It has no site to detect; a player "appears" when `load` is called.
#[derive(Debug, Default)]
pub struct SimulatedPlayer {
    position: Option<f64>,
    duration: Option<f64>,
    appeared: bool,
    bound: bool,
}

impl SimulatedPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a video of the given length into the player, positioned at zero.
    pub fn load(&mut self, duration: Option<f64>) {
        self.position = Some(0.0);
        self.duration = duration;
        self.appeared = true;
    }

    pub fn seek(&mut self, position: f64) {
        if self.position.is_some() {
            self.position = Some(position.max(0.0));
        }
    }

    pub fn advance(&mut self, seconds: f64) {
        if let Some(position) = self.position {
            self.seek(position + seconds);
        }
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }
}

impl PlatformAdapter for SimulatedPlayer {
    fn name(&self) -> &str {
        "simulated"
    }

    fn current_time(&self) -> Option<f64> {
        self.position.filter(|_| self.bound)
    }

    fn duration(&self) -> Option<f64> {
        self.duration.filter(|_| self.bound)
    }

    fn setup_listeners(&mut self) -> bool {
        self.bound = self.position.is_some();
        debug!("Simulated player bound: {}", self.bound);
        self.bound
    }

    fn observe_player_appearance(&mut self) -> bool {
        std::mem::take(&mut self.appeared)
    }

    fn cleanup(&mut self) {
        self.bound = false;
    }
}
