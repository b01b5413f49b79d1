//! Messages the overlay accepts from its control surface, and the queue that
//! holds them until an overlay exists to answer.

use crate::error::OverlayError;
use crate::overlay::Overlay;
use crate::platform::PlatformAdapter;
use crate::render::RenderTarget;

use std::collections::VecDeque;

use log::{debug, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ControlMessage {
    GetOffset,
    SetOffset {
        offset: f64,
    },
    IncreaseOffset,
    DecreaseOffset,
    ResetOffset,
    LoadSubtitles {
        subtitles: String,
    },
    SetAppearance {
        #[serde(rename = "fontSize")]
        font_size: u32,
        #[serde(rename = "fontColor")]
        font_color: String,
    },
}

impl ControlMessage {
    pub fn from_json(data: &str) -> Result<Self, OverlayError> {
        serde_json::from_str(data).map_err(|e| OverlayError::InvalidMessage(e.to_string()))
    }
}

/// Reply to a [`ControlMessage`]. Fields the action does not report are left
/// out; a caller missing a field it expects should treat the overlay as not
/// ready.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
}

impl Response {
    pub fn offset(offset: f64) -> Self {
        Self {
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn offset_changed(success: bool, offset: f64) -> Self {
        Self {
            success: Some(success),
            offset: Some(offset),
            ..Self::default()
        }
    }

    pub fn success(success: bool) -> Self {
        Self {
            success: Some(success),
            ..Self::default()
        }
    }

    pub fn loaded(count: usize) -> Self {
        Self {
            success: Some(true),
            count: Some(count),
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String, OverlayError> {
        serde_json::to_string(self).map_err(|e| OverlayError::InvalidMessage(e.to_string()))
    }
}

/// Routes control messages to the overlay of the current page. Messages that
/// arrive before an overlay is attached are held and answered, in arrival
/// order, as soon as one is.
pub struct Controller<P: PlatformAdapter, R: RenderTarget> {
    overlay: Option<Overlay<P, R>>,
    pending: VecDeque<ControlMessage>,
}

impl<P: PlatformAdapter, R: RenderTarget> Default for Controller<P, R> {
    fn default() -> Self {
        Self {
            overlay: None,
            pending: VecDeque::new(),
        }
    }
}

impl<P: PlatformAdapter, R: RenderTarget> Controller<P, R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Answer `message` now, or queue it and return `None` when no overlay
    /// is attached.
    pub fn submit(&mut self, message: ControlMessage) -> Option<Response> {
        match self.overlay.as_mut() {
            Some(overlay) => Some(overlay.handle(message)),
            None => {
                debug!("Overlay not ready, queueing {:?}", message);
                self.pending.push_back(message);
                None
            }
        }
    }

    /// Attach `overlay`, replacing (and cleaning up) any previous one, then
    /// answer every queued message in arrival order.
    pub fn attach(&mut self, overlay: Overlay<P, R>) -> Vec<Response> {
        if let Some(mut previous) = self.overlay.take() {
            previous.cleanup();
        }
        let overlay = self.overlay.insert(overlay);

        if !self.pending.is_empty() {
            info!("Delivering {} queued control messages", self.pending.len());
        }
        self.pending
            .drain(..)
            .map(|message| overlay.handle(message))
            .collect()
    }

    pub fn tick(&mut self) {
        if let Some(overlay) = self.overlay.as_mut() {
            overlay.tick();
        }
    }

    /// Detach and clean up the current overlay, handing it back to the
    /// caller. Later messages queue until another overlay is attached.
    pub fn cleanup(&mut self) -> Option<Overlay<P, R>> {
        let mut overlay = self.overlay.take()?;
        overlay.cleanup();
        Some(overlay)
    }

    pub fn overlay(&self) -> Option<&Overlay<P, R>> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut Overlay<P, R>> {
        self.overlay.as_mut()
    }
}
