//! Turns playback state into the surface shown on top of the player.
//!
//! Rendering is a pure function of its inputs; presenting the result is left
//! to a [`RenderTarget`].

use crate::config::Appearance;
use crate::entry::TimedEntry;

use std::fmt;

const PLACEHOLDER_CLOCK: &str = "--:--:--.---";

/// Player position as sampled on a tick. Either value may be unknown while
/// no player is bound or its metadata has not loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackSnapshot {
    pub current_time: Option<f64>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyncState {
    pub offset: f64,
    pub appearance: Appearance,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub font_size_px: u32,
    pub font_color: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Surface {
    Placeholder,
    Clock {
        position: String,
        duration: String,
        offset: Option<String>,
        caption: Option<Caption>,
    },
}

/// Somewhere a [`Surface`] can be shown.
pub trait RenderTarget {
    fn present(&mut self, surface: &Surface);
    fn clear(&mut self);
}

pub fn render(
    snapshot: &PlaybackSnapshot,
    active: Option<&TimedEntry>,
    state: &SyncState,
) -> Surface {
    let current_time = match snapshot.current_time.filter(|t| t.is_finite()) {
        Some(time) => time,
        None => return Surface::Placeholder,
    };

    let duration = snapshot
        .duration
        .filter(|d| d.is_finite())
        .map_or_else(|| PLACEHOLDER_CLOCK.to_string(), format_clock);

    Surface::Clock {
        position: format_clock(current_time),
        duration,
        offset: format_offset(state.offset),
        caption: active.map(|entry| Caption {
            text: entry.text.clone(),
            font_size_px: state.appearance.font_size_px,
            font_color: state.appearance.font_color.clone(),
        }),
    }
}

/// Format seconds as `HH:MM:SS.mmm`. Hours widen past two digits as needed.
pub fn format_clock(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let total_secs = total_millis / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = total_millis % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}

fn format_offset(offset: f64) -> Option<String> {
    if offset == 0.0 {
        return None;
    }
    let sign = if offset > 0.0 { '+' } else { '-' };
    let rounded = format!("{:.3}", offset.abs());
    let rounded = rounded.trim_end_matches('0').trim_end_matches('.');
    // Below a millisecond the rounded form reads "0"; print the exact value.
    if rounded == "0" {
        return Some(format!("{}{}s", sign, offset.abs()));
    }
    Some(format!("{}{}s", sign, rounded))
}

impl Surface {
    pub fn caption(&self) -> Option<&Caption> {
        match self {
            Surface::Placeholder => None,
            Surface::Clock { caption, .. } => caption.as_ref(),
        }
    }

    /// HTML fragment suitable for injecting into the overlay element.
    pub fn to_html(&self) -> String {
        let mut html = String::new();
        match self {
            Surface::Placeholder => {
                html.push_str(&format!(
                    "<div class=\"suboverlay-clock\">{} / {}</div>",
                    PLACEHOLDER_CLOCK, PLACEHOLDER_CLOCK
                ));
            }
            Surface::Clock {
                position,
                duration,
                offset,
                caption,
            } => {
                html.push_str(&format!(
                    "<div class=\"suboverlay-clock\">{} / {}",
                    position, duration
                ));
                if let Some(offset) = offset {
                    html.push_str(&format!(
                        " <span class=\"suboverlay-offset\">{}</span>",
                        offset
                    ));
                }
                html.push_str("</div>");
                if let Some(caption) = caption {
                    let lines: Vec<String> = caption.text.lines().map(escape_html).collect();
                    html.push_str(&format!(
                        "<div class=\"suboverlay-text\" style=\"font-size: {}px; color: {}\">{}</div>",
                        caption.font_size_px,
                        escape_html(&caption.font_color),
                        lines.join("<br>")
                    ));
                }
            }
        }
        html
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Surface::Placeholder => write!(fmt, "{} / {}", PLACEHOLDER_CLOCK, PLACEHOLDER_CLOCK),
            Surface::Clock {
                position,
                duration,
                offset,
                caption,
            } => {
                write!(fmt, "{} / {}", position, duration)?;
                if let Some(offset) = offset {
                    write!(fmt, " ({})", offset)?;
                }
                if let Some(caption) = caption {
                    for line in caption.text.lines() {
                        write!(fmt, "\n    {}", line)?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}
