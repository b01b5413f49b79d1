use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum OverlayError {
    InvalidMessage(String),
    UnsupportedFile(String),
    State(String),
}

impl Error for OverlayError {}

impl fmt::Display for OverlayError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OverlayError::InvalidMessage(msg) => write!(fmt, "Invalid control message: {}", msg),
            OverlayError::UnsupportedFile(name) => {
                write!(fmt, "Unsupported subtitle file: '{}'", name)
            }
            OverlayError::State(msg) => write!(fmt, "{}", msg),
        }
    }
}
