// A tiny error type so we don't rely on anyhow/thiserror.
// Every variant states *where* things went wrong.
use std::fmt::{self, Display};

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    NotInitialized,       // draw() called before setup_canvas()
    SizeMismatch {        // a buffer disagrees with the size it must have
        what: &'static str,
        expected: usize,
        actual: usize,
    },
    SurfaceUnavailable,   // the drawing surface was dropped
    WindowInit(String),   // Creating the window failed
    WindowUpdate(String), // Updating the window buffer failed
    AudioInit(String),    // Opening/starting the input stream failed
    Config(String),       // Loading or validating configuration failed
}

impl Display for Error {
    // This decides how the error is printed to your console.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotInitialized => write!(f, "Visualizer used before setup_canvas()"),
            Error::SizeMismatch { what, expected, actual } => {
                write!(f, "Size mismatch in {what}: expected {expected}, got {actual}")
            }
            Error::SurfaceUnavailable => write!(f, "Drawing surface is no longer available"),
            Error::WindowInit(s) => write!(f, "Window init error: {s}"),
            Error::WindowUpdate(s) => write!(f, "Window update error: {s}"),
            Error::AudioInit(s) => write!(f, "Audio init error: {s}"),
            Error::Config(s) => write!(f, "Config error: {s}"),
        }
    }
}

impl std::error::Error for Error {}
