pub mod analyser;
pub mod audio;
pub mod buffer;
pub mod canvas;
pub mod color;
pub mod config;
pub mod controls;
pub mod draw;
pub mod error;
pub mod fx;
pub mod telemetry;
pub mod types;
pub mod visualizer;

pub use analyser::{AnalysisSource, Analyser};
pub use audio::AudioCapture;
pub use buffer::SampleRing;
pub use canvas::{Canvas, Paint, Rect, Surface};
pub use color::{get_linear_gradient, make_color, LinearGradient, Rgba};
pub use config::{Args, Config};
pub use controls::{Control, Controls, Driver};
pub use error::Error;
pub use types::{DrawParams, FrameBuffer, ImageData};
pub use visualizer::{bar_layout, BarStyle, Visualizer, FREQUENCY_BARS, WAVEFORM_BARS};
