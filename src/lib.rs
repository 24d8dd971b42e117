pub mod config; // Engine configuration
pub mod dsp;
pub mod error;
pub mod graph; // Pull-based signal graph
pub mod io;
pub mod param; // Parameters, automation and modulation sources
pub mod synth; // Voice management and polyphony

pub use config::SynthConfig;
pub use error::SynthError;
pub use synth::{message::SynthHandle, poly::PolySynth};

/// Audio samples as they leave the engine.
pub type Sample = f32;
/// Internal arithmetic: parameter values, phases, filter state.
pub type Number = f64;
pub type Seconds = f64;
pub type Frequency = f64;
/// Identifies one rendering pass; a node renders at most once per round.
pub type Round = u64;

pub const MAX_BLOCK_SIZE: usize = 2048;
