//! Low-level DSP primitives used by the graph nodes.
//!
//! These components are allocation-free once built and realtime-safe, so they
//! can live directly inside voice structs. They stay focused on the
//! signal-processing math; scheduling and parameter handling happen in the
//! graph layer.

/// Soft clip and foldback waveshaping kernels.
pub mod distortion;
/// State-variable filter implementation with multiple responses.
pub mod filter;
/// Detune, randomization and interpolation helpers.
pub mod math;
/// Band-limited wavetables and the standard waveforms.
pub mod wavetable;
