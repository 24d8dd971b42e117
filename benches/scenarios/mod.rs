//! Real-world scenario benchmarks.
//!
//! These benchmarks drive the complete synth the way a host does: notes in,
//! one block per round out.

mod voices;

pub use voices::bench_voices;
