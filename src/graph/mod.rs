//! The signal-flow graph.
//!
//! Every node implements [`SignalProducer`](producer::SignalProducer): it owns
//! its children, pulls them once per round, and renders sample-accurately
//! between the events on its queue. Nodes here are the leaves and stages a
//! voice is built from, plus the synth-wide LFOs.

/// Time-stamped events and the bounded queue they wait in.
pub mod events;
/// Voice filter stages.
pub mod filter;
/// Synth-wide low frequency oscillators.
pub mod lfo;
/// Band-limited wavetable oscillator.
pub mod oscillator;
/// Producer state and the `SignalProducer` trait.
pub mod producer;
/// Wavefolder and distortion stages.
pub mod shaper;
