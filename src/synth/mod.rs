// Purpose: Voice management, polyphony, MIDI-facing note handling
// This layer sits above graph nodes and drives a fixed pool of voices

/// Control messages and the control-thread handle.
pub mod message;
/// Last-note-priority stack for mono mode.
pub mod note_stack;
/// The polyphonic synth: voice pool, dispatch, mixing.
pub mod poly;
/// Tuning schemes and note frequency tables.
pub mod tuning;
pub mod voice;
