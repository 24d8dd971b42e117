//! Parameters, their automation, and the sources they can follow.
//!
//! Synth-level parameters live in a dense [`ParamBank`](bank::ParamBank)
//! indexed by [`ParamId`](ids::ParamId). Voices keep their own copies
//! (followers) that mirror the synth-level leaders.

pub mod bank;
pub mod byte;
pub mod controller;
pub mod envelope;
pub mod float;
pub mod ids;
pub mod mirror;
