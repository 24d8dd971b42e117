// Purpose - external interfaces: raw MIDI in, routed to the synth

pub mod midi;
