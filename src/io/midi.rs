use crate::{synth::poly::PolySynth, Seconds};

/// A decoded channel voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiEvent {
    NoteOn { channel: u8, key: u8, velocity: u8 },
    NoteOff { channel: u8, key: u8, velocity: u8 },
    /// Polyphonic key pressure.
    Aftertouch { channel: u8, key: u8, pressure: u8 },
    ControlChange { channel: u8, controller: u8, value: u8 },
    ProgramChange { channel: u8, program: u8 },
    ChannelPressure { channel: u8, pressure: u8 },
    /// 14-bit wheel position, 8192 at rest.
    PitchBend { channel: u8, value: u16 },
}

impl MidiEvent {
    /// Decode one complete message. System messages, running status and
    /// truncated input yield `None`.
    ///
    /// A note-on with zero velocity decodes as a note-off.
    pub fn parse(bytes: &[u8]) -> Option<MidiEvent> {
        let (&status, data) = bytes.split_first()?;
        let channel = status & 0x0f;
        let byte = |i: usize| data.get(i).copied().filter(|b| b & 0x80 == 0);

        let event = match status & 0xf0 {
            0x80 => MidiEvent::NoteOff {
                channel,
                key: byte(0)?,
                velocity: byte(1)?,
            },
            0x90 => match (byte(0)?, byte(1)?) {
                (key, 0) => MidiEvent::NoteOff {
                    channel,
                    key,
                    velocity: 0,
                },
                (key, velocity) => MidiEvent::NoteOn {
                    channel,
                    key,
                    velocity,
                },
            },
            0xa0 => MidiEvent::Aftertouch {
                channel,
                key: byte(0)?,
                pressure: byte(1)?,
            },
            0xb0 => MidiEvent::ControlChange {
                channel,
                controller: byte(0)?,
                value: byte(1)?,
            },
            0xc0 => MidiEvent::ProgramChange {
                channel,
                program: byte(0)?,
            },
            0xd0 => MidiEvent::ChannelPressure {
                channel,
                pressure: byte(0)?,
            },
            0xe0 => MidiEvent::PitchBend {
                channel,
                value: byte(0)? as u16 | (byte(1)? as u16) << 7,
            },
            _ => return None,
        };

        Some(event)
    }
}

impl PolySynth {
    /// Route a decoded MIDI event to the matching synth operation.
    /// `time_offset` is relative to the start of the next rendered block.
    ///
    /// Program changes are ignored: patches are managed by the host.
    pub fn process_midi_event(&mut self, time_offset: Seconds, event: MidiEvent) {
        match event {
            MidiEvent::NoteOn {
                channel,
                key,
                velocity,
            } => self.note_on(time_offset, channel, key, velocity),
            MidiEvent::NoteOff {
                channel,
                key,
                velocity,
            } => self.note_off(time_offset, channel, key, velocity),
            MidiEvent::Aftertouch { channel, key, pressure } => self.aftertouch(time_offset, channel, key, pressure),
            MidiEvent::ControlChange {
                channel,
                controller,
                value,
            } => self.control_change(time_offset, channel, controller, value),
            MidiEvent::ProgramChange { .. } => {}
            MidiEvent::ChannelPressure { channel, pressure } => self.channel_pressure(time_offset, channel, pressure),
            MidiEvent::PitchBend { channel, value } => self.pitch_wheel_change(time_offset, channel, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::SynthConfig, synth::tuning::NoteTuning};

    #[test]
    fn decodes_channel_messages() {
        assert_eq!(
            MidiEvent::parse(&[0x93, 60, 100]),
            Some(MidiEvent::NoteOn {
                channel: 3,
                key: 60,
                velocity: 100
            })
        );
        assert_eq!(
            MidiEvent::parse(&[0xb0, 64, 127]),
            Some(MidiEvent::ControlChange {
                channel: 0,
                controller: 64,
                value: 127
            })
        );
        assert_eq!(
            MidiEvent::parse(&[0xdf, 42]),
            Some(MidiEvent::ChannelPressure {
                channel: 15,
                pressure: 42
            })
        );
    }

    #[test]
    fn zero_velocity_note_on_is_note_off() {
        assert_eq!(
            MidiEvent::parse(&[0x90, 64, 0]),
            Some(MidiEvent::NoteOff {
                channel: 0,
                key: 64,
                velocity: 0
            })
        );
    }

    #[test]
    fn pitch_bend_is_fourteen_bits() {
        assert_eq!(
            MidiEvent::parse(&[0xe1, 0x00, 0x40]),
            Some(MidiEvent::PitchBend { channel: 1, value: 8192 })
        );
        assert_eq!(
            MidiEvent::parse(&[0xe1, 0x7f, 0x7f]),
            Some(MidiEvent::PitchBend { channel: 1, value: 16383 })
        );
    }

    #[test]
    fn rejects_truncated_and_system_messages() {
        assert_eq!(MidiEvent::parse(&[]), None);
        assert_eq!(MidiEvent::parse(&[0x90, 60]), None);
        assert_eq!(MidiEvent::parse(&[0x90, 60, 0x80]), None);
        assert_eq!(MidiEvent::parse(&[0xf8]), None);
    }

    #[test]
    fn events_reach_the_synth() {
        let config = SynthConfig::default().with_block_size(128);
        let (mut synth, _handle) = PolySynth::new(config).unwrap();

        for bytes in [[0x90, 60, 100], [0x90, 64, 100], [0x80, 60, 0]] {
            let event = MidiEvent::parse(&bytes).unwrap();
            synth.process_midi_event(0.0, event);
        }
        synth.generate_samples(0, 128);

        let mut notes = [NoteTuning::default(); 4];
        assert_eq!(synth.collect_active_notes(&mut notes), 1);
        assert_eq!(notes[0].note, 64);
    }
}
