//! saavy_poly - plays an arpeggio through the default output device
//!
//! Run with: cargo run --release

use std::{thread, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rtrb::RingBuffer;
use saavy_poly::{
    io::midi::MidiEvent,
    param::{
        controller::ControllerId,
        ids::{EnvelopeParam, ParamId, Role, VoiceParam},
    },
    PolySynth, Round, SynthConfig, SynthHandle,
};

const BLOCK_SIZE: usize = 256;
const CHORDS: [[u8; 4]; 4] = [[57, 60, 64, 69], [53, 57, 60, 65], [48, 52, 55, 60], [55, 59, 62, 67]];

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f64;
    let channels = config.channels() as usize;

    let (mut synth, mut handle) = PolySynth::new(
        SynthConfig::default()
            .with_sample_rate(sample_rate)
            .with_block_size(BLOCK_SIZE),
    )?;
    patch(&mut handle)?;
    synth.process_messages();

    let (mut midi_tx, mut midi_rx) = RingBuffer::<[u8; 3]>::new(256);
    let mut round: Round = 0;
    let mut position = BLOCK_SIZE;
    let mut block = [vec![0.0f32; BLOCK_SIZE], vec![0.0f32; BLOCK_SIZE]];

    println!("=== saavy_poly ===");
    println!("Sample rate: {} Hz", sample_rate);
    println!("Channels: {}", channels);
    println!("Playing... Press Ctrl+C to stop");

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            while let Ok(bytes) = midi_rx.pop() {
                if let Some(event) = MidiEvent::parse(&bytes) {
                    synth.process_midi_event(0.0, event);
                }
            }

            for frame in data.chunks_mut(channels) {
                if position == BLOCK_SIZE {
                    let buffers = synth.generate_samples(round, BLOCK_SIZE);
                    round += 1;
                    position = 0;

                    for (copy, buffer) in block.iter_mut().zip(buffers) {
                        copy.copy_from_slice(&buffer[..BLOCK_SIZE]);
                    }
                }

                let index = position;
                position += 1;

                match frame {
                    [mono] => *mono = 0.5 * (block[0][index] + block[1][index]),
                    [left, right, rest @ ..] => {
                        *left = block[0][index];
                        *right = block[1][index];
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        |err| tracing::error!(%err, "audio stream error"),
        None,
    )?;

    stream.play()?;

    loop {
        for chord in CHORDS {
            for &note in chord.iter() {
                push_midi(&mut midi_tx, [0x90, note, 96]);
                thread::sleep(Duration::from_millis(150));
            }

            thread::sleep(Duration::from_millis(400));

            for &note in chord.iter() {
                push_midi(&mut midi_tx, [0x80, note, 64]);
            }

            thread::sleep(Duration::from_millis(250));
        }
    }
}

/// A plucky FM patch: envelope 1 shapes the carrier, envelope 2 the modulator.
fn patch(handle: &mut SynthHandle) -> EyreResult<()> {
    let carrier_amplitude = ParamId::voice(Role::Carrier, VoiceParam::Amplitude);
    let modulator_amplitude = ParamId::voice(Role::Modulator, VoiceParam::Amplitude);

    handle.assign_controller(carrier_amplitude, ControllerId::envelope(0))?;
    handle.assign_controller(modulator_amplitude, ControllerId::envelope(1))?;

    for (index, decay, sustain, release) in [(0, 0.05, 0.4, 0.1), (1, 0.02, 0.1, 0.05)] {
        handle.set_param_ratio(ParamId::envelope(index, EnvelopeParam::HoldTime), 0.0)?;
        handle.set_param_ratio(ParamId::envelope(index, EnvelopeParam::DecayTime), decay)?;
        handle.set_param_ratio(ParamId::envelope(index, EnvelopeParam::SustainValue), sustain)?;
        handle.set_param_ratio(ParamId::envelope(index, EnvelopeParam::ReleaseTime), release)?;
    }

    handle.set_param_ratio(ParamId::FM, 0.3)?;
    handle.set_param_ratio(ParamId::MIX, 0.0)?;

    Ok(())
}

fn push_midi(tx: &mut rtrb::Producer<[u8; 3]>, bytes: [u8; 3]) {
    if tx.push(bytes).is_err() {
        tracing::warn!(?bytes, "midi queue full, dropping");
    }
}
