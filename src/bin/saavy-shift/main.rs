//! saavy-shift - play a sine tone through the pitch shifter
//!
//! Run with: cargo run --bin saavy-shift -- [semitones...]
//!
//! Each argument is a transpose amount, applied for two seconds in turn.
//! Without arguments the demo cycles an octave up, an octave down and bypass.

use std::{f32::consts::TAU, thread, time::Duration};

use color_eyre::eyre::{eyre, Result as EyreResult, WrapErr};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use saavy_shift::{dsp::amplify::apply_gain, PitchShifter, RealtimeEngine, MAX_BLOCK_SIZE};

const TONE_HZ: f32 = 220.0;
const TONE_LEVEL: f32 = 0.25;
const STEP: Duration = Duration::from_secs(2);

fn main() -> EyreResult<()> {
    color_eyre::install()?;

    let steps = std::env::args()
        .skip(1)
        .map(|arg| {
            arg.parse::<f64>()
                .wrap_err_with(|| format!("not a semitone amount: {arg}"))
        })
        .collect::<EyreResult<Vec<_>>>()?;
    let steps = if steps.is_empty() {
        vec![12.0, -12.0, 0.0]
    } else {
        steps
    };

    // Set up audio
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no default output device available"))?;
    let config = device
        .default_output_config()
        .wrap_err("failed to fetch default output config")?;

    let sample_rate = config.sample_rate().0 as f32;
    let channels = config.channels() as usize;

    println!("=== saavy-shift ===");
    println!("Sample rate: {} Hz", sample_rate);
    println!("Channels: {}", channels);
    println!("Steps: {:?}", steps);
    println!();

    let mut shifter = PitchShifter::new(RealtimeEngine::new(sample_rate))?;
    let mut renderer = shifter
        .engine_mut()
        .take_renderer()
        .ok_or_else(|| eyre!("engine has no renderer"))?;

    let mut phase = 0.0f32;
    let step = TAU * TONE_HZ / sample_rate;
    let mut tone_buf = vec![0.0f32; MAX_BLOCK_SIZE];
    let mut render_buf = vec![0.0f32; MAX_BLOCK_SIZE];

    let stream = device.build_output_stream(
        &config.into(),
        move |data: &mut [f32], _| {
            let total_frames = data.len() / channels;
            let mut frames_written = 0;

            while frames_written < total_frames {
                let frames = (total_frames - frames_written).min(MAX_BLOCK_SIZE);

                let tone = &mut tone_buf[..frames];
                for sample in tone.iter_mut() {
                    *sample = phase.sin();
                    phase = (phase + step) % TAU;
                }
                apply_gain(tone, TONE_LEVEL);

                let block = &mut render_buf[..frames];
                renderer.process(tone, block);

                // Copy to output (mono to all channels)
                let out_off = frames_written * channels;
                for (i, &s) in block.iter().enumerate() {
                    for ch in 0..channels {
                        data[out_off + i * channels + ch] = s;
                    }
                }

                frames_written += frames;
            }
        },
        |err| eprintln!("Audio error: {}", err),
        None,
    )?;

    stream.play()?;
    println!("Playing... Press Ctrl+C to stop");

    for semitones in steps.iter().cycle() {
        let check = shifter.set_pitch_offset(*semitones, true)?;
        let state = shifter.state();
        println!(
            "  {:+.1} st -> mult {:+.3} ({:?}){}",
            semitones,
            state.mult,
            state.direction,
            if check.is_clamped() { " [clamped]" } else { "" }
        );
        thread::sleep(STEP);
    }

    Ok(())
}
