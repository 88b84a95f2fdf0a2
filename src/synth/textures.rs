//! Ambience textures and one-shot effects
//!
//! Every ambience layer is shaped noise or a sparse tonal pattern rendered
//! once into a loopable mono buffer. Periodic envelopes complete a whole
//! number of cycles per loop, and the loop seam is crossfaded so a looping
//! source never clicks at the wrap point.

use crate::dsp::BiquadFilter;
use crate::engine::AudioBuffer;
use crate::synth::noise::{white_sample, PinkFilter};
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};
use std::fmt;

/// Seam crossfade length in seconds
const LOOP_FADE_SECONDS: f32 = 0.05;

/// Sound character of an ambience layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Texture {
    /// Slow surf: low pink noise under a breathing envelope
    Swell,
    /// Wind: band-limited pink noise with irregular strength
    Gust,
    /// Small birds: short rising whistles
    Chirps,
    /// Seabirds: descending cries with a harsh overtone
    Calls,
    /// Distant roar: sub-bass noise with one large swell per loop
    Rumble,
    /// Engine hum: harmonic low tone over filtered noise
    Drone,
    /// Rain: hissing high band plus scattered droplets
    Rain,
    /// Insects: high band pulsed at a chirring rate
    Insects,
}

impl Texture {
    pub const ALL: [Texture; 8] = [
        Texture::Swell,
        Texture::Gust,
        Texture::Chirps,
        Texture::Calls,
        Texture::Rumble,
        Texture::Drone,
        Texture::Rain,
        Texture::Insects,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Texture::Swell => "swell",
            Texture::Gust => "gust",
            Texture::Chirps => "chirps",
            Texture::Calls => "calls",
            Texture::Rumble => "rumble",
            Texture::Drone => "drone",
            Texture::Rain => "rain",
            Texture::Insects => "insects",
        }
    }

    /// Peak level of the rendered layer
    pub fn level(&self) -> f32 {
        match self {
            Texture::Swell => 0.5,
            Texture::Gust => 0.35,
            Texture::Chirps => 0.25,
            Texture::Calls => 0.3,
            Texture::Rumble => 0.45,
            Texture::Drone => 0.3,
            Texture::Rain => 0.3,
            Texture::Insects => 0.2,
        }
    }

    /// Render a loopable mono buffer of `seconds`
    pub fn render(self, rng: &mut Pcg32, sample_rate: u32, seconds: f32) -> AudioBuffer {
        let len = ((sample_rate as f32 * seconds.max(0.0)).round() as usize).max(1);
        let fade = ((sample_rate as f32 * LOOP_FADE_SECONDS) as usize).min(len / 4);
        let total = len + fade;
        let shape = Shape {
            sample_rate,
            len,
            total,
        };

        let raw = match self {
            Texture::Swell => swell(rng, &shape),
            Texture::Gust => gust(rng, &shape),
            Texture::Chirps => chirps(rng, &shape),
            Texture::Calls => calls(rng, &shape),
            Texture::Rumble => rumble(rng, &shape),
            Texture::Drone => drone(rng, &shape),
            Texture::Rain => rain(rng, &shape),
            Texture::Insects => insects(rng, &shape),
        };

        let mut looped = fold_loop(&raw, len, fade);
        normalize_peak(&mut looped, self.level());
        AudioBuffer::from_mono(looped, sample_rate)
    }
}

impl fmt::Display for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Triggerable one-shot effects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OneShot {
    /// Half a second of crackling radio static
    StaticBurst,
    /// Heavy low thump with a noisy transient
    Impact,
}

impl OneShot {
    pub const ALL: [OneShot; 2] = [OneShot::StaticBurst, OneShot::Impact];

    pub fn as_str(&self) -> &'static str {
        match self {
            OneShot::StaticBurst => "static_burst",
            OneShot::Impact => "impact",
        }
    }

    /// Look up an effect by wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|shot| shot.as_str() == name)
    }

    /// Render the effect as a mono buffer
    pub fn render(self, rng: &mut Pcg32, sample_rate: u32) -> AudioBuffer {
        let samples = match self {
            OneShot::StaticBurst => static_burst(rng, sample_rate),
            OneShot::Impact => impact(rng, sample_rate),
        };
        AudioBuffer::from_mono(samples, sample_rate)
    }
}

impl fmt::Display for OneShot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Helpers
// ============================================================================

struct Shape {
    sample_rate: u32,
    /// Loop length
    len: usize,
    /// Rendered length including the seam overhang
    total: usize,
}

impl Shape {
    /// Phase in loop cycles for sample `i`
    fn cycle(&self, i: usize) -> f32 {
        i as f32 / self.len as f32
    }

    /// Round `hz` to a frequency with a whole number of cycles per loop
    fn looped_hz(&self, hz: f32) -> f32 {
        let seconds = self.len as f32 / self.sample_rate as f32;
        (hz * seconds).round().max(1.0) / seconds
    }

    fn seconds(&self) -> f32 {
        self.len as f32 / self.sample_rate as f32
    }
}

/// Fold the overhang past `len` back over the head with a linear crossfade
fn fold_loop(raw: &[f32], len: usize, fade: usize) -> Vec<f32> {
    let mut out = raw[..len].to_vec();
    for i in 0..fade {
        let w = i as f32 / fade as f32;
        out[i] = raw[i] * w + raw[len + i] * (1.0 - w);
    }
    out
}

fn normalize_peak(samples: &mut [f32], target: f32) {
    let peak = samples.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
    if peak > 1e-9 {
        let scale = target / peak;
        samples.iter_mut().for_each(|s| *s *= scale);
    }
}

fn pink_stream(rng: &mut Pcg32, total: usize) -> Vec<f32> {
    let mut pink = PinkFilter::new();
    (0..total).map(|_| pink.next(white_sample(rng))).collect()
}

fn white_stream(rng: &mut Pcg32, total: usize) -> Vec<f32> {
    (0..total).map(|_| white_sample(rng)).collect()
}

fn filter_in_place(samples: &mut [f32], filter: &mut BiquadFilter) {
    for s in samples.iter_mut() {
        *s = filter.process_sample(*s, 0);
    }
}

/// Hann window value at position `t` in [0, 1]
fn hann(t: f32) -> f32 {
    0.5 - 0.5 * (TAU * t).cos()
}

/// Add a windowed frequency sweep starting at `onset`
#[allow(clippy::too_many_arguments)]
fn add_sweep(
    out: &mut [f32],
    sample_rate: u32,
    onset: usize,
    duration: usize,
    start_hz: f32,
    end_hz: f32,
    overtone: f32,
    amplitude: f32,
) {
    let mut phase = 0.0_f32;
    for n in 0..duration {
        let Some(slot) = out.get_mut(onset + n) else {
            break;
        };
        let t = n as f32 / duration as f32;
        let hz = start_hz + (end_hz - start_hz) * t;
        phase = (phase + TAU * hz / sample_rate as f32) % TAU;
        let tone = phase.sin() + overtone * (2.0 * phase).sin();
        *slot += tone * hann(t) * amplitude;
    }
}

// ============================================================================
// Layer textures
// ============================================================================

fn swell(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = pink_stream(rng, shape.total);
    let mut lowpass = BiquadFilter::low_pass(500.0, 0.7, shape.sample_rate);
    filter_in_place(&mut out, &mut lowpass);

    let waves = (shape.seconds() / 5.0).round().max(1.0);
    for (i, s) in out.iter_mut().enumerate() {
        let env = 0.35 + 0.65 * hann((shape.cycle(i) * waves).fract());
        *s *= env;
    }
    out
}

fn gust(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = pink_stream(rng, shape.total);
    let mut highpass = BiquadFilter::high_pass(200.0, 0.7, shape.sample_rate);
    let mut lowpass = BiquadFilter::low_pass(1500.0, 0.9, shape.sample_rate);
    filter_in_place(&mut out, &mut highpass);
    filter_in_place(&mut out, &mut lowpass);

    let slow = (shape.seconds() / 3.0).round().max(1.0);
    let fast = slow * 2.0 + 1.0;
    let offset: f32 = rng.gen_range(0.0..TAU);
    for (i, s) in out.iter_mut().enumerate() {
        let c = shape.cycle(i);
        let env = 0.5 + 0.3 * (TAU * slow * c).sin() + 0.2 * (TAU * fast * c + offset).sin();
        *s *= env.max(0.05);
    }
    out
}

fn chirps(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = vec![0.0; shape.total];
    let sr = shape.sample_rate as f32;
    let count = (shape.seconds() * 3.0).round().max(1.0) as usize;
    for _ in 0..count {
        let duration = (sr * rng.gen_range(0.08..0.15)) as usize;
        let latest = shape.len.saturating_sub(duration).max(1);
        let onset = rng.gen_range(0..latest);
        let base: f32 = rng.gen_range(2200.0..3200.0);
        let amplitude = rng.gen_range(0.4..1.0);
        add_sweep(
            &mut out,
            shape.sample_rate,
            onset,
            duration,
            base,
            base * 1.5,
            0.1,
            amplitude,
        );
    }
    out
}

fn calls(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = vec![0.0; shape.total];
    let sr = shape.sample_rate as f32;
    let count = (shape.seconds() * 0.75).round().max(1.0) as usize;
    for _ in 0..count {
        let duration = (sr * rng.gen_range(0.25..0.45)) as usize;
        let latest = shape.len.saturating_sub(duration).max(1);
        let onset = rng.gen_range(0..latest);
        let peak: f32 = rng.gen_range(1200.0..1600.0);
        let amplitude = rng.gen_range(0.6..1.0);
        add_sweep(
            &mut out,
            shape.sample_rate,
            onset,
            duration,
            peak,
            peak * 0.55,
            0.45,
            amplitude,
        );
    }
    out
}

fn rumble(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = pink_stream(rng, shape.total);
    let mut lowpass = BiquadFilter::low_pass(150.0, 1.0, shape.sample_rate);
    filter_in_place(&mut out, &mut lowpass);
    filter_in_place(&mut out, &mut lowpass);

    let center: f32 = rng.gen_range(0.0..1.0);
    for (i, s) in out.iter_mut().enumerate() {
        let env = 0.25 + 0.75 * hann((shape.cycle(i) - center + 0.5).rem_euclid(1.0));
        *s *= env;
    }
    out
}

fn drone(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = pink_stream(rng, shape.total);
    let mut lowpass = BiquadFilter::low_pass(300.0, 0.7, shape.sample_rate);
    filter_in_place(&mut out, &mut lowpass);

    let fundamental = shape.looped_hz(48.0);
    let wobble = (shape.seconds() * 2.0).round().max(1.0);
    let sr = shape.sample_rate as f32;
    for (i, s) in out.iter_mut().enumerate() {
        let t = i as f32 / sr;
        let phase = TAU * fundamental * t;
        let tone = phase.sin() + 0.5 * (2.0 * phase).sin() + 0.25 * (3.0 * phase).sin();
        let env = 0.85 + 0.15 * (TAU * wobble * shape.cycle(i)).sin();
        *s = (tone * 0.5 + *s * 0.6) * env;
    }
    out
}

fn rain(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = white_stream(rng, shape.total);
    let mut highpass = BiquadFilter::high_pass(1500.0, 0.7, shape.sample_rate);
    filter_in_place(&mut out, &mut highpass);
    out.iter_mut().for_each(|s| *s *= 0.4);

    let sr = shape.sample_rate as f32;
    let decay = (-1.0 / (0.003 * sr)).exp();
    let drops = (shape.seconds() * 40.0).round() as usize;
    let tail = (0.02 * sr) as usize;
    for _ in 0..drops {
        let onset = rng.gen_range(0..shape.len);
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let mut amplitude = sign * rng.gen_range(0.3..1.0_f32);
        for n in 0..tail {
            let Some(slot) = out.get_mut(onset + n) else {
                break;
            };
            *slot += amplitude;
            amplitude *= decay;
        }
    }
    out
}

fn insects(rng: &mut Pcg32, shape: &Shape) -> Vec<f32> {
    let mut out = white_stream(rng, shape.total);
    let mut highpass = BiquadFilter::high_pass(4000.0, 0.7, shape.sample_rate);
    let mut lowpass = BiquadFilter::low_pass(7000.0, 0.7, shape.sample_rate);
    filter_in_place(&mut out, &mut highpass);
    filter_in_place(&mut out, &mut lowpass);

    let pulse = shape.looped_hz(28.0);
    let swell = (shape.seconds() / 2.0).round().max(1.0);
    let sr = shape.sample_rate as f32;
    for (i, s) in out.iter_mut().enumerate() {
        let t = i as f32 / sr;
        let chirr = (TAU * pulse * t).sin().max(0.0).powi(2);
        let env = 0.6 + 0.4 * (TAU * swell * shape.cycle(i)).sin();
        *s *= chirr * env;
    }
    out
}

// ============================================================================
// One-shots
// ============================================================================

fn static_burst(rng: &mut Pcg32, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let len = (0.5 * sr) as usize;
    let attack = (0.01 * sr) as usize;
    let release = (0.1 * sr) as usize;

    let mut highpass = BiquadFilter::high_pass(300.0, 0.7, sample_rate);
    let mut lowpass = BiquadFilter::low_pass(3000.0, 0.7, sample_rate);
    let mut gate = 1.0_f32;
    let mut out: Vec<f32> = (0..len)
        .map(|i| {
            // Crackle: the gate flips between full and ducked at random
            if rng.gen_bool(0.002) {
                gate = if gate > 0.5 { 0.2 } else { 1.0 };
            }
            let x = white_sample(rng) * gate;
            let x = lowpass.process_sample(highpass.process_sample(x, 0), 0);
            let env = if i < attack {
                i as f32 / attack as f32
            } else if i + release > len {
                (len - i) as f32 / release as f32
            } else {
                1.0
            };
            x * env
        })
        .collect();
    normalize_peak(&mut out, 0.5);
    out
}

fn impact(rng: &mut Pcg32, sample_rate: u32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let len = sample_rate as usize;
    let mut lowpass = BiquadFilter::low_pass(800.0, 0.7, sample_rate);
    let mut phase = 0.0_f32;
    let mut out: Vec<f32> = (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            let hz = 35.0 + 35.0 * (-6.0 * t).exp();
            phase = (phase + 2.0 * PI * hz / sr) % TAU;
            let body = phase.sin() * (-4.0 * t).exp();
            let crack = lowpass.process_sample(white_sample(rng), 0) * (-12.0 * t).exp();
            body + 0.5 * crack
        })
        .collect();
    normalize_peak(&mut out, 0.8);
    out
}
