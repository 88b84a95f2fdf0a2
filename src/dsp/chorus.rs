//! Chorus effect
//!
//! Short delay line whose read position is swept by an LFO, with feedback.
//! Each channel uses its own LFO phase so stereo material widens.

use crate::dsp::effect::{Effect, EffectParams};
use crate::dsp::lfo::Lfo;
use crate::engine::AudioBuffer;
use crate::impl_effect_common;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Chorus parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChorusParams {
    /// Center delay in milliseconds (1 to 50)
    pub base_delay_ms: f32,
    /// Sweep depth in milliseconds (0 to 20)
    pub depth_ms: f32,
    /// Sweep rate in Hz (0.05 to 10)
    pub rate_hz: f32,
    /// Feedback amount (0 to 0.9)
    pub feedback: f32,
    /// Wet/dry mix (0 = dry, 1 = wet)
    pub mix: f32,
}

impl Default for ChorusParams {
    fn default() -> Self {
        Self {
            base_delay_ms: 18.0,
            depth_ms: 4.0,
            rate_hz: 1.2,
            feedback: 0.35,
            mix: 0.5,
        }
    }
}

impl ChorusParams {
    /// Clamp parameters to valid ranges
    pub fn clamp(&mut self) {
        self.base_delay_ms = self.base_delay_ms.clamp(1.0, 50.0);
        self.depth_ms = self.depth_ms.clamp(0.0, 20.0);
        self.rate_hz = self.rate_hz.clamp(0.05, 10.0);
        self.feedback = self.feedback.clamp(0.0, 0.9);
        self.mix = self.mix.clamp(0.0, 1.0);
    }
}

/// Circular delay line with fractional read
#[derive(Debug, Clone)]
struct DelayLine {
    buffer: Vec<f32>,
    write_pos: usize,
}

impl DelayLine {
    fn new(size: usize) -> Self {
        Self {
            buffer: vec![0.0; size.max(4)],
            write_pos: 0,
        }
    }

    fn write(&mut self, sample: f32) {
        self.buffer[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
    }

    /// Read `delay` samples behind the most recent write
    fn read(&self, delay: f32) -> f32 {
        let len = self.buffer.len();
        let delay = delay.clamp(1.0, (len - 2) as f32);
        let whole = delay.floor() as usize;
        let frac = delay - whole as f32;

        let pos1 = (self.write_pos + len - whole) % len;
        let pos2 = (self.write_pos + len - whole - 1) % len;
        self.buffer[pos1] * (1.0 - frac) + self.buffer[pos2] * frac
    }

    fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|s| *s = 0.0);
        self.write_pos = 0;
    }
}

/// Modulated-delay chorus
#[derive(Debug, Clone)]
pub struct Chorus {
    params: EffectParams,
    settings: ChorusParams,
    sample_rate: u32,
    lines: Vec<DelayLine>,
    lfos: Vec<Lfo>,
}

impl Chorus {
    /// Create a chorus; parameters are clamped to valid ranges
    pub fn new(mut settings: ChorusParams, sample_rate: u32) -> Self {
        settings.clamp();
        let mut chorus = Self {
            params: EffectParams::default(),
            settings,
            sample_rate,
            lines: Vec::new(),
            lfos: Vec::new(),
        };
        chorus.allocate(2);
        chorus
    }

    /// Get the current parameters
    pub fn settings(&self) -> &ChorusParams {
        &self.settings
    }

    /// Set the wet/dry mix (clamped to 0..=1)
    pub fn set_mix(&mut self, mix: f32) {
        self.settings.mix = mix.clamp(0.0, 1.0);
    }

    fn max_delay_samples(&self) -> usize {
        let max_ms = self.settings.base_delay_ms + self.settings.depth_ms;
        (max_ms / 1000.0 * self.sample_rate as f32).ceil() as usize + 4
    }

    fn allocate(&mut self, channels: usize) {
        let size = self.max_delay_samples();
        self.lines = (0..channels).map(|_| DelayLine::new(size)).collect();
        self.lfos = (0..channels)
            .map(|ch| {
                Lfo::new(self.settings.rate_hz, 1.0, self.sample_rate).with_phase(ch as f64 * 0.25)
            })
            .collect();
    }
}

impl Effect for Chorus {
    impl_effect_common!(Chorus, "chorus", "Chorus");

    fn process(&mut self, buffer: &mut AudioBuffer) {
        if !self.params.enabled {
            return;
        }
        if self.lines.len() < buffer.num_channels() {
            self.allocate(buffer.num_channels());
        }

        let samples_per_ms = self.sample_rate as f32 / 1000.0;
        let base = self.settings.base_delay_ms * samples_per_ms;
        let depth = self.settings.depth_ms * samples_per_ms;
        let feedback = self.settings.feedback;
        let mix = self.settings.mix;

        for (ch, channel) in buffer.samples.iter_mut().enumerate() {
            let line = &mut self.lines[ch];
            let lfo = &mut self.lfos[ch];
            for sample in channel.iter_mut() {
                let delay = base + depth * lfo.next_value();
                let delayed = line.read(delay);
                line.write(*sample + delayed * feedback);
                *sample = *sample * (1.0 - mix) + delayed * mix;
            }
        }
    }

    fn prepare(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        let channels = self.lines.len().max(2);
        self.allocate(channels);
    }

    fn reset(&mut self) {
        for line in &mut self.lines {
            line.clear();
        }
        for lfo in &mut self.lfos {
            lfo.reset();
        }
    }

    fn get_params(&self) -> Value {
        json!({
            "base_delay_ms": self.settings.base_delay_ms,
            "depth_ms": self.settings.depth_ms,
            "rate_hz": self.settings.rate_hz,
            "feedback": self.settings.feedback,
            "mix": self.settings.mix,
            "enabled": self.params.enabled
        })
    }
}
