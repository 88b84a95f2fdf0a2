//! Buffer playback source
//!
//! Plays a shared, pre-rendered buffer once or in a loop. A source can be
//! started once and stopped once; stopping a source that never started or
//! already stopped is an error the caller may choose to ignore.

use crate::engine::AudioBuffer;
use crate::error::{Result, VoxscapeError};
use std::fmt;
use std::sync::Arc;

/// Playback state of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceState {
    /// Constructed but not started
    #[default]
    Created,
    /// Producing samples
    Playing,
    /// Finished or stopped; never restarts
    Stopped,
}

impl fmt::Display for SourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceState::Created => write!(f, "Created"),
            SourceState::Playing => write!(f, "Playing"),
            SourceState::Stopped => write!(f, "Stopped"),
        }
    }
}

/// One-shot or looping player over a shared buffer
#[derive(Debug, Clone)]
pub struct BufferSource {
    name: String,
    buffer: Arc<AudioBuffer>,
    looping: bool,
    gain: f32,
    position: usize,
    state: SourceState,
}

impl BufferSource {
    /// Create a stopped-at-start source named `name`
    pub fn new(name: impl Into<String>, buffer: Arc<AudioBuffer>, looping: bool) -> Self {
        Self {
            name: name.into(),
            buffer,
            looping,
            gain: 1.0,
            position: 0,
            state: SourceState::Created,
        }
    }

    /// Set the playback gain
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain.max(0.0);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == SourceState::Playing
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Playback position in samples
    pub fn position(&self) -> usize {
        self.position
    }

    /// Begin producing samples; starting twice is a no-op
    pub fn start(&mut self) {
        if self.state == SourceState::Created {
            self.state = SourceState::Playing;
        }
    }

    /// Stop playback
    pub fn stop(&mut self) -> Result<()> {
        match self.state {
            SourceState::Playing => {
                self.state = SourceState::Stopped;
                Ok(())
            }
            SourceState::Created | SourceState::Stopped => {
                Err(VoxscapeError::SourceAlreadyStopped {
                    key: self.name.clone(),
                })
            }
        }
    }

    /// Add the next `out.num_samples()` frames into `out`
    ///
    /// Source channels wrap onto output channels. A one-shot source moves to
    /// `Stopped` when it runs out of samples.
    pub fn render_into(&mut self, out: &mut AudioBuffer) {
        if self.state != SourceState::Playing {
            return;
        }
        let len = self.buffer.num_samples();
        let src_channels = self.buffer.num_channels();
        if len == 0 || src_channels == 0 {
            self.state = SourceState::Stopped;
            return;
        }

        for frame in 0..out.num_samples() {
            if self.position >= len {
                if self.looping {
                    self.position = 0;
                } else {
                    self.state = SourceState::Stopped;
                    return;
                }
            }
            for (ch, channel) in out.samples.iter_mut().enumerate() {
                channel[frame] += self.buffer.samples[ch % src_channels][self.position] * self.gain;
            }
            self.position += 1;
        }

        if !self.looping && self.position >= len {
            self.state = SourceState::Stopped;
        }
    }
}
