//! DSP node library
//!
//! Primitive processing nodes the effect chains are assembled from. Block
//! processors implement the [`Effect`] trait; sources and ports handle
//! playback and routing bookkeeping.

mod biquad;
mod chorus;
mod compressor;
mod convolver;
pub mod effect;
mod eq;
mod expander;
mod gain;
mod lfo;
mod port;
mod source;
mod waveshaper;

pub use biquad::{BiquadFilter, FilterType};
pub use chorus::{Chorus, ChorusParams};
pub use compressor::{Compressor, CompressorParams};
pub use convolver::{normalization_scale, Convolver, DEFAULT_BLOCK_SIZE};
pub use effect::{Effect, EffectParams};
pub use eq::{Band, ThreeBandEq};
pub use expander::{Expander, ExpanderParams};
pub use gain::RampedGain;
pub use lfo::Lfo;
pub use port::{ConnectionId, InputPort};
pub use source::{BufferSource, SourceState};
pub use waveshaper::{distortion_curve, WaveShaper, CURVE_SAMPLES, DEFAULT_SATURATION};
