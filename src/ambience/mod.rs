//! Environmental ambience manager
//!
//! A theme is a fixed set of looping layers. Layer buffers are rendered once
//! into a [`LayerBank`] at initialization; starting a theme only creates
//! looping sources over them and connects each to the ambient chain input.
//! At most one theme plays at a time.

use crate::chains::EffectChain;
use crate::dsp::{BufferSource, ConnectionId};
use crate::engine::AudioBuffer;
use crate::error::Result;
use crate::synth::{SignalGenerator, Texture};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One layer of a theme
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerSpec {
    pub name: &'static str,
    pub texture: Texture,
    /// Playback gain (linear)
    pub gain: f32,
}

/// A named set of layers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub name: &'static str,
    pub description: &'static str,
    pub layers: &'static [LayerSpec],
}

impl Theme {
    /// Composite keys of this theme's layers
    pub fn layer_keys(&self) -> Vec<String> {
        self.layers
            .iter()
            .map(|layer| source_key(self.name, layer.name))
            .collect()
    }
}

pub const THEMES: &[Theme] = &[
    Theme {
        name: "jaws",
        description: "Open ocean",
        layers: &[
            LayerSpec {
                name: "waves",
                texture: Texture::Swell,
                gain: 0.8,
            },
            LayerSpec {
                name: "wind",
                texture: Texture::Gust,
                gain: 0.5,
            },
            LayerSpec {
                name: "seagulls",
                texture: Texture::Calls,
                gain: 0.35,
            },
            LayerSpec {
                name: "boat",
                texture: Texture::Drone,
                gain: 0.3,
            },
        ],
    },
    Theme {
        name: "jurassic",
        description: "Jungle",
        layers: &[
            LayerSpec {
                name: "insects",
                texture: Texture::Insects,
                gain: 0.4,
            },
            LayerSpec {
                name: "birds",
                texture: Texture::Chirps,
                gain: 0.45,
            },
            LayerSpec {
                name: "rain",
                texture: Texture::Rain,
                gain: 0.6,
            },
            LayerSpec {
                name: "distant_roar",
                texture: Texture::Rumble,
                gain: 0.5,
            },
        ],
    },
];

/// Look up a theme by name
pub fn theme(name: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|t| t.name == name)
}

/// Composite registry key `theme_layer`
pub fn source_key(theme: &str, layer: &str) -> String {
    format!("{}_{}", theme, layer)
}

/// Pre-rendered layer buffers for every theme
#[derive(Debug, Clone, Default)]
pub struct LayerBank {
    buffers: HashMap<String, Arc<AudioBuffer>>,
}

impl LayerBank {
    /// Render every layer of every theme
    pub fn generate(generator: &SignalGenerator, layer_seconds: f32) -> Self {
        let mut buffers = HashMap::new();
        for theme in THEMES {
            for layer in theme.layers {
                let key = source_key(theme.name, layer.name);
                let buffer =
                    generator.texture(&format!("layer.{}", key), layer.texture, layer_seconds);
                buffers.insert(key, Arc::new(buffer));
            }
        }
        debug!("[AMBIENCE] Rendered {} layer buffers", buffers.len());
        Self { buffers }
    }

    pub fn get(&self, key: &str) -> Option<Arc<AudioBuffer>> {
        self.buffers.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }
}

/// A running ambience layer
#[derive(Debug)]
pub struct EnvironmentalSource {
    key: String,
    theme: String,
    layer: String,
    source: BufferSource,
    connection: ConnectionId,
}

impl EnvironmentalSource {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn layer(&self) -> &str {
        &self.layer
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn is_playing(&self) -> bool {
        self.source.is_playing()
    }

    /// Stop the underlying player
    pub fn stop(&mut self) -> Result<()> {
        self.source.stop()
    }
}

/// Owns the running layers of the current theme
#[derive(Debug)]
pub struct AmbienceManager {
    bank: LayerBank,
    active: BTreeMap<String, EnvironmentalSource>,
    current_theme: Option<String>,
}

impl AmbienceManager {
    pub fn new(bank: LayerBank) -> Self {
        Self {
            bank,
            active: BTreeMap::new(),
            current_theme: None,
        }
    }

    /// Replace whatever is playing with `theme_name`'s layers
    ///
    /// Returns the number of layers started. An unknown theme leaves nothing
    /// playing.
    pub fn start_theme(&mut self, theme_name: &str, chain: &mut EffectChain) -> usize {
        self.stop_all(chain);

        let Some(selected) = theme(theme_name) else {
            warn!("[AMBIENCE] Unknown theme '{}', ambience stopped", theme_name);
            return 0;
        };

        for layer in selected.layers {
            let key = source_key(selected.name, layer.name);
            let Some(buffer) = self.bank.get(&key) else {
                warn!("[AMBIENCE] No buffer for layer {}, skipped", key);
                continue;
            };
            let mut source = BufferSource::new(key.clone(), buffer, true).with_gain(layer.gain);
            let connection = chain.connect();
            source.start();
            self.active.insert(
                key.clone(),
                EnvironmentalSource {
                    key,
                    theme: selected.name.to_string(),
                    layer: layer.name.to_string(),
                    source,
                    connection,
                },
            );
        }

        self.current_theme = Some(selected.name.to_string());
        info!(
            "[AMBIENCE] Theme '{}' started with {} layers",
            selected.name,
            self.active.len()
        );
        self.active.len()
    }

    /// Stop and deregister every source; safe to call repeatedly
    pub fn stop_all(&mut self, chain: &mut EffectChain) {
        if self.active.is_empty() {
            self.current_theme = None;
            return;
        }
        let count = self.active.len();
        for (key, mut source) in std::mem::take(&mut self.active) {
            if let Err(e) = source.stop() {
                debug!("[AMBIENCE] Ignored stop failure for {}: {}", key, e);
            }
            chain.disconnect(source.connection);
        }
        self.current_theme = None;
        debug!("[AMBIENCE] Stopped {} sources", count);
    }

    /// Mix every active layer into `out`
    pub fn render_into(&mut self, out: &mut AudioBuffer) {
        for source in self.active.values_mut() {
            source.source.render_into(out);
        }
    }

    /// Keys of the active sources, sorted
    pub fn active_keys(&self) -> Vec<String> {
        self.active.keys().cloned().collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn is_active(&self, key: &str) -> bool {
        self.active.contains_key(key)
    }

    pub fn source_mut(&mut self, key: &str) -> Option<&mut EnvironmentalSource> {
        self.active.get_mut(key)
    }

    pub fn current_theme(&self) -> Option<&str> {
        self.current_theme.as_deref()
    }

    pub fn bank(&self) -> &LayerBank {
        &self.bank
    }
}
