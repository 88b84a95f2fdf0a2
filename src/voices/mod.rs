//! Character voice profile registry
//!
//! Fixed table of character voices: pitch and rate multipliers, a voice
//! category, the ordered voice effects to route through and an informational
//! personality bundle. Lookups never fail; an unknown character gets the
//! passthrough profile.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Id of the passthrough profile returned for unknown characters
pub const PASSTHROUGH_ID: &str = "default";

/// Broad delivery style of a voice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceCategory {
    Neutral,
    Gruff,
    Nervous,
    Enthusiastic,
    Military,
    Cartoon,
}

impl VoiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceCategory::Neutral => "neutral",
            VoiceCategory::Gruff => "gruff",
            VoiceCategory::Nervous => "nervous",
            VoiceCategory::Enthusiastic => "enthusiastic",
            VoiceCategory::Military => "military",
            VoiceCategory::Cartoon => "cartoon",
        }
    }
}

impl fmt::Display for VoiceCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Effect a voice is routed through
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceEffect {
    /// The radio chain
    Radio,
    /// The underwater chain
    Underwater,
    /// The standalone chorus insert
    Chorus,
}

impl VoiceEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoiceEffect::Radio => "radio",
            VoiceEffect::Underwater => "underwater",
            VoiceEffect::Chorus => "chorus",
        }
    }
}

impl fmt::Display for VoiceEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Delivery hints for the speech subsystem; not used for processing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Personality {
    pub pause_style: String,
    pub emphasis_style: String,
    pub breathing_style: String,
}

impl Personality {
    fn new(pause: &str, emphasis: &str, breathing: &str) -> Self {
        Self {
            pause_style: pause.to_string(),
            emphasis_style: emphasis.to_string(),
            breathing_style: breathing.to_string(),
        }
    }
}

/// Immutable voice description for one character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CharacterProfile {
    pub id: String,
    /// Playback-rate multiplier applied to the speech buffer
    pub pitch: f32,
    /// Speaking-rate multiplier for the synthesis side
    pub rate: f32,
    pub category: VoiceCategory,
    /// Effects applied in order
    pub effects: Vec<VoiceEffect>,
    pub personality: Personality,
}

impl CharacterProfile {
    /// Identity profile: unity multipliers and no effects
    pub fn passthrough() -> Self {
        Self {
            id: PASSTHROUGH_ID.to_string(),
            pitch: 1.0,
            rate: 1.0,
            category: VoiceCategory::Neutral,
            effects: Vec::new(),
            personality: Personality::new("natural", "natural", "natural"),
        }
    }

    pub fn is_passthrough(&self) -> bool {
        self.id == PASSTHROUGH_ID
    }
}

/// O(1) character lookup with a passthrough fallback
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, CharacterProfile>,
    passthrough: CharacterProfile,
}

impl ProfileRegistry {
    /// Empty registry; every lookup returns the passthrough profile
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            passthrough: CharacterProfile::passthrough(),
        }
    }

    /// Registry holding the built-in cast
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();

        registry.register(CharacterProfile {
            id: "quint".to_string(),
            pitch: 0.85,
            rate: 0.92,
            category: VoiceCategory::Gruff,
            effects: vec![],
            personality: Personality::new("deliberate", "growled", "heavy"),
        });
        registry.register(CharacterProfile {
            id: "nedry".to_string(),
            pitch: 1.08,
            rate: 1.25,
            category: VoiceCategory::Nervous,
            effects: vec![],
            personality: Personality::new("rushed", "whiny", "shallow"),
        });
        registry.register(CharacterProfile {
            id: "hammond".to_string(),
            pitch: 1.05,
            rate: 1.05,
            category: VoiceCategory::Enthusiastic,
            effects: vec![],
            personality: Personality::new("warm", "expansive", "relaxed"),
        });
        registry.register(CharacterProfile {
            id: "muldoon".to_string(),
            pitch: 0.95,
            rate: 0.95,
            category: VoiceCategory::Military,
            effects: vec![VoiceEffect::Radio],
            personality: Personality::new("clipped", "flat", "controlled"),
        });
        registry.register(CharacterProfile {
            id: "mr_dna".to_string(),
            pitch: 1.6,
            rate: 1.15,
            category: VoiceCategory::Cartoon,
            effects: vec![VoiceEffect::Chorus],
            personality: Personality::new("bouncy", "exaggerated", "none"),
        });

        registry
    }

    /// Add or replace a profile
    pub fn register(&mut self, profile: CharacterProfile) {
        self.profiles.insert(profile.id.clone(), profile);
    }

    /// Profile for `id`, or None if unknown
    pub fn get(&self, id: &str) -> Option<&CharacterProfile> {
        self.profiles.get(id)
    }

    /// Profile for `id`, falling back to passthrough
    pub fn lookup(&self, id: &str) -> &CharacterProfile {
        self.profiles.get(id).unwrap_or(&self.passthrough)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.profiles.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// All profiles sorted by id
    pub fn list(&self) -> Vec<&CharacterProfile> {
        let mut profiles: Vec<_> = self.profiles.values().collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        profiles
    }
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_profiles() {
        let registry = ProfileRegistry::with_defaults();
        assert_eq!(registry.len(), 5);

        let quint = registry.lookup("quint");
        assert_eq!(quint.pitch, 0.85);
        assert_eq!(quint.rate, 0.92);
        assert_eq!(quint.category, VoiceCategory::Gruff);
        assert!(quint.effects.is_empty());

        let muldoon = registry.lookup("muldoon");
        assert_eq!(muldoon.effects, vec![VoiceEffect::Radio]);
        assert_eq!(muldoon.category, VoiceCategory::Military);

        let dna = registry.lookup("mr_dna");
        assert_eq!(dna.pitch, 1.6);
        assert_eq!(dna.rate, 1.15);
        assert_eq!(dna.effects, vec![VoiceEffect::Chorus]);
    }

    #[test]
    fn test_unknown_profile_is_passthrough() {
        let registry = ProfileRegistry::with_defaults();
        let profile = registry.lookup("velociraptor");
        assert!(profile.is_passthrough());
        assert_eq!(profile.pitch, 1.0);
        assert_eq!(profile.rate, 1.0);
        assert!(profile.effects.is_empty());
        assert!(registry.get("velociraptor").is_none());
    }

    #[test]
    fn test_list_is_sorted() {
        let registry = ProfileRegistry::with_defaults();
        let ids: Vec<_> = registry.list().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["hammond", "mr_dna", "muldoon", "nedry", "quint"]);
    }

    #[test]
    fn test_profile_serializes_for_the_wire() {
        let registry = ProfileRegistry::with_defaults();
        let json = serde_json::to_value(registry.lookup("muldoon")).unwrap();
        assert_eq!(json["effects"][0], "radio");
        assert_eq!(json["category"], "military");
        assert_eq!(json["personality"]["pauseStyle"], "clipped");
    }
}
