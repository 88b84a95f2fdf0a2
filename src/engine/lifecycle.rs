//! Engine lifecycle state machine
//!
//! `Uninitialized --init--> Initializing --(chains + profiles built)--> Ready`.
//! A failed initialization falls back to `Uninitialized` so `init` can be
//! resent.

use std::fmt;

use tracing::debug;

/// Lifecycle states of the audio engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineState {
    /// Constructed, nothing built yet (default state)
    #[default]
    Uninitialized,
    /// Building chains, generators and the profile registry
    Initializing,
    /// Accepting speech, ambience and master commands
    Ready,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineState::Uninitialized => write!(f, "Uninitialized"),
            EngineState::Initializing => write!(f, "Initializing"),
            EngineState::Ready => write!(f, "Ready"),
        }
    }
}

/// Tracks the current lifecycle state and enforces legal transitions
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    state: EngineState,
    /// Number of init attempts, successful or not
    attempts: u32,
}

impl Lifecycle {
    /// Create a lifecycle in the `Uninitialized` state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> EngineState {
        self.state
    }

    /// Check if the engine accepts runtime commands
    pub fn is_ready(&self) -> bool {
        self.state == EngineState::Ready
    }

    /// Number of init attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Enter `Initializing`
    ///
    /// Returns false when the engine is already `Ready`; the caller then
    /// re-acknowledges without rebuilding.
    pub fn begin_init(&mut self) -> bool {
        match self.state {
            EngineState::Ready => {
                debug!("[LIFECYCLE] Already ready, init ignored");
                false
            }
            EngineState::Uninitialized | EngineState::Initializing => {
                self.attempts += 1;
                self.state = EngineState::Initializing;
                debug!("[LIFECYCLE] Initializing (attempt {})", self.attempts);
                true
            }
        }
    }

    /// `Initializing -> Ready`
    pub fn complete(&mut self) {
        if self.state == EngineState::Initializing {
            self.state = EngineState::Ready;
            debug!("[LIFECYCLE] Ready");
        }
    }

    /// `Initializing -> Uninitialized`
    pub fn fail(&mut self) {
        if self.state == EngineState::Initializing {
            self.state = EngineState::Uninitialized;
            debug!("[LIFECYCLE] Initialization failed, back to Uninitialized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_uninitialized() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), EngineState::Uninitialized);
        assert!(!lifecycle.is_ready());
    }

    #[test]
    fn test_successful_init() {
        let mut lifecycle = Lifecycle::new();
        assert!(lifecycle.begin_init());
        assert_eq!(lifecycle.state(), EngineState::Initializing);
        lifecycle.complete();
        assert!(lifecycle.is_ready());
        assert!(!lifecycle.begin_init());
        assert_eq!(lifecycle.attempts(), 1);
    }

    #[test]
    fn test_failed_init_can_retry() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.begin_init();
        lifecycle.fail();
        assert_eq!(lifecycle.state(), EngineState::Uninitialized);

        assert!(lifecycle.begin_init());
        lifecycle.complete();
        assert!(lifecycle.is_ready());
        assert_eq!(lifecycle.attempts(), 2);
    }

    #[test]
    fn test_complete_requires_initializing() {
        let mut lifecycle = Lifecycle::new();
        lifecycle.complete();
        assert_eq!(lifecycle.state(), EngineState::Uninitialized);
    }

    #[test]
    fn test_display() {
        assert_eq!(EngineState::Ready.to_string(), "Ready");
    }
}
