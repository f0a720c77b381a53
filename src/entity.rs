//! Adapter surface for cacheable rendering components.
//!
//! Embedding code implements [`CacheableEntity`] on whatever owns the visual
//! state, injects a [`StateKeyStrategy`] that names the states worth
//! caching, and calls [`RenderGate::ensure_entity`]. This replaces the
//! subclass-override hook of a class hierarchy with plain capability
//! injection.

use crate::artifact::Artifact;
use crate::error::{CacheError, ProduceError};
use crate::gate::{RenderGate, RenderOutcome};
use crate::key::{CacheKey, StateKeyStrategy};

/// A component whose rendered output can be cached by identity and state.
pub trait CacheableEntity {
    /// State value the key strategy inspects.
    type State: ?Sized;

    /// Stable identity scoping this entity's cache entries.
    ///
    /// Must be set for caching to work; `None` or an empty string disables
    /// caching for this entity entirely.
    fn identity(&self) -> Option<&str>;

    /// The entity's current state.
    fn state(&self) -> &Self::State;

    /// Render the artifact for the current state.
    ///
    /// Must be deterministic for a given (identity, state key) pair: two
    /// entities composing the same cache key are assumed to render the same
    /// bytes.
    fn produce(&self) -> Result<Artifact, ProduceError>;
}

impl RenderGate {
    /// Ensure the entity's current state is cached, rendering at most once.
    ///
    /// Composes the cache key from the entity's identity and the injected
    /// strategy, then delegates to
    /// [`ensure_cached`](RenderGate::ensure_cached). When the strategy
    /// declines the current state (as [`NoCaching`](crate::key::NoCaching)
    /// always does), the entity renders every time and neither tier is
    /// touched.
    pub fn ensure_entity<E>(
        &self,
        entity: &E,
        strategy: &dyn StateKeyStrategy<E::State>,
    ) -> Result<RenderOutcome, CacheError>
    where
        E: CacheableEntity,
    {
        let key = entity.identity().and_then(|identity| {
            let state_key = strategy.state_key(entity.state());
            CacheKey::compose(identity, state_key.as_deref())
        });
        self.ensure_cached(key, || entity.produce())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::key::NoCaching;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Avatar {
        id: Option<String>,
        mood: String,
        renders: AtomicUsize,
    }

    impl Avatar {
        fn new(id: Option<&str>, mood: &str) -> Self {
            Self {
                id: id.map(str::to_string),
                mood: mood.to_string(),
                renders: AtomicUsize::new(0),
            }
        }
    }

    impl CacheableEntity for Avatar {
        type State = str;

        fn identity(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn state(&self) -> &str {
            &self.mood
        }

        fn produce(&self) -> Result<Artifact, ProduceError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            Ok(Artifact::from(self.mood.as_bytes().to_vec()))
        }
    }

    fn open_gate() -> (RenderGate, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let gate = RenderGate::new(&CacheConfig::new(dir.path())).unwrap();
        (gate, dir)
    }

    #[test]
    fn strategy_names_cacheable_states() {
        let (gate, _dir) = open_gate();
        let avatar = Avatar::new(Some("avatar-1"), "idle");
        let strategy = |mood: &str| Some(mood.to_string());

        let first = gate.ensure_entity(&avatar, &strategy).unwrap();
        assert!(first.produced);
        assert_eq!(first.artifact.bytes(), b"idle");

        let second = gate.ensure_entity(&avatar, &strategy).unwrap();
        assert!(!second.produced);
        assert_eq!(avatar.renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn default_strategy_never_caches() {
        let (gate, _dir) = open_gate();
        let avatar = Avatar::new(Some("avatar-1"), "idle");

        for _ in 0..3 {
            let outcome = gate.ensure_entity(&avatar, &NoCaching).unwrap();
            assert!(outcome.produced);
        }

        assert_eq!(avatar.renders.load(Ordering::SeqCst), 3);
        assert!(gate.memory().is_empty());
        assert_eq!(gate.disk_usage_for("avatar-1").unwrap(), 0);
    }

    #[test]
    fn missing_identity_disables_caching() {
        let (gate, _dir) = open_gate();
        let avatar = Avatar::new(None, "idle");
        let strategy = |mood: &str| Some(mood.to_string());

        let outcome = gate.ensure_entity(&avatar, &strategy).unwrap();
        assert!(outcome.produced);
        let outcome = gate.ensure_entity(&avatar, &strategy).unwrap();
        assert!(outcome.produced);

        assert_eq!(avatar.renders.load(Ordering::SeqCst), 2);
        assert!(gate.memory().is_empty());
    }

    #[test]
    fn declined_state_recomputes() {
        let (gate, _dir) = open_gate();
        let avatar = Avatar::new(Some("avatar-1"), "transient");
        // Only "idle" is worth caching; everything else recomputes.
        let strategy = |mood: &str| (mood == "idle").then(|| mood.to_string());

        let outcome = gate.ensure_entity(&avatar, &strategy).unwrap();
        assert!(outcome.produced);
        let outcome = gate.ensure_entity(&avatar, &strategy).unwrap();
        assert!(outcome.produced);
        assert_eq!(gate.disk_usage_for("avatar-1").unwrap(), 0);
    }
}
