//! Cache key composition.
//!
//! A cache key pairs a stable identity with a per-state discriminator. If an
//! entity has no identity, or its key strategy declines to name the current
//! state, no key exists and the entity is excluded from both cache tiers:
//! it recomputes every time.

use std::fmt;

/// Composite cache key: a stable identity plus a per-state discriminator.
///
/// Two entities that compose the same key are expected to render identical
/// bytes; the engine does not verify this.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    identity: String,
    state: String,
}

impl CacheKey {
    /// Compose a cache key from an identity and an optional state key.
    ///
    /// Returns `None` when the identity is empty or no state key was
    /// supplied; both mean "do not cache". Pure and side-effect-free.
    pub fn compose(identity: &str, state: Option<&str>) -> Option<Self> {
        if identity.is_empty() {
            return None;
        }
        let state = state?;
        Some(Self {
            identity: identity.to_string(),
            state: state.to_string(),
        })
    }

    /// The identity scoping all entries for one logical entity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// The per-state discriminator.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Directory name for this key's identity under the cache root.
    pub(crate) fn dir_name(&self) -> String {
        encode_segment(&self.identity)
    }

    /// File name for this key's state within the identity directory.
    pub(crate) fn file_name(&self) -> String {
        format!("{}.blob", encode_segment(&self.state))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.identity, self.state)
    }
}

/// Escape an opaque key into a single safe path segment.
///
/// Alphanumerics, `-` and `_` pass through; every other byte becomes `%XX`.
/// Dots are escaped too, so no key can form `.`, `..`, or a nested path.
/// The mapping is injective, so distinct keys never collide on disk.
pub(crate) fn encode_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for &byte in raw.as_bytes() {
        match byte {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => out.push(byte as char),
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Strategy that names an entity's current state for caching purposes.
///
/// Returning `None` marks the state as not worth caching: the entity will
/// recompute for that state on every request. The default choice,
/// [`NoCaching`], does exactly that for every state, so caching is strictly
/// opt-in per concrete use.
///
/// Closures of the right shape implement the trait directly:
///
/// ```
/// use layer_cache::StateKeyStrategy;
///
/// let strategy = |state: &u32| Some(format!("v{state}"));
/// assert_eq!(strategy.state_key(&7), Some("v7".to_string()));
/// ```
pub trait StateKeyStrategy<S: ?Sized>: Send + Sync {
    /// Produce the state key for `state`, or `None` to bypass the cache.
    fn state_key(&self, state: &S) -> Option<String>;
}

/// Default strategy: no state is ever cached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCaching;

impl<S: ?Sized> StateKeyStrategy<S> for NoCaching {
    fn state_key(&self, _state: &S) -> Option<String> {
        None
    }
}

impl<S: ?Sized, F> StateKeyStrategy<S> for F
where
    F: Fn(&S) -> Option<String> + Send + Sync,
{
    fn state_key(&self, state: &S) -> Option<String> {
        self(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compose_requires_identity_and_state() {
        assert!(CacheKey::compose("", Some("idle")).is_none());
        assert!(CacheKey::compose("avatar-1", None).is_none());
        assert!(CacheKey::compose("", None).is_none());

        let key = CacheKey::compose("avatar-1", Some("idle")).unwrap();
        assert_eq!(key.identity(), "avatar-1");
        assert_eq!(key.state(), "idle");
    }

    #[test]
    fn display_shows_both_parts() {
        let key = CacheKey::compose("avatar-1", Some("idle")).unwrap();
        assert_eq!(key.to_string(), "avatar-1/idle");
    }

    #[test]
    fn encode_passes_safe_characters() {
        assert_eq!(encode_segment("avatar-1_idle"), "avatar-1_idle");
    }

    #[test]
    fn encode_escapes_path_characters() {
        assert_eq!(encode_segment(".."), "%2E%2E");
        assert_eq!(encode_segment("a/b"), "a%2Fb");
        assert_eq!(encode_segment("a b.c"), "a%20b%2Ec");
    }

    #[test]
    fn encode_is_injective_for_lookalikes() {
        // Keys that would collide under naive sanitization stay distinct.
        assert_ne!(encode_segment("a/b"), encode_segment("a%2Fb"));
        assert_ne!(encode_segment("a b"), encode_segment("a_b"));
    }

    #[test]
    fn no_caching_strategy_declines_everything() {
        let strategy = NoCaching;
        assert_eq!(StateKeyStrategy::<str>::state_key(&strategy, "idle"), None);
        assert_eq!(StateKeyStrategy::<u32>::state_key(&strategy, &42), None);
    }

    #[test]
    fn closure_strategy() {
        let strategy = |state: &str| {
            if state.is_empty() {
                None
            } else {
                Some(state.to_uppercase())
            }
        };
        assert_eq!(strategy.state_key("idle"), Some("IDLE".to_string()));
        assert_eq!(strategy.state_key(""), None);
    }
}
