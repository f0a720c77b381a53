//! Two-tier cache for expensive, deterministic render output.
//!
//! Components that draw a fixed artifact (typically a bitmap) as a pure
//! function of (identity, state) can skip recomputation: results are pooled
//! in a bounded in-memory tier and persisted to a durable on-disk tier.
//! [`RenderGate`] coordinates both and guarantees at most one concurrent
//! production per key, so concurrent callers for the same state share a
//! single render.
//!
//! Caching is strictly opt-in per state: a [`StateKeyStrategy`] names the
//! states worth caching, and the default strategy ([`NoCaching`]) names
//! none, in which case every request recomputes and neither tier is touched.
//!
//! ```no_run
//! use layer_cache::{Artifact, CacheConfig, CacheKey, RenderGate};
//!
//! # fn main() -> Result<(), layer_cache::CacheError> {
//! let gate = RenderGate::new(&CacheConfig::default())?;
//!
//! let key = CacheKey::compose("avatar-1", Some("idle"));
//! let outcome = gate.ensure_cached(key, || {
//!     // Expensive draw, runs at most once for this key.
//!     Ok(Artifact::from(vec![0u8; 64 * 64 * 4]))
//! })?;
//!
//! if outcome.produced {
//!     println!("rendered {} bytes", outcome.artifact.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod config;
pub mod disk;
pub mod entity;
pub mod error;
pub mod gate;
pub mod key;
pub mod memory;

pub use artifact::Artifact;
pub use config::{CacheConfig, ConfigError};
pub use disk::DiskStore;
pub use entity::CacheableEntity;
pub use error::{CacheError, ProduceError};
pub use gate::{RenderGate, RenderOutcome};
pub use key::{CacheKey, NoCaching, StateKeyStrategy};
pub use memory::{MemoryCache, MemoryCacheStats};
