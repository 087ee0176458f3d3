//! Error types for the affinity core library.

use thiserror::Error;

/// Top-level error type for all affinity operations.
///
/// Play-time operations (recording, scoring, evaluation, compaction, ticks)
/// are infallible. Errors surface when content is defined, configuration is
/// parsed, or persisted state is restored.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AffinityError {
    /// An affordance declares an output handle outside the allowlist.
    #[error("Affordance {affordance} emits handle {handle}, which is not on the allowlist")]
    HandleNotAllowed {
        /// Affordance that declared the handle.
        affordance: String,
        /// The rejected handle.
        handle: String,
    },

    /// An affordance declares more numeric handles than permitted.
    #[error("Affordance {affordance} declares {count} handles (max {max})")]
    TooManyHandles {
        /// Affordance that declared the handles.
        affordance: String,
        /// Handles declared.
        count: usize,
        /// Maximum allowed.
        max: usize,
    },

    /// A narrative string leaks mechanics to the player.
    #[error("Tell for {affordance} ({pool}) contains forbidden pattern {pattern:?}: {tell:?}")]
    ForbiddenTell {
        /// Affordance owning the pool.
        affordance: String,
        /// Pool name (band or tier).
        pool: String,
        /// Pattern that matched.
        pattern: String,
        /// Offending text.
        tell: String,
    },

    /// A narrative pool that can be drawn from has no entries.
    #[error("Affordance {affordance} has an empty tell pool: {pool}")]
    EmptyTellPool {
        /// Affordance owning the pool.
        affordance: String,
        /// Pool name.
        pool: String,
    },

    /// A descriptor's numbers are inconsistent (thresholds, probabilities).
    #[error("Affordance {affordance} is misconfigured: {reason}")]
    InvalidDescriptor {
        /// Affordance that failed.
        affordance: String,
        /// Why it failed.
        reason: String,
    },

    /// Several definition-time failures collected from one catalog.
    #[error("Affordance catalog rejected with {} error(s): {}", .0.len(), summarize(.0))]
    CatalogInvalid(Vec<AffinityError>),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Restored state belongs to a different place.
    #[error("State mismatch: expected place {expected}, found {found}")]
    StateMismatch {
        /// Id of the place being restored.
        expected: String,
        /// Id recorded in the state.
        found: String,
    },

    /// A composite trace key could not be split back into its parts.
    #[error("Malformed trace key: {0:?}")]
    MalformedTraceKey(String),

    /// Recomputing a snapshot's affinity disagrees with the stored value.
    #[error("Snapshot drift: stored affinity {stored}, recomputed {recomputed}")]
    SnapshotDrift {
        /// Affinity captured at evaluation time.
        stored: f64,
        /// Affinity recomputed from frozen inputs.
        recomputed: f64,
    },

    /// An affordance name did not match any known kind.
    #[error("Unknown affordance: {0}")]
    UnknownAffordance(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn summarize(errors: &[AffinityError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for AffinityError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, AffinityError>;
