//! Error taxonomy surfaced by engine operations.
use thiserror::Error;

/// Why a reward could not be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RewardConflict {
    #[error("reward has already been used")]
    AlreadyUsed,
    #[error("reward has expired")]
    Expired,
}

/// What kind of record a lookup failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundKind {
    Spot,
    Reward,
}

impl std::fmt::Display for NotFoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Spot => f.write_str("spot"),
            Self::Reward => f.write_str("reward"),
        }
    }
}

#[derive(Debug, Error)]
pub enum TourError {
    #[error("invalid input: {0}")]
    Input(String),
    #[error("{kind} `{id}` not found")]
    NotFound { kind: NotFoundKind, id: String },
    #[error(transparent)]
    Conflict(#[from] RewardConflict),
    #[error("visitor store failed: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("stored record is malformed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TourError {
    pub fn input(reason: impl Into<String>) -> Self {
        Self::Input(reason.into())
    }

    pub fn spot_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: NotFoundKind::Spot,
            id: id.into(),
        }
    }

    pub fn reward_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: NotFoundKind::Reward,
            id: id.into(),
        }
    }

    /// True for failures that leave visitor state untouched and can be shown as-is.
    #[must_use]
    pub const fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::Input(_) | Self::NotFound { .. } | Self::Conflict(_)
        )
    }
}

/// Failure talking to a directions or content collaborator. Never escapes the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("provider timed out after {0} ms")]
    Timeout(u64),
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider returned malformed content: {0}")]
    Malformed(String),
}
