//! Error types raised by the draw engine and its persistence port.
use thiserror::Error;

/// Coarse classification of a [`GachaError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller supplied a value outside the accepted domain.
    InvalidArgument,
    /// A named preset, tier or table could not be resolved.
    ConfigurationMissing,
    /// Reading or writing persisted state failed. Never fatal to the engine.
    PersistenceFailure,
}

/// Errors raised by the gacha engine.
#[derive(Debug, Error)]
pub enum GachaError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("unknown preset `{0}`")]
    UnknownPreset(String),
    #[error("unknown tier `{0}`")]
    UnknownTier(String),
    #[error("invalid tier table: {0}")]
    InvalidTable(String),
    #[error("storage failure for `{key}`: {message}")]
    Persistence { key: String, message: String },
    #[error("state serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl GachaError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::UnknownPreset(_) | Self::UnknownTier(_) | Self::InvalidTable(_) => {
                ErrorKind::ConfigurationMissing
            }
            Self::Persistence { .. } | Self::Serialization(_) => ErrorKind::PersistenceFailure,
        }
    }

    pub(crate) fn persistence(key: &str, err: &impl std::fmt::Display) -> Self {
        Self::Persistence {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T, E = GachaError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_group_variants() {
        assert_eq!(
            GachaError::InvalidArgument("x".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(
            GachaError::UnknownPreset("GOLD".into()).kind(),
            ErrorKind::ConfigurationMissing
        );
        assert_eq!(
            GachaError::UnknownTier("shiny".into()).kind(),
            ErrorKind::ConfigurationMissing
        );
        assert_eq!(
            GachaError::persistence("gacha_history", &"quota exceeded").kind(),
            ErrorKind::PersistenceFailure
        );
    }

    #[test]
    fn messages_name_the_offender() {
        let err = GachaError::UnknownPreset("GOLD".into());
        assert_eq!(err.to_string(), "unknown preset `GOLD`");
        let err = GachaError::persistence("gacha_state", &"disk full");
        assert!(err.to_string().contains("gacha_state"));
        assert!(err.to_string().contains("disk full"));
    }
}
