use shared::domain::GuildId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("channel listing unavailable: {reason}")]
    FetchFailed { reason: String },
    #[error("channel listing for guild {actual} delivered to sidebar of guild {expected}")]
    GuildMismatch { expected: GuildId, actual: GuildId },
}

impl FetchError {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::FetchFailed {
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum SidebarError {
    #[error("cannot fetch channels for guild {guild_id}: {source}")]
    Fetch {
        guild_id: GuildId,
        #[source]
        source: FetchError,
    },
    #[error("guild {0} is not present in the cache")]
    UnknownGuild(GuildId),
}
