use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(raw: &str) -> Result<Self, Self::Err> {
                raw.trim()
                    .parse::<i64>()
                    .map($name)
                    .map_err(|_| DomainError::InvalidId(raw.to_string()))
            }
        }
    };
}

id_newtype!(GuildId);
id_newtype!(ChannelId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    Category,
    Text,
    Voice,
    Thread,
    Forum,
}

/// What a row of a given kind does when the user activates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivationBehavior {
    /// Rows without messages: clicking flips the expanded state.
    ToggleExpanded,
    /// Channels with messages: clicking reveals and expands the row, never
    /// collapses it, and opens the channel.
    ExpandTo,
    /// Leaf rows with messages: clicking only opens them.
    Open,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 5] = [
        ChannelKind::Category,
        ChannelKind::Text,
        ChannelKind::Voice,
        ChannelKind::Thread,
        ChannelKind::Forum,
    ];

    /// Whether a node of this kind may hold a child of `child` kind.
    pub fn may_contain(self, child: ChannelKind) -> bool {
        match self {
            ChannelKind::Category => matches!(
                child,
                ChannelKind::Text | ChannelKind::Voice | ChannelKind::Forum
            ),
            ChannelKind::Text | ChannelKind::Forum => child == ChannelKind::Thread,
            ChannelKind::Voice | ChannelKind::Thread => false,
        }
    }

    /// Whether selecting this kind opens a message view.
    pub fn is_openable(self) -> bool {
        matches!(
            self,
            ChannelKind::Text | ChannelKind::Voice | ChannelKind::Thread
        )
    }

    pub fn activation(self) -> ActivationBehavior {
        match self {
            ChannelKind::Category | ChannelKind::Forum => ActivationBehavior::ToggleExpanded,
            ChannelKind::Text | ChannelKind::Voice => ActivationBehavior::ExpandTo,
            ChannelKind::Thread => ActivationBehavior::Open,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelKind::Category => "category",
            ChannelKind::Text => "text",
            ChannelKind::Voice => "voice",
            ChannelKind::Thread => "thread",
            ChannelKind::Forum => "forum",
        }
    }
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChannelKind {
    type Err = DomainError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let lower = raw.trim().to_ascii_lowercase();
        ChannelKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| DomainError::UnknownChannelKind(raw.to_string()))
    }
}
