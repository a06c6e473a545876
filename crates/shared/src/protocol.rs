use serde::{Deserialize, Serialize};

use crate::domain::{ChannelId, ChannelKind, GuildId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuildRecord {
    pub guild_id: GuildId,
    pub name: String,
}

/// One channel as listed by the local entity cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<ChannelId>,
    pub kind: ChannelKind,
    pub name: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub unread_count: u32,
    #[serde(default)]
    pub voice_participants: u32,
}

impl ChannelRecord {
    pub fn new(
        channel_id: ChannelId,
        guild_id: GuildId,
        kind: ChannelKind,
        name: impl Into<String>,
    ) -> Self {
        Self {
            channel_id,
            guild_id,
            parent_id: None,
            kind,
            name: name.into(),
            position: 0,
            unread_count: 0,
            voice_participants: 0,
        }
    }

    pub fn with_parent(mut self, parent_id: ChannelId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    pub fn with_unread(mut self, unread_count: u32) -> Self {
        self.unread_count = unread_count;
        self
    }
}

/// Gateway notifications the channel sidebar reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum GatewayEvent {
    ReadUpdate {
        channel_id: ChannelId,
        unread_count: u32,
    },
    GuildUpdate {
        guild: GuildRecord,
    },
    ThreadListSync {
        guild_id: GuildId,
    },
    ChannelCreate {
        channel: ChannelRecord,
    },
    ChannelUpdate {
        channel: ChannelRecord,
    },
    ChannelDelete {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
    ThreadCreate {
        channel: ChannelRecord,
    },
    ThreadUpdate {
        channel: ChannelRecord,
    },
    ThreadDelete {
        guild_id: GuildId,
        channel_id: ChannelId,
    },
    VoiceStateUpdate {
        guild_id: GuildId,
        channel_id: ChannelId,
        participants: u32,
    },
}

impl GatewayEvent {
    /// Guild the event is scoped to. Read updates carry only a channel.
    pub fn guild_id(&self) -> Option<GuildId> {
        match self {
            GatewayEvent::ReadUpdate { .. } => None,
            GatewayEvent::GuildUpdate { guild } => Some(guild.guild_id),
            GatewayEvent::ThreadListSync { guild_id }
            | GatewayEvent::ChannelDelete { guild_id, .. }
            | GatewayEvent::ThreadDelete { guild_id, .. }
            | GatewayEvent::VoiceStateUpdate { guild_id, .. } => Some(*guild_id),
            GatewayEvent::ChannelCreate { channel }
            | GatewayEvent::ChannelUpdate { channel }
            | GatewayEvent::ThreadCreate { channel }
            | GatewayEvent::ThreadUpdate { channel } => Some(channel.guild_id),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GatewayEvent::ReadUpdate { .. } => "read_update",
            GatewayEvent::GuildUpdate { .. } => "guild_update",
            GatewayEvent::ThreadListSync { .. } => "thread_list_sync",
            GatewayEvent::ChannelCreate { .. } => "channel_create",
            GatewayEvent::ChannelUpdate { .. } => "channel_update",
            GatewayEvent::ChannelDelete { .. } => "channel_delete",
            GatewayEvent::ThreadCreate { .. } => "thread_create",
            GatewayEvent::ThreadUpdate { .. } => "thread_update",
            GatewayEvent::ThreadDelete { .. } => "thread_delete",
            GatewayEvent::VoiceStateUpdate { .. } => "voice_state_update",
        }
    }
}
