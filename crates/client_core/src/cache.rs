//! Seams to the local entity cache the sidebar reads from.

use std::{
    collections::HashMap,
    sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use shared::{
    domain::{ChannelId, GuildId},
    protocol::{ChannelRecord, GatewayEvent, GuildRecord},
};
use tracing::debug;

use crate::error::FetchError;

/// Point lookups answered synchronously from cached state.
pub trait ChannelCache: Send + Sync {
    fn channel(&self, channel_id: ChannelId) -> Option<ChannelRecord>;
    fn unread_count(&self, channel_id: ChannelId) -> Option<u32>;
    fn guild(&self, guild_id: GuildId) -> Option<GuildRecord>;
}

/// Full channel listings, which may need a round trip.
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn guild_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRecord>, FetchError>;
}

pub struct MissingChannelDirectory;

#[async_trait]
impl ChannelDirectory for MissingChannelDirectory {
    async fn guild_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRecord>, FetchError> {
        Err(FetchError::failed(format!(
            "no channel directory configured for guild {guild_id}"
        )))
    }
}

#[derive(Default)]
struct CacheState {
    guilds: HashMap<GuildId, GuildRecord>,
    channels: HashMap<ChannelId, ChannelRecord>,
    listing_failure: Option<String>,
}

/// Cache backed by plain maps; stands in for the client's state store.
#[derive(Default)]
pub struct InMemoryChannelCache {
    state: RwLock<CacheState>,
}

impl InMemoryChannelCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(guilds: Vec<GuildRecord>, channels: Vec<ChannelRecord>) -> Self {
        let cache = Self::new();
        for guild in guilds {
            cache.upsert_guild(guild);
        }
        for channel in channels {
            cache.upsert_channel(channel);
        }
        cache
    }

    pub fn upsert_guild(&self, guild: GuildRecord) {
        self.write(|state| {
            state.guilds.insert(guild.guild_id, guild);
        });
    }

    pub fn upsert_channel(&self, channel: ChannelRecord) {
        self.write(|state| {
            state.channels.insert(channel.channel_id, channel);
        });
    }

    pub fn remove_channel(&self, channel_id: ChannelId) -> Option<ChannelRecord> {
        self.write(|state| state.channels.remove(&channel_id))
    }

    pub fn set_unread(&self, channel_id: ChannelId, count: u32) -> bool {
        self.write(|state| match state.channels.get_mut(&channel_id) {
            Some(channel) => {
                channel.unread_count = count;
                true
            }
            None => false,
        })
    }

    pub fn set_voice_participants(&self, channel_id: ChannelId, participants: u32) -> bool {
        self.write(|state| match state.channels.get_mut(&channel_id) {
            Some(channel) => {
                channel.voice_participants = participants;
                true
            }
            None => false,
        })
    }

    /// Makes every following listing fail until cleared with `None`.
    pub fn fail_listings_with(&self, reason: Option<String>) {
        self.write(|state| state.listing_failure = reason);
    }

    /// Folds a gateway event into cached state, the way the state store is
    /// updated before view handlers run.
    pub fn apply_event(&self, event: &GatewayEvent) {
        match event {
            GatewayEvent::ReadUpdate {
                channel_id,
                unread_count,
            } => {
                self.set_unread(*channel_id, *unread_count);
            }
            GatewayEvent::GuildUpdate { guild } => self.upsert_guild(guild.clone()),
            GatewayEvent::ChannelCreate { channel }
            | GatewayEvent::ChannelUpdate { channel }
            | GatewayEvent::ThreadCreate { channel }
            | GatewayEvent::ThreadUpdate { channel } => self.upsert_channel(channel.clone()),
            GatewayEvent::ChannelDelete { channel_id, .. }
            | GatewayEvent::ThreadDelete { channel_id, .. } => {
                self.remove_channel(*channel_id);
            }
            GatewayEvent::VoiceStateUpdate {
                channel_id,
                participants,
                ..
            } => {
                self.set_voice_participants(*channel_id, *participants);
            }
            GatewayEvent::ThreadListSync { .. } => {}
        }
    }

    fn read<T>(&self, f: impl FnOnce(&CacheState) -> T) -> T {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&state)
    }

    fn write<T>(&self, f: impl FnOnce(&mut CacheState) -> T) -> T {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }
}

impl ChannelCache for InMemoryChannelCache {
    fn channel(&self, channel_id: ChannelId) -> Option<ChannelRecord> {
        self.read(|state| state.channels.get(&channel_id).cloned())
    }

    fn unread_count(&self, channel_id: ChannelId) -> Option<u32> {
        self.read(|state| {
            state
                .channels
                .get(&channel_id)
                .map(|channel| channel.unread_count)
        })
    }

    fn guild(&self, guild_id: GuildId) -> Option<GuildRecord> {
        self.read(|state| state.guilds.get(&guild_id).cloned())
    }
}

#[async_trait]
impl ChannelDirectory for InMemoryChannelCache {
    async fn guild_channels(&self, guild_id: GuildId) -> Result<Vec<ChannelRecord>, FetchError> {
        self.read(|state| {
            if let Some(reason) = &state.listing_failure {
                return Err(FetchError::failed(reason.clone()));
            }
            let mut channels: Vec<ChannelRecord> = state
                .channels
                .values()
                .filter(|channel| channel.guild_id == guild_id)
                .cloned()
                .collect();
            channels.sort_by_key(|channel| channel.channel_id);
            debug!(
                guild_id = guild_id.0,
                channels = channels.len(),
                "listed guild channels"
            );
            Ok(channels)
        })
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
