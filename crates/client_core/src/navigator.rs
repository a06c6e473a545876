//! Guild switching: keeps at most one channel sidebar open at a time.

use shared::domain::{ChannelId, GuildId};
use tracing::{info, warn};

use crate::{
    cache::ChannelCache,
    channel_tree::TreePath,
    sidebar::{ChannelSidebar, PendingListing},
};

#[derive(Default)]
pub struct SidebarNavigator {
    current: Option<ChannelSidebar>,
    expand_categories: bool,
}

/// Result of opening a guild: either the sidebar already shown, or a fresh
/// one whose listing still has to be fetched with the returned ticket.
#[derive(Debug)]
pub enum GuildOpened {
    AlreadyOpen,
    Opened(PendingListing),
}

impl SidebarNavigator {
    pub fn new(expand_categories: bool) -> Self {
        Self {
            current: None,
            expand_categories,
        }
    }

    pub fn current(&self) -> Option<&ChannelSidebar> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut ChannelSidebar> {
        self.current.as_mut()
    }

    pub fn guild_id(&self) -> Option<GuildId> {
        self.current.as_ref().map(ChannelSidebar::guild_id)
    }

    pub fn open_guild(&mut self, guild_id: GuildId, cache: &dyn ChannelCache) -> GuildOpened {
        if self.guild_id() == Some(guild_id) {
            return GuildOpened::AlreadyOpen;
        }
        self.close_guild();

        let mut sidebar =
            ChannelSidebar::new(guild_id).with_expanded_categories(self.expand_categories);
        if let Err(err) = sidebar.refresh_header(cache) {
            warn!(guild_id = guild_id.0, error = %err, "cannot load guild header");
        }
        let ticket = sidebar.begin_resync();
        self.current = Some(sidebar);
        info!(guild_id = guild_id.0, "opened guild");
        GuildOpened::Opened(ticket)
    }

    pub fn close_guild(&mut self) {
        if let Some(mut sidebar) = self.current.take() {
            sidebar.close();
        }
    }

    /// Makes sure the channel's guild is shown, then selects the channel.
    ///
    /// Returns the ticket to fetch with when a different guild had to be
    /// opened; the selection is applied once that listing lands.
    pub fn select_channel(
        &mut self,
        channel_id: ChannelId,
        cache: &dyn ChannelCache,
    ) -> Option<(Option<PendingListing>, Option<TreePath>)> {
        let Some(channel) = cache.channel(channel_id) else {
            warn!(channel_id = channel_id.0, "channel not found in cache");
            return None;
        };

        let ticket = match self.open_guild(channel.guild_id, cache) {
            GuildOpened::AlreadyOpen => None,
            GuildOpened::Opened(ticket) => Some(ticket),
        };
        let path = self.current.as_mut()?.select_channel(channel_id);
        Some((ticket, path))
    }
}

#[cfg(test)]
#[path = "tests/navigator_tests.rs"]
mod tests;
