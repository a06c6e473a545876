//! Channel sidebar controller for one opened guild.
//!
//! The controller owns the guild's [`ChannelTree`], the expansion and
//! selection state layered on top of it, and the lifetime token that decides
//! whether an asynchronously fetched channel listing may still be applied.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
};

use shared::{
    domain::{ActivationBehavior, ChannelId, GuildId},
    protocol::{ChannelRecord, GatewayEvent},
};
use tracing::{debug, info, warn};

use crate::{
    cache::{ChannelCache, ChannelDirectory},
    channel_tree::{Change, ChannelTree, TreePath},
    error::{FetchError, SidebarError},
};

/// Validity token shared between a sidebar and the listings it requested.
#[derive(Debug, Clone, Default)]
pub struct Lifetime {
    generation: Arc<AtomicU64>,
    closed: Arc<AtomicBool>,
}

impl Lifetime {
    fn advance(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, generation: u64) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.generation.load(Ordering::SeqCst) == generation
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Ticket for one outstanding channel listing.
#[derive(Debug, Clone)]
pub struct PendingListing {
    guild_id: GuildId,
    generation: u64,
    lifetime: Lifetime,
}

impl PendingListing {
    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    /// False once the sidebar closed or issued a newer listing request.
    pub fn is_current(&self) -> bool {
        self.lifetime.is_current(self.generation)
    }
}

/// Fetches the listing for `ticket` without holding the sidebar, so it can
/// run on a spawned task while the sidebar keeps handling events.
pub async fn fetch_listing(
    directory: Arc<dyn ChannelDirectory>,
    ticket: PendingListing,
) -> (PendingListing, Result<Vec<ChannelRecord>, FetchError>) {
    if !ticket.is_current() {
        return (ticket, Ok(Vec::new()));
    }
    let result = directory.guild_channels(ticket.guild_id).await;
    (ticket, result)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListingOutcome {
    Applied {
        nodes: usize,
        selected: Option<TreePath>,
    },
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarAction {
    HeaderChanged { name: String },
    NeedsResync,
    RowsChanged(Vec<ChannelId>),
    RowsRemoved(Vec<ChannelId>),
    UnreadChanged(ChannelId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowActivation {
    Expanded(ChannelId),
    Collapsed(ChannelId),
    Revealed(ChannelId),
    /// The row was revealed and its channel should be opened.
    Opened(ChannelId),
}

pub struct ChannelSidebar {
    guild_id: GuildId,
    guild_name: Option<String>,
    tree: Option<ChannelTree>,
    selected: Option<ChannelId>,
    expanded: HashSet<ChannelId>,
    expand_categories: bool,
    lifetime: Lifetime,
}

impl ChannelSidebar {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            guild_name: None,
            tree: None,
            selected: None,
            expanded: HashSet::new(),
            expand_categories: true,
            lifetime: Lifetime::default(),
        }
    }

    /// Whether categories start out expanded after every rebuild.
    pub fn with_expanded_categories(mut self, expand_categories: bool) -> Self {
        self.expand_categories = expand_categories;
        self
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn guild_name(&self) -> Option<&str> {
        self.guild_name.as_deref()
    }

    pub fn tree(&self) -> Option<&ChannelTree> {
        self.tree.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.tree.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.lifetime.is_closed()
    }

    pub fn selected(&self) -> Option<ChannelId> {
        self.selected
    }

    /// Tears the view down; pending listings are discarded from now on.
    pub fn close(&mut self) {
        self.lifetime.close();
        self.tree = None;
        info!(guild_id = self.guild_id.0, "closed channel sidebar");
    }

    pub fn refresh_header(&mut self, cache: &dyn ChannelCache) -> Result<&str, SidebarError> {
        let guild = cache
            .guild(self.guild_id)
            .ok_or(SidebarError::UnknownGuild(self.guild_id))?;
        Ok(self.guild_name.insert(guild.name).as_str())
    }

    pub fn begin_resync(&self) -> PendingListing {
        PendingListing {
            guild_id: self.guild_id,
            generation: self.lifetime.advance(),
            lifetime: self.lifetime.clone(),
        }
    }

    /// Applies a fetched listing in one step, or drops it when stale.
    ///
    /// A failed fetch leaves the current tree untouched.
    pub fn apply_listing(
        &mut self,
        ticket: PendingListing,
        result: Result<Vec<ChannelRecord>, FetchError>,
    ) -> Result<ListingOutcome, SidebarError> {
        if ticket.guild_id != self.guild_id {
            return Err(SidebarError::Fetch {
                guild_id: self.guild_id,
                source: FetchError::GuildMismatch {
                    expected: self.guild_id,
                    actual: ticket.guild_id,
                },
            });
        }
        if !Arc::ptr_eq(&ticket.lifetime.generation, &self.lifetime.generation)
            || !ticket.is_current()
        {
            debug!(guild_id = self.guild_id.0, "discarding stale channel listing");
            return Ok(ListingOutcome::Discarded);
        }

        let channels = result.map_err(|source| {
            warn!(guild_id = self.guild_id.0, error = %source, "channel listing failed");
            SidebarError::Fetch {
                guild_id: self.guild_id,
                source,
            }
        })?;

        let tree = self.tree.insert(ChannelTree::from_channels(self.guild_id, &channels));
        self.expanded.retain(|id| tree.contains(*id));
        if self.expand_categories {
            self.expanded.extend(tree.categories().map(|node| node.id()));
        }
        let nodes = tree.len();

        let selected = match self.selected {
            Some(id) => self.reveal(id),
            None => None,
        };
        info!(guild_id = self.guild_id.0, nodes, "applied channel listing");
        Ok(ListingOutcome::Applied { nodes, selected })
    }

    pub async fn resync(
        &mut self,
        directory: &dyn ChannelDirectory,
    ) -> Result<ListingOutcome, SidebarError> {
        let ticket = self.begin_resync();
        let result = directory.guild_channels(self.guild_id).await;
        self.apply_listing(ticket, result)
    }

    /// Routes one gateway event to the matching tree operation.
    pub fn handle_event(
        &mut self,
        event: &GatewayEvent,
        cache: &dyn ChannelCache,
    ) -> Option<SidebarAction> {
        if self.lifetime.is_closed() {
            return None;
        }
        if event.guild_id().is_some_and(|guild_id| guild_id != self.guild_id) {
            return None;
        }

        if let GatewayEvent::GuildUpdate { guild } = event {
            self.guild_name = Some(guild.name.clone());
            return Some(SidebarAction::HeaderChanged {
                name: guild.name.clone(),
            });
        }

        let tree = self.tree.as_mut()?;
        debug!(
            guild_id = self.guild_id.0,
            event = event.name(),
            "routing gateway event"
        );

        match event {
            GatewayEvent::ReadUpdate { channel_id, .. } => tree
                .update_unread(*channel_id, cache)
                .then_some(SidebarAction::UnreadChanged(*channel_id)),
            GatewayEvent::ThreadListSync { .. } => Some(SidebarAction::NeedsResync),
            GatewayEvent::ChannelCreate { channel } | GatewayEvent::ThreadCreate { channel } => {
                let changed: Vec<ChannelId> = tree
                    .add(std::slice::from_ref(channel))
                    .into_iter()
                    .filter(|(_, change)| {
                        matches!(change, Change::Inserted | Change::Moved | Change::Updated)
                    })
                    .map(|(id, _)| id)
                    .collect();
                (!changed.is_empty()).then_some(SidebarAction::RowsChanged(changed))
            }
            GatewayEvent::ChannelUpdate { channel } | GatewayEvent::ThreadUpdate { channel } => {
                let id = channel.channel_id;
                tree.update_channel(id, cache)
                    .then(|| SidebarAction::RowsChanged(vec![id]))
            }
            GatewayEvent::VoiceStateUpdate { channel_id, .. } => tree
                .update_channel(*channel_id, cache)
                .then(|| SidebarAction::RowsChanged(vec![*channel_id])),
            GatewayEvent::ChannelDelete { channel_id, .. }
            | GatewayEvent::ThreadDelete { channel_id, .. } => {
                let removed = tree.remove(*channel_id);
                if removed.is_empty() {
                    return None;
                }
                self.expanded.retain(|id| !removed.contains(id));
                Some(SidebarAction::RowsRemoved(removed))
            }
            GatewayEvent::GuildUpdate { .. } => None,
        }
    }

    /// Remembers the channel to highlight; returns its row once known.
    pub fn select_channel(&mut self, id: ChannelId) -> Option<TreePath> {
        self.selected = Some(id);
        info!(guild_id = self.guild_id.0, channel_id = id.0, "selecting channel");
        self.reveal(id)
    }

    /// Translates a selected row into the channel that should be opened.
    pub fn selection_changed(&mut self, path: &[usize]) -> Option<ChannelId> {
        let node = self.tree.as_ref()?.node_at(path)?;
        let id = node.id();
        if !node.kind().is_openable() {
            return None;
        }
        self.open(id).then_some(id)
    }

    pub fn activate_row(&mut self, path: &[usize]) -> Option<RowActivation> {
        let node = self.tree.as_ref()?.node_at(path)?;
        let (id, behavior) = (node.id(), node.kind().activation());
        match behavior {
            ActivationBehavior::ToggleExpanded => {
                if self.expanded.remove(&id) {
                    Some(RowActivation::Collapsed(id))
                } else {
                    self.expanded.insert(id);
                    Some(RowActivation::Expanded(id))
                }
            }
            ActivationBehavior::ExpandTo | ActivationBehavior::Open => {
                self.reveal(id);
                if behavior == ActivationBehavior::ExpandTo {
                    self.expanded.insert(id);
                }
                if self.open(id) {
                    Some(RowActivation::Opened(id))
                } else {
                    Some(RowActivation::Revealed(id))
                }
            }
        }
    }

    pub fn is_expanded(&self, id: ChannelId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn set_expanded(&mut self, id: ChannelId, expanded: bool) {
        let known = self.tree.as_ref().is_some_and(|tree| tree.contains(id));
        if expanded && known {
            self.expanded.insert(id);
        } else {
            self.expanded.remove(&id);
        }
    }

    /// Rows not hidden beneath a collapsed ancestor, in display order.
    pub fn visible_rows(&self) -> Vec<(TreePath, ChannelId)> {
        let Some(tree) = self.tree.as_ref() else {
            return Vec::new();
        };
        tree.rows()
            .filter(|(_, node)| {
                tree.ancestors(node.id())
                    .iter()
                    .all(|ancestor| self.expanded.contains(ancestor))
            })
            .map(|(path, node)| (path, node.id()))
            .collect()
    }

    /// Marks `id` as the open channel; false when it already was.
    fn open(&mut self, id: ChannelId) -> bool {
        if self.selected == Some(id) {
            return false;
        }
        self.selected = Some(id);
        info!(guild_id = self.guild_id.0, channel_id = id.0, "opening channel");
        true
    }

    /// Expands every ancestor of `id` and returns its path.
    fn reveal(&mut self, id: ChannelId) -> Option<TreePath> {
        let tree = self.tree.as_ref()?;
        let path = tree.path_of(id)?;
        self.expanded.extend(tree.ancestors(id));
        Some(path)
    }
}

#[cfg(test)]
#[path = "tests/sidebar_tests.rs"]
mod tests;
