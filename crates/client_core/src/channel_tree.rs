//! Hierarchical projection of one guild's channel list.
//!
//! The tree keeps two views of the same nodes in lockstep: an id index for
//! O(1) lookups and ordered child lists for structural paths. Every mutation
//! goes through `upsert`, `detach` and `attach` so the two never disagree.

use std::{collections::HashMap, fmt, ops::Deref};

use shared::{
    domain::{ChannelId, ChannelKind, GuildId},
    protocol::ChannelRecord,
};
use tracing::debug;

use crate::cache::ChannelCache;

/// Sibling indices from the guild root down to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TreePath(Vec<usize>);

impl TreePath {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn parent(&self) -> Option<TreePath> {
        match self.0.split_last() {
            Some((_, rest)) if !rest.is_empty() => Some(TreePath(rest.to_vec())),
            _ => None,
        }
    }

    fn child(&self, index: usize) -> TreePath {
        let mut indices = self.0.clone();
        indices.push(index);
        TreePath(indices)
    }
}

impl Deref for TreePath {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for TreePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(":"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    position: i32,
    channel_id: ChannelId,
}

/// One row of the channel tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    id: ChannelId,
    kind: ChannelKind,
    name: String,
    position: i32,
    unread_count: u32,
    voice_participants: u32,
    parent: Option<ChannelId>,
    children: Vec<ChannelId>,
}

impl Node {
    fn from_record(record: &ChannelRecord, parent: Option<ChannelId>) -> Self {
        Self {
            id: record.channel_id,
            kind: record.kind,
            name: record.name.clone(),
            position: record.position,
            unread_count: record.unread_count,
            voice_participants: record.voice_participants,
            parent,
            children: Vec::new(),
        }
    }

    fn apply(&mut self, record: &ChannelRecord) {
        self.kind = record.kind;
        self.name.clone_from(&record.name);
        self.position = record.position;
        self.unread_count = record.unread_count;
        self.voice_participants = record.voice_participants;
    }

    fn sort_key(&self) -> SortKey {
        SortKey {
            position: self.position,
            channel_id: self.id,
        }
    }

    pub fn id(&self) -> ChannelId {
        self.id
    }

    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    pub fn unread_count(&self) -> u32 {
        self.unread_count
    }

    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    pub fn voice_participants(&self) -> u32 {
        self.voice_participants
    }

    /// `None` means the node hangs off the guild root.
    pub fn parent(&self) -> Option<ChannelId> {
        self.parent
    }

    pub fn children(&self) -> &[ChannelId] {
        &self.children
    }
}

/// Structural effect of applying one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Inserted,
    Moved,
    Updated,
    Unchanged,
    Skipped,
}

#[derive(Debug, Clone)]
pub struct ChannelTree {
    guild_id: GuildId,
    nodes: HashMap<ChannelId, Node>,
    roots: Vec<ChannelId>,
}

impl ChannelTree {
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            nodes: HashMap::new(),
            roots: Vec::new(),
        }
    }

    pub fn from_channels(guild_id: GuildId, channels: &[ChannelRecord]) -> Self {
        let mut tree = Self::new(guild_id);
        tree.rebuild(channels);
        tree
    }

    pub fn guild_id(&self) -> GuildId {
        self.guild_id
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Discards the whole forest and repopulates it from a full listing.
    pub fn rebuild(&mut self, channels: &[ChannelRecord]) {
        self.nodes.clear();
        self.roots.clear();
        self.add(channels);
        debug!(
            guild_id = self.guild_id.0,
            nodes = self.nodes.len(),
            "rebuilt channel tree"
        );
    }

    /// Inserts new channels and updates known ones in place.
    ///
    /// Parents are resolved against the kinds known before the batch plus the
    /// kinds carried by the batch itself, so a channel listed before its
    /// category still lands under it.
    pub fn add(&mut self, channels: &[ChannelRecord]) -> Vec<(ChannelId, Change)> {
        let mut known = self.known_kinds();
        for record in channels {
            if record.guild_id == self.guild_id {
                known.insert(record.channel_id, record.kind);
            }
        }

        let mut ordered: Vec<&ChannelRecord> = channels.iter().collect();
        ordered.sort_by_key(|record| depth_rank(record.kind));

        ordered
            .into_iter()
            .map(|record| (record.channel_id, self.upsert(record, &known)))
            .collect()
    }

    /// Re-reads one channel from the cache and refreshes its row.
    ///
    /// Returns `false` when either the tree or the cache does not know the id.
    pub fn update_channel(&mut self, id: ChannelId, cache: &dyn ChannelCache) -> bool {
        if !self.nodes.contains_key(&id) {
            debug!(channel_id = id.0, "update for channel missing from tree");
            return false;
        }
        let Some(mut record) = cache.channel(id) else {
            debug!(channel_id = id.0, "update for channel missing from cache");
            return false;
        };
        if let Some(unread) = cache.unread_count(id) {
            record.unread_count = unread;
        }

        let known = self.known_kinds();
        !matches!(self.upsert(&record, &known), Change::Skipped)
    }

    /// Refreshes only the unread indicator from the cache.
    pub fn update_unread(&mut self, id: ChannelId, cache: &dyn ChannelCache) -> bool {
        match cache.unread_count(id) {
            Some(count) => self.set_unread(id, count),
            None => false,
        }
    }

    /// Returns `true` when the node exists; structure is never touched.
    pub fn set_unread(&mut self, id: ChannelId, count: u32) -> bool {
        match self.nodes.get_mut(&id) {
            Some(node) => {
                node.unread_count = count;
                true
            }
            None => false,
        }
    }

    /// Removes a channel. Threads go with their channel; the children of a
    /// removed category move up to the guild root.
    pub fn remove(&mut self, id: ChannelId) -> Vec<ChannelId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        let (parent, kind, children) = (node.parent, node.kind, node.children.clone());

        self.detach(id, parent);
        self.nodes.remove(&id);
        let mut removed = vec![id];

        for child in children {
            if kind == ChannelKind::Category {
                if let Some(node) = self.nodes.get_mut(&child) {
                    node.parent = None;
                }
                self.attach(child);
            } else {
                removed.extend(self.remove_subtree(child));
            }
        }

        removed
    }

    pub fn node(&self, id: ChannelId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.nodes.get(self.roots.get(*first)?)?;
        for index in rest {
            node = self.nodes.get(node.children.get(*index)?)?;
        }
        Some(node)
    }

    pub fn path_of(&self, id: ChannelId) -> Option<TreePath> {
        let mut indices = Vec::new();
        let mut current = self.nodes.get(&id)?;
        loop {
            let key = current.sort_key();
            let siblings = self.siblings(current.parent)?;
            let index = siblings
                .binary_search_by(|probe| self.nodes.get(probe).map(Node::sort_key).cmp(&Some(key)))
                .ok()?;
            indices.push(index);

            match current.parent {
                Some(parent) => current = self.nodes.get(&parent)?,
                None => break,
            }
        }
        indices.reverse();
        Some(TreePath(indices))
    }

    pub fn roots(&self) -> impl Iterator<Item = &Node> + '_ {
        self.roots.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn children(&self, id: ChannelId) -> impl Iterator<Item = &Node> + '_ {
        self.nodes
            .get(&id)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|child| self.nodes.get(child))
    }

    /// Parent chain, nearest first.
    pub fn ancestors(&self, id: ChannelId) -> Vec<ChannelId> {
        let mut chain = Vec::new();
        let mut parent = self.nodes.get(&id).and_then(|node| node.parent);
        while let Some(current) = parent {
            chain.push(current);
            parent = self.nodes.get(&current).and_then(|node| node.parent);
        }
        chain
    }

    pub fn categories(&self) -> impl Iterator<Item = &Node> + '_ {
        self.roots().filter(|node| node.kind == ChannelKind::Category)
    }

    /// Own unread count plus everything below the node.
    pub fn aggregate_unread(&self, id: ChannelId) -> Option<u32> {
        let node = self.nodes.get(&id)?;
        let below = node
            .children
            .iter()
            .filter_map(|child| self.aggregate_unread(*child))
            .fold(0u32, u32::saturating_add);
        Some(node.unread_count.saturating_add(below))
    }

    /// Channels with unseen messages, in display order.
    pub fn unread_channels(&self) -> Vec<ChannelId> {
        self.rows()
            .filter(|(_, node)| node.has_unread())
            .map(|(_, node)| node.id)
            .collect()
    }

    pub fn has_unread(&self) -> bool {
        self.nodes.values().any(Node::has_unread)
    }

    /// Depth-first walk in display order.
    pub fn rows(&self) -> Rows<'_> {
        let stack = self
            .roots
            .iter()
            .enumerate()
            .rev()
            .map(|(index, id)| (TreePath(vec![index]), *id))
            .collect();
        Rows { tree: self, stack }
    }

    fn known_kinds(&self) -> HashMap<ChannelId, ChannelKind> {
        self.nodes
            .values()
            .map(|node| (node.id, node.kind))
            .collect()
    }

    fn resolve_parent(
        &self,
        record: &ChannelRecord,
        known: &HashMap<ChannelId, ChannelKind>,
    ) -> Option<ChannelId> {
        let parent_id = record.parent_id?;
        let resolved = parent_id != record.channel_id
            && known
                .get(&parent_id)
                .is_some_and(|kind| kind.may_contain(record.kind))
            && self.nodes.contains_key(&parent_id);

        if resolved {
            Some(parent_id)
        } else {
            debug!(
                guild_id = self.guild_id.0,
                channel_id = record.channel_id.0,
                parent_id = parent_id.0,
                "unresolved parent, attaching channel to guild root"
            );
            None
        }
    }

    fn upsert(
        &mut self,
        record: &ChannelRecord,
        known: &HashMap<ChannelId, ChannelKind>,
    ) -> Change {
        if record.guild_id != self.guild_id {
            debug!(
                guild_id = self.guild_id.0,
                channel_id = record.channel_id.0,
                other_guild_id = record.guild_id.0,
                "skipping channel from another guild"
            );
            return Change::Skipped;
        }

        let id = record.channel_id;
        let parent = self.resolve_parent(record, known);

        let Some(node) = self.nodes.get_mut(&id) else {
            self.nodes.insert(id, Node::from_record(record, parent));
            self.attach(id);
            return Change::Inserted;
        };

        let before = node.clone();
        node.apply(record);
        let moved = before.parent != parent || before.sort_key() != node.sort_key();

        if moved {
            self.detach(id, before.parent);
            if let Some(node) = self.nodes.get_mut(&id) {
                node.parent = parent;
            }
            self.attach(id);
        }
        if before.kind != record.kind {
            self.evict_disallowed_children(id);
        }

        if moved {
            Change::Moved
        } else if self.nodes.get(&id) == Some(&before) {
            Change::Unchanged
        } else {
            Change::Updated
        }
    }

    /// After a kind change the node may no longer be allowed to hold its
    /// children; those fall back to the guild root.
    fn evict_disallowed_children(&mut self, id: ChannelId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let kind = node.kind;
        let evicted: Vec<ChannelId> = node
            .children
            .iter()
            .copied()
            .filter(|child| {
                self.nodes
                    .get(child)
                    .is_some_and(|child| !kind.may_contain(child.kind))
            })
            .collect();

        for child in evicted {
            self.detach(child, Some(id));
            if let Some(node) = self.nodes.get_mut(&child) {
                node.parent = None;
            }
            self.attach(child);
        }
    }

    fn remove_subtree(&mut self, id: ChannelId) -> Vec<ChannelId> {
        let Some(node) = self.nodes.remove(&id) else {
            return Vec::new();
        };
        let mut removed = vec![id];
        for child in node.children {
            removed.extend(self.remove_subtree(child));
        }
        removed
    }

    fn siblings(&self, parent: Option<ChannelId>) -> Option<&Vec<ChannelId>> {
        match parent {
            Some(parent) => self.nodes.get(&parent).map(|node| &node.children),
            None => Some(&self.roots),
        }
    }

    fn siblings_mut(&mut self, parent: Option<ChannelId>) -> Option<&mut Vec<ChannelId>> {
        match parent {
            Some(parent) => self.nodes.get_mut(&parent).map(|node| &mut node.children),
            None => Some(&mut self.roots),
        }
    }

    /// Links an indexed node into its parent's child list at its sorted slot.
    fn attach(&mut self, id: ChannelId) {
        let Some(node) = self.nodes.get(&id) else {
            return;
        };
        let (parent, key) = (node.parent, node.sort_key());
        let index = match self.siblings(parent) {
            Some(siblings) => siblings.partition_point(|sibling| {
                self.nodes
                    .get(sibling)
                    .is_some_and(|sibling| sibling.sort_key() < key)
            }),
            None => return,
        };
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.insert(index, id);
        }
    }

    fn detach(&mut self, id: ChannelId, parent: Option<ChannelId>) {
        if let Some(siblings) = self.siblings_mut(parent) {
            siblings.retain(|sibling| *sibling != id);
        }
    }
}

fn depth_rank(kind: ChannelKind) -> u8 {
    match kind {
        ChannelKind::Category => 0,
        ChannelKind::Text | ChannelKind::Voice | ChannelKind::Forum => 1,
        ChannelKind::Thread => 2,
    }
}

/// Iterator returned by [`ChannelTree::rows`].
pub struct Rows<'a> {
    tree: &'a ChannelTree,
    stack: Vec<(TreePath, ChannelId)>,
}

impl<'a> Iterator for Rows<'a> {
    type Item = (TreePath, &'a Node);

    fn next(&mut self) -> Option<Self::Item> {
        let tree = self.tree;
        while let Some((path, id)) = self.stack.pop() {
            let Some(node) = tree.nodes.get(&id) else {
                continue;
            };
            for (index, child) in node.children.iter().enumerate().rev() {
                self.stack.push((path.child(index), *child));
            }
            return Some((path, node));
        }
        None
    }
}

#[cfg(test)]
#[path = "tests/channel_tree_tests.rs"]
mod tests;
