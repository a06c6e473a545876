use super::*;
use crate::cache::InMemoryChannelCache;
use std::collections::HashSet;

const GUILD: GuildId = GuildId(100);

fn category(id: i64, position: i32, name: &str) -> ChannelRecord {
    ChannelRecord::new(ChannelId(id), GUILD, ChannelKind::Category, name).with_position(position)
}

fn channel(
    id: i64,
    kind: ChannelKind,
    parent: Option<i64>,
    position: i32,
    name: &str,
) -> ChannelRecord {
    let record = ChannelRecord::new(ChannelId(id), GUILD, kind, name).with_position(position);
    match parent {
        Some(parent) => record.with_parent(ChannelId(parent)),
        None => record,
    }
}

fn text(id: i64, parent: Option<i64>, position: i32, name: &str) -> ChannelRecord {
    channel(id, ChannelKind::Text, parent, position, name)
}

fn sample_guild() -> Vec<ChannelRecord> {
    vec![
        category(1, 0, "General"),
        text(2, Some(1), 0, "general"),
        text(4, Some(1), 1, "memes"),
        category(3, 1, "Voice"),
        channel(5, ChannelKind::Voice, Some(3), 0, "Lounge"),
        channel(6, ChannelKind::Thread, Some(2), 0, "release planning"),
    ]
}

fn ids<'a>(nodes: impl Iterator<Item = &'a Node>) -> Vec<i64> {
    nodes.map(|node| node.id().0).collect()
}

/// Index and structure must describe the same forest.
fn assert_consistent(tree: &ChannelTree) {
    let mut reachable = HashSet::new();
    for (path, node) in tree.rows() {
        assert!(reachable.insert(node.id()), "node {} reachable twice", node.id());
        assert_eq!(tree.path_of(node.id()).as_ref(), Some(&path));
        assert_eq!(tree.node_at(&path).map(Node::id), Some(node.id()));
        match node.parent() {
            Some(parent) => {
                let parent = tree.node(parent).expect("parent indexed");
                assert!(parent.kind().may_contain(node.kind()));
                assert!(parent.children().contains(&node.id()));
            }
            None => assert!(tree.roots.contains(&node.id())),
        }
        let keys: Vec<SortKey> = node
            .children()
            .iter()
            .map(|child| tree.node(*child).expect("child indexed").sort_key())
            .collect();
        assert!(keys.windows(2).all(|pair| pair[0] < pair[1]), "children sorted");
    }
    assert_eq!(reachable.len(), tree.len());
}

#[test]
fn rebuild_places_channel_under_its_category() {
    let tree = ChannelTree::from_channels(
        GUILD,
        &[category(1, 0, "General"), text(2, Some(1), 0, "general")],
    );

    assert_eq!(tree.path_of(ChannelId(2)), Some(TreePath::new(vec![0, 0])));
    let parent = tree.node(ChannelId(2)).and_then(Node::parent).expect("parent");
    assert_eq!(tree.path_of(parent), Some(TreePath::new(vec![0])));
    assert_consistent(&tree);
}

#[test]
fn rebuild_indexes_every_record_with_matching_attributes() {
    let channels = sample_guild();
    let tree = ChannelTree::from_channels(GUILD, &channels);

    assert_eq!(tree.len(), channels.len());
    for record in &channels {
        let node = tree.node(record.channel_id).expect("indexed");
        assert_eq!(node.name(), record.name);
        assert_eq!(node.kind(), record.kind);
        assert_eq!(node.position(), record.position);
        assert_eq!(node.parent(), record.parent_id);
    }
    assert_consistent(&tree);
}

#[test]
fn rebuild_discards_previous_nodes() {
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());
    tree.rebuild(&[text(9, None, 0, "only")]);

    assert_eq!(tree.len(), 1);
    assert!(tree.node(ChannelId(1)).is_none());
    assert_eq!(tree.path_of(ChannelId(9)), Some(TreePath::new(vec![0])));
}

#[test]
fn siblings_follow_position_then_id() {
    let tree = ChannelTree::from_channels(
        GUILD,
        &[
            category(1, 0, "c"),
            text(12, Some(1), 1, "b"),
            text(11, Some(1), 1, "a"),
            text(10, Some(1), 2, "z"),
            text(13, Some(1), -1, "first"),
        ],
    );

    assert_eq!(ids(tree.children(ChannelId(1))), vec![13, 11, 12, 10]);
    assert_consistent(&tree);
}

#[test]
fn unknown_parent_falls_back_to_root() {
    let tree = ChannelTree::from_channels(
        GUILD,
        &[category(1, 0, "General"), text(2, Some(99), 5, "orphan")],
    );

    assert_eq!(tree.node(ChannelId(2)).and_then(Node::parent), None);
    assert_eq!(ids(tree.roots()), vec![1, 2]);
    assert_consistent(&tree);
}

#[test]
fn parent_of_wrong_kind_falls_back_to_root() {
    let tree = ChannelTree::from_channels(
        GUILD,
        &[
            category(1, 0, "General"),
            category(2, 1, "Nested").with_parent(ChannelId(1)),
            channel(3, ChannelKind::Thread, Some(1), 0, "thread under category"),
            text(4, Some(4), 2, "self parent"),
            channel(5, ChannelKind::Voice, Some(1), 0, "voice"),
            channel(6, ChannelKind::Thread, Some(5), 0, "thread under voice"),
        ],
    );

    for id in [2, 3, 4, 6] {
        assert_eq!(tree.node(ChannelId(id)).and_then(Node::parent), None, "{id}");
    }
    assert_eq!(tree.node(ChannelId(5)).and_then(Node::parent), Some(ChannelId(1)));
    assert_consistent(&tree);
}

#[test]
fn batch_resolves_parents_listed_after_children() {
    let tree = ChannelTree::from_channels(
        GUILD,
        &[
            channel(6, ChannelKind::Thread, Some(2), 0, "thread"),
            text(2, Some(1), 0, "general"),
            category(1, 0, "General"),
        ],
    );

    assert_eq!(tree.path_of(ChannelId(6)), Some(TreePath::new(vec![0, 0, 0])));
    assert_consistent(&tree);
}

#[test]
fn threads_nest_under_text_and_forum_channels() {
    let tree = ChannelTree::from_channels(
        GUILD,
        &[
            channel(1, ChannelKind::Forum, None, 0, "help"),
            channel(2, ChannelKind::Thread, Some(1), 0, "how do I"),
            text(3, None, 1, "general"),
            channel(4, ChannelKind::Thread, Some(3), 0, "side chat"),
        ],
    );

    assert_eq!(tree.path_of(ChannelId(2)), Some(TreePath::new(vec![0, 0])));
    assert_eq!(tree.path_of(ChannelId(4)), Some(TreePath::new(vec![1, 0])));
}

#[test]
fn add_is_idempotent() {
    let mut once = ChannelTree::from_channels(GUILD, &sample_guild());
    let mut twice = once.clone();
    let record = text(7, Some(3), 1, "music");

    once.add(std::slice::from_ref(&record));
    twice.add(std::slice::from_ref(&record));
    let changes = twice.add(std::slice::from_ref(&record));

    assert_eq!(changes, vec![(ChannelId(7), Change::Unchanged)]);
    assert_eq!(once.roots, twice.roots);
    assert_eq!(once.nodes, twice.nodes);
}

#[test]
fn add_duplicate_updates_in_place() {
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());
    let path_before = tree.path_of(ChannelId(4));

    let changes = tree.add(&[text(4, Some(1), 1, "memes-renamed").with_unread(3)]);

    assert_eq!(changes, vec![(ChannelId(4), Change::Updated)]);
    assert_eq!(tree.len(), sample_guild().len());
    assert_eq!(tree.path_of(ChannelId(4)), path_before);
    let node = tree.node(ChannelId(4)).expect("node");
    assert_eq!(node.name(), "memes-renamed");
    assert_eq!(node.unread_count(), 3);
}

#[test]
fn add_new_channel_lands_in_sorted_slot() {
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());
    let changes = tree.add(&[text(8, Some(1), 0, "announcements").with_position(-5)]);

    assert_eq!(changes, vec![(ChannelId(8), Change::Inserted)]);
    assert_eq!(ids(tree.children(ChannelId(1))), vec![8, 2, 4]);
    assert_eq!(tree.path_of(ChannelId(2)), Some(TreePath::new(vec![0, 1])));
    assert_consistent(&tree);
}

#[test]
fn add_skips_channels_of_other_guilds() {
    let mut tree = ChannelTree::new(GUILD);
    let foreign = ChannelRecord::new(ChannelId(50), GuildId(7), ChannelKind::Text, "elsewhere");

    assert_eq!(tree.add(&[foreign]), vec![(ChannelId(50), Change::Skipped)]);
    assert!(tree.is_empty());
}

#[test]
fn update_channel_moves_node_to_new_category() {
    let cache = InMemoryChannelCache::new();
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());

    cache.upsert_channel(text(2, Some(3), 0, "general"));
    assert!(tree.update_channel(ChannelId(2), &cache));

    assert!(!tree.node(ChannelId(1)).expect("category").children().contains(&ChannelId(2)));
    assert!(tree.node(ChannelId(3)).expect("category").children().contains(&ChannelId(2)));
    assert_eq!(tree.node(ChannelId(2)).and_then(Node::parent), Some(ChannelId(3)));
    // the thread travels with its channel
    assert_eq!(tree.path_of(ChannelId(6)), Some(TreePath::new(vec![1, 0, 0])));
    assert_consistent(&tree);
}

#[test]
fn update_channel_refreshes_display_fields_in_place() {
    let cache = InMemoryChannelCache::new();
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());
    let path_before = tree.path_of(ChannelId(5));

    let mut lounge = channel(5, ChannelKind::Voice, Some(3), 0, "Lounge (busy)");
    lounge.voice_participants = 4;
    cache.upsert_channel(lounge);

    assert!(tree.update_channel(ChannelId(5), &cache));
    let node = tree.node(ChannelId(5)).expect("node");
    assert_eq!(node.name(), "Lounge (busy)");
    assert_eq!(node.voice_participants(), 4);
    assert_eq!(tree.path_of(ChannelId(5)), path_before);
}

#[test]
fn update_channel_ignores_unknown_ids() {
    let cache = InMemoryChannelCache::new();
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());

    cache.upsert_channel(text(42, None, 0, "not in tree"));
    assert!(!tree.update_channel(ChannelId(42), &cache));
    assert!(!tree.update_channel(ChannelId(2), &cache), "missing from cache");
    assert_eq!(tree.len(), sample_guild().len());
}

#[test]
fn update_unread_touches_only_the_unread_field() {
    let cache = InMemoryChannelCache::new();
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());
    cache.upsert_channel(text(2, Some(1), 0, "general"));
    cache.set_unread(ChannelId(2), 5);

    let path_before = tree.path_of(ChannelId(2));
    let roots_before = tree.roots.clone();
    assert!(tree.update_unread(ChannelId(2), &cache));

    assert_eq!(tree.node(ChannelId(2)).map(Node::unread_count), Some(5));
    assert_eq!(tree.path_of(ChannelId(2)), path_before);
    assert_eq!(tree.roots, roots_before);
    assert!(!tree.update_unread(ChannelId(99), &cache));
}

#[test]
fn kind_change_evicts_children_the_node_may_no_longer_hold() {
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());

    tree.add(&[channel(2, ChannelKind::Voice, Some(1), 0, "general")]);

    assert_eq!(tree.node(ChannelId(6)).and_then(Node::parent), None);
    assert!(tree.node(ChannelId(2)).expect("node").children().is_empty());
    assert_consistent(&tree);
}

#[test]
fn remove_channel_takes_its_threads() {
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());

    let mut removed = tree.remove(ChannelId(2));
    removed.sort();

    assert_eq!(removed, vec![ChannelId(2), ChannelId(6)]);
    assert!(tree.node(ChannelId(6)).is_none());
    assert_eq!(ids(tree.children(ChannelId(1))), vec![4]);
    assert_consistent(&tree);
}

#[test]
fn remove_category_moves_children_to_root() {
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());

    assert_eq!(tree.remove(ChannelId(1)), vec![ChannelId(1)]);
    assert_eq!(ids(tree.roots()), vec![2, 3, 4]);
    assert_eq!(tree.path_of(ChannelId(6)), Some(TreePath::new(vec![0, 0])));
    assert!(tree.remove(ChannelId(1)).is_empty());
    assert_consistent(&tree);
}

#[test]
fn node_at_rejects_out_of_range_paths() {
    let tree = ChannelTree::from_channels(GUILD, &sample_guild());

    assert!(tree.node_at(&[]).is_none());
    assert!(tree.node_at(&[9]).is_none());
    assert!(tree.node_at(&[0, 7]).is_none());
    assert_eq!(tree.node_at(&[0, 0, 0]).map(Node::id), Some(ChannelId(6)));
}

#[test]
fn rows_walk_in_display_order() {
    let tree = ChannelTree::from_channels(GUILD, &sample_guild());
    let order: Vec<(String, i64)> = tree
        .rows()
        .map(|(path, node)| (path.to_string(), node.id().0))
        .collect();

    assert_eq!(
        order,
        vec![
            ("0".to_string(), 1),
            ("0:0".to_string(), 2),
            ("0:0:0".to_string(), 6),
            ("0:1".to_string(), 4),
            ("1".to_string(), 3),
            ("1:0".to_string(), 5),
        ]
    );
}

#[test]
fn unread_aggregates_up_the_tree() {
    let mut tree = ChannelTree::from_channels(GUILD, &sample_guild());
    tree.set_unread(ChannelId(2), 2);
    tree.set_unread(ChannelId(6), 3);
    tree.set_unread(ChannelId(4), 1);

    assert_eq!(tree.aggregate_unread(ChannelId(1)), Some(6));
    assert_eq!(tree.aggregate_unread(ChannelId(3)), Some(0));
    assert_eq!(tree.aggregate_unread(ChannelId(99)), None);
    assert_eq!(
        tree.unread_channels(),
        vec![ChannelId(2), ChannelId(6), ChannelId(4)]
    );
    assert!(tree.has_unread());
    assert_eq!(tree.ancestors(ChannelId(6)), vec![ChannelId(2), ChannelId(1)]);
}

#[test]
fn tree_path_parent_and_display() {
    let path = TreePath::new(vec![1, 0, 2]);
    assert_eq!(path.depth(), 3);
    assert_eq!(path.to_string(), "1:0:2");
    assert_eq!(path.parent(), Some(TreePath::new(vec![1, 0])));
    assert_eq!(TreePath::new(vec![4]).parent(), None);
}

#[test]
fn index_tracks_every_live_id_across_mutation_sequences() {
    let cache = InMemoryChannelCache::new();
    let mut tree = ChannelTree::new(GUILD);
    let mut live = HashSet::new();
    let mut seed: u64 = 0x2545_f491;

    for _ in 0..400 {
        seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1);
        let id = ((seed >> 33) % 24) as i64 + 1;
        let roll = (seed >> 20) % 10;
        let kind = match id % 4 {
            0 => ChannelKind::Category,
            1 => ChannelKind::Text,
            2 => ChannelKind::Thread,
            _ => ChannelKind::Voice,
        };
        let parent = ((seed >> 40) % 26) as i64;
        let position = ((seed >> 12) % 5) as i32;
        let record = channel(id, kind, Some(parent), position, "c");

        match roll {
            0..=5 => {
                tree.add(std::slice::from_ref(&record));
                live.insert(ChannelId(id));
            }
            6 | 7 => {
                cache.upsert_channel(record);
                tree.update_channel(ChannelId(id), &cache);
            }
            _ => {
                for removed in tree.remove(ChannelId(id)) {
                    live.remove(&removed);
                }
            }
        }

        assert_eq!(tree.len(), live.len());
        for id in &live {
            assert!(tree.contains(*id));
        }
    }
    assert_consistent(&tree);
}
