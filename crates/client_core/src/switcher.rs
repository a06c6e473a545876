//! Quick switcher: jump to a channel of the open guild by typing its name.

use shared::domain::{ChannelId, ChannelKind};

use crate::channel_tree::{ChannelTree, TreePath};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchQuality {
    Exact,
    Prefix,
    Substring,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitcherMatch {
    pub channel_id: ChannelId,
    pub kind: ChannelKind,
    pub name: String,
    pub path: TreePath,
    pub quality: MatchQuality,
}

pub struct QuickSwitcher;

impl QuickSwitcher {
    /// Case-insensitive search over openable channels. Better matches come
    /// first; equal matches keep display order.
    pub fn search(tree: &ChannelTree, query: &str, limit: usize) -> Vec<SwitcherMatch> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }

        let mut matches: Vec<SwitcherMatch> = tree
            .rows()
            .filter(|(_, node)| node.kind().is_openable())
            .filter_map(|(path, node)| {
                let quality = match_quality(&node.name().to_lowercase(), &needle)?;
                Some(SwitcherMatch {
                    channel_id: node.id(),
                    kind: node.kind(),
                    name: node.name().to_string(),
                    path,
                    quality,
                })
            })
            .collect();

        // stable sort keeps display order inside each quality bucket
        matches.sort_by_key(|found| found.quality);
        matches.truncate(limit);
        matches
    }
}

fn match_quality(haystack: &str, needle: &str) -> Option<MatchQuality> {
    if haystack == needle {
        Some(MatchQuality::Exact)
    } else if haystack.starts_with(needle) {
        Some(MatchQuality::Prefix)
    } else if haystack.contains(needle) {
        Some(MatchQuality::Substring)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "tests/switcher_tests.rs"]
mod tests;
