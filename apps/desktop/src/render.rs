use client_core::{ChannelSidebar, Node};
use shared::domain::ChannelKind;

fn glyph(kind: ChannelKind) -> &'static str {
    match kind {
        ChannelKind::Category => "",
        ChannelKind::Text => "# ",
        ChannelKind::Voice => "~ ",
        ChannelKind::Forum => "? ",
        ChannelKind::Thread => "| ",
    }
}

fn badge(sidebar: &ChannelSidebar, node: &Node) -> String {
    let collapsed = !node.children().is_empty() && !sidebar.is_expanded(node.id());
    let unread = if collapsed {
        sidebar
            .tree()
            .and_then(|tree| tree.aggregate_unread(node.id()))
            .unwrap_or_default()
    } else {
        node.unread_count()
    };

    let mut parts = Vec::new();
    if unread > 0 {
        parts.push(format!("({unread})"));
    }
    if node.voice_participants() > 0 {
        parts.push(format!("[{} in voice]", node.voice_participants()));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!("  {}", parts.join(" "))
    }
}

/// Text rendering of the rows a user would currently see.
pub fn render_sidebar(sidebar: &ChannelSidebar) -> Vec<String> {
    let Some(tree) = sidebar.tree() else {
        return vec!["(channels not loaded)".to_string()];
    };

    let mut lines = Vec::new();
    if let Some(name) = sidebar.guild_name() {
        lines.push(name.to_string());
    }
    for (path, id) in sidebar.visible_rows() {
        let Some(node) = tree.node(id) else {
            continue;
        };
        let marker = if node.children().is_empty() {
            "  "
        } else if sidebar.is_expanded(id) {
            "v "
        } else {
            "> "
        };
        let selected = if sidebar.selected() == Some(id) { "*" } else { " " };
        lines.push(format!(
            "{selected}{indent}{marker}{glyph}{name}{badge}",
            indent = "  ".repeat(path.depth().saturating_sub(1)),
            glyph = glyph(node.kind()),
            name = node.name(),
            badge = badge(sidebar, node),
        ));
    }
    lines
}
