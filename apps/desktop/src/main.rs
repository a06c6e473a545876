use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    fetch_listing, ChannelDirectory, GuildOpened, InMemoryChannelCache, ListingOutcome,
    QuickSwitcher, SidebarAction, SidebarNavigator,
};
use shared::domain::{ChannelId, GuildId};
use tracing::{info, warn};

mod config;
mod logging;
mod render;
mod snapshot;

use snapshot::Snapshot;

#[derive(Parser, Debug)]
struct Cli {
    /// JSON file with `guilds`, `channels` and an `events` script.
    #[arg(long)]
    snapshot: PathBuf,
    #[arg(long)]
    guild: Option<GuildId>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay the event script and print the channel tree.
    Tree {
        #[arg(long)]
        select: Option<ChannelId>,
    },
    /// Replay the event script, then run a quick switcher query.
    Search { query: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = config::load_settings(cli.config.as_deref())?;
    logging::init(&settings.log_filter);

    let snapshot = Snapshot::load(&cli.snapshot)?;
    let guild_id = snapshot.pick_guild(cli.guild)?;
    let cache = Arc::new(InMemoryChannelCache::from_snapshot(
        snapshot.guilds.clone(),
        snapshot.channels.clone(),
    ));
    let directory: Arc<dyn ChannelDirectory> = cache.clone();

    let mut navigator = SidebarNavigator::new(settings.expand_categories);
    if let GuildOpened::Opened(ticket) = navigator.open_guild(guild_id, cache.as_ref()) {
        let (ticket, result) = fetch_listing(directory.clone(), ticket).await;
        let sidebar = navigator.current_mut().context("sidebar closed during open")?;
        sidebar.apply_listing(ticket, result)?;
    }

    if let Some(Command::Tree {
        select: Some(channel_id),
    }) = &cli.command
    {
        if navigator.select_channel(*channel_id, cache.as_ref()).is_none() {
            warn!(channel_id = channel_id.0, "cannot select unknown channel");
        }
    }

    for event in &snapshot.events {
        cache.apply_event(event);
        let Some(sidebar) = navigator.current_mut() else {
            break;
        };
        match sidebar.handle_event(event, cache.as_ref()) {
            Some(SidebarAction::NeedsResync) => {
                let ticket = sidebar.begin_resync();
                let (ticket, result) = fetch_listing(directory.clone(), ticket).await;
                if let ListingOutcome::Discarded = sidebar.apply_listing(ticket, result)? {
                    warn!(guild_id = guild_id.0, "resync result discarded");
                }
            }
            Some(action) => info!(event = event.name(), ?action, "applied gateway event"),
            None => {}
        }
    }

    let sidebar = navigator.current().context("no guild open")?;
    match cli.command.unwrap_or(Command::Tree { select: None }) {
        Command::Tree { .. } => {
            for line in render::render_sidebar(sidebar) {
                println!("{line}");
            }
        }
        Command::Search { query } => {
            let tree = sidebar.tree().context("channel list not loaded")?;
            for found in QuickSwitcher::search(tree, &query, settings.switcher_limit) {
                println!(
                    "{:<8} {:<10} {} ({})",
                    found.path.to_string(),
                    found.kind.to_string(),
                    found.name,
                    found.channel_id
                );
            }
        }
    }

    Ok(())
}
