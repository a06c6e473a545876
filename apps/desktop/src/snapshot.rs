//! JSON snapshot of cached guild state plus a gateway event script.

use std::{fs, path::Path};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::{
    domain::GuildId,
    protocol::{ChannelRecord, GatewayEvent, GuildRecord},
};

#[derive(Debug, Deserialize)]
pub struct Snapshot {
    pub guilds: Vec<GuildRecord>,
    #[serde(default)]
    pub channels: Vec<ChannelRecord>,
    #[serde(default)]
    pub events: Vec<GatewayEvent>,
}

impl Snapshot {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read snapshot '{}'", path.display()))?;
        Self::parse(&raw).with_context(|| format!("invalid snapshot '{}'", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// The requested guild, or the first one listed.
    pub fn pick_guild(&self, requested: Option<GuildId>) -> anyhow::Result<GuildId> {
        match requested {
            Some(guild_id) if self.guilds.iter().any(|g| g.guild_id == guild_id) => Ok(guild_id),
            Some(guild_id) => bail!("guild {guild_id} is not part of the snapshot"),
            None => match self.guilds.first() {
                Some(guild) => Ok(guild.guild_id),
                None => bail!("snapshot lists no guilds"),
            },
        }
    }
}
