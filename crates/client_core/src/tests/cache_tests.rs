use super::*;
use shared::domain::ChannelKind;

fn record(id: i64, guild: i64) -> ChannelRecord {
    ChannelRecord::new(ChannelId(id), GuildId(guild), ChannelKind::Text, format!("c{id}"))
}

#[tokio::test]
async fn lists_only_channels_of_the_requested_guild() {
    let cache = InMemoryChannelCache::from_snapshot(
        Vec::new(),
        vec![record(3, 1), record(1, 1), record(2, 2)],
    );

    let listed = cache.guild_channels(GuildId(1)).await.expect("listing");
    let ids: Vec<i64> = listed.iter().map(|channel| channel.channel_id.0).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn listing_failure_surfaces_as_fetch_failed() {
    let cache = InMemoryChannelCache::from_snapshot(Vec::new(), vec![record(1, 1)]);
    cache.fail_listings_with(Some("gateway offline".into()));

    let err = cache.guild_channels(GuildId(1)).await.unwrap_err();
    assert_eq!(err, FetchError::failed("gateway offline"));

    cache.fail_listings_with(None);
    assert!(cache.guild_channels(GuildId(1)).await.is_ok());
}

#[tokio::test]
async fn missing_directory_always_fails() {
    let err = MissingChannelDirectory
        .guild_channels(GuildId(5))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::FetchFailed { .. }));
}

#[test]
fn gateway_events_update_cached_records() {
    let cache = InMemoryChannelCache::from_snapshot(
        vec![GuildRecord {
            guild_id: GuildId(1),
            name: "Old".into(),
        }],
        vec![record(1, 1)],
    );

    cache.apply_event(&GatewayEvent::ReadUpdate {
        channel_id: ChannelId(1),
        unread_count: 4,
    });
    cache.apply_event(&GatewayEvent::VoiceStateUpdate {
        guild_id: GuildId(1),
        channel_id: ChannelId(1),
        participants: 2,
    });
    cache.apply_event(&GatewayEvent::GuildUpdate {
        guild: GuildRecord {
            guild_id: GuildId(1),
            name: "New".into(),
        },
    });
    cache.apply_event(&GatewayEvent::ThreadCreate {
        channel: record(9, 1),
    });

    assert_eq!(cache.unread_count(ChannelId(1)), Some(4));
    assert_eq!(cache.channel(ChannelId(1)).map(|c| c.voice_participants), Some(2));
    assert_eq!(cache.guild(GuildId(1)).map(|g| g.name), Some("New".to_string()));
    assert!(cache.channel(ChannelId(9)).is_some());

    cache.apply_event(&GatewayEvent::ThreadDelete {
        guild_id: GuildId(1),
        channel_id: ChannelId(9),
    });
    assert!(cache.channel(ChannelId(9)).is_none());
}

#[test]
fn unread_update_for_unknown_channel_is_ignored() {
    let cache = InMemoryChannelCache::new();
    assert!(!cache.set_unread(ChannelId(1), 3));
    assert_eq!(cache.unread_count(ChannelId(1)), None);
}
