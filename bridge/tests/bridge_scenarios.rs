//! Integration tests for the device-side half of the §8 end-to-end
//! scenarios, driven against `amora-mock-player` and an in-memory fake
//! transport rather than a live broker.

mod support;

use std::sync::Arc;
use std::time::Duration;

use amora_bridge::dispatcher::Dispatcher;
use amora_bridge::publisher::{Publisher, PublisherIntervals};
use amora_core::envelope::{self, CommandEnvelope, Envelope};
use amora_core::topic::{DeviceTopics, TopicKind};
use amora_core::transport::{QoS, Transport};
use amora_mock_player::MockPlayer;
use support::FakeTransport;
use tokio_util::sync::CancellationToken;

fn topics() -> DeviceTopics {
    DeviceTopics::new("amora/devices", "kitchen-pi")
}

fn command_payload(command: &str, command_id: &str, params: Option<serde_json::Value>) -> Vec<u8> {
    let mut envelope = CommandEnvelope::new(command, params);
    envelope.command_id = command_id.to_string();
    envelope::encode(&Envelope::Command(envelope))
}

/// Scenario 3: unknown command.
#[tokio::test]
async fn unknown_command_yields_failure_response() {
    let player = Arc::new(MockPlayer::new());
    let dispatcher = Dispatcher::new(player);

    let payload = command_payload("teleport", "cmd-y", None);
    let response = dispatcher.dispatch(&payload).await;

    assert!(!response.result);
    assert_eq!(response.message, "unknown command");
    assert_eq!(response.command_id, "cmd-y");
}

/// Scenario 6: playlist change.
#[tokio::test]
async fn get_playlists_returns_created_playlist() {
    let player = Arc::new(MockPlayer::new());
    player
        .create_playlist("Favorites", &["song.mp3".to_string()])
        .await
        .unwrap();
    let dispatcher = Dispatcher::new(player);

    let payload = command_payload("getPlaylists", "cmd-z", None);
    let response = dispatcher.dispatch(&payload).await;

    assert!(response.result);
    let data = response.data.unwrap();
    let playlists = data["playlists"].as_array().unwrap();
    assert_eq!(playlists.len(), 1);
    assert_eq!(playlists[0]["name"], "Favorites");
}

/// §4.6 startup behavior: an initial full state and Connection `online`
/// are published as soon as the transport is connected, and Connection
/// `offline` is published on shutdown.
#[tokio::test]
async fn publisher_announces_online_on_start_and_offline_on_shutdown() {
    let player = Arc::new(MockPlayer::new());
    let transport = Arc::new(FakeTransport::new());
    transport.set_connected();

    let publisher = Publisher::new(
        player,
        transport.clone() as Arc<dyn Transport>,
        topics(),
        PublisherIntervals::default(),
        QoS::AtLeastOnce,
    );

    let cancellation = CancellationToken::new();
    let cancel_clone = cancellation.clone();
    let run = tokio::spawn(async move { publisher.run(cancel_clone).await });

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancellation.cancel();
    run.await.unwrap();

    let connection_topic = topics().build(TopicKind::Connection);
    let connection_messages: Vec<_> = transport
        .published_messages()
        .into_iter()
        .filter(|(t, ..)| t == &connection_topic)
        .collect();
    assert_eq!(connection_messages.len(), 2);

    match envelope::decode(&connection_messages[0].1).unwrap() {
        Envelope::Connection(c) => assert!(c.is_online()),
        other => panic!("expected Connection, got {other:?}"),
    }
    match envelope::decode(&connection_messages[1].1).unwrap() {
        Envelope::Connection(c) => assert!(!c.is_online()),
        other => panic!("expected Connection, got {other:?}"),
    }

    let state_topic = topics().build(TopicKind::State);
    assert!(transport.last_published_on(&state_topic).is_some());
}

/// Scenario 2: coalesced updates — a volume change that lands between
/// ticks is carried on the next state publish rather than dropped.
#[tokio::test]
async fn volume_change_is_reflected_in_a_subsequent_state_publish() {
    let player = Arc::new(MockPlayer::new());
    player.create_playlist("P", &["a.mp3".to_string()]).await.unwrap();
    player.play_playlist("P").await.unwrap();

    let transport = Arc::new(FakeTransport::new());
    transport.set_connected();

    let intervals = PublisherIntervals {
        position_update: Duration::from_millis(25),
        update: Duration::from_millis(25),
        full_update: Duration::from_millis(500),
    };
    let publisher = Publisher::new(
        player.clone(),
        transport.clone() as Arc<dyn Transport>,
        topics(),
        intervals,
        QoS::AtLeastOnce,
    );

    let cancellation = CancellationToken::new();
    let cancel_clone = cancellation.clone();
    let run = tokio::spawn(async move { publisher.run(cancel_clone).await });

    tokio::time::sleep(Duration::from_millis(40)).await;
    player.set_volume(70).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    cancellation.cancel();
    run.await.unwrap();

    let state_topic = topics().build(TopicKind::State);
    let saw_new_volume = transport.published_messages().into_iter().filter(|(t, ..)| t == &state_topic).any(
        |(_, payload, ..)| matches!(envelope::decode(&payload), Ok(Envelope::State(s)) if s.state.volume == 70),
    );
    assert!(saw_new_volume);
}

/// Scenario 4 (device side): a failing `getStatus` skips the tick
/// without publishing stale state, rather than crashing the publisher
/// loop.
#[tokio::test]
async fn publisher_skips_tick_when_transport_not_connected() {
    let player = Arc::new(MockPlayer::new());
    let transport = Arc::new(FakeTransport::new());
    // Deliberately left disconnected.

    let publisher = Publisher::new(
        player,
        transport.clone() as Arc<dyn Transport>,
        topics(),
        PublisherIntervals {
            position_update: Duration::from_millis(10),
            update: Duration::from_millis(10),
            full_update: Duration::from_millis(50),
        },
        QoS::AtLeastOnce,
    );

    let cancellation = CancellationToken::new();
    let cancel_clone = cancellation.clone();
    let run = tokio::spawn(async move { publisher.run(cancel_clone).await });

    tokio::time::sleep(Duration::from_millis(40)).await;
    cancellation.cancel();
    run.await.unwrap();

    assert!(transport.published_messages().is_empty());
}

/// A connection that drops mid-run stops further state publishes rather
/// than continuing to tick against a dead transport.
#[tokio::test]
async fn publisher_stops_publishing_after_disconnect() {
    let player = Arc::new(MockPlayer::new());
    let transport = Arc::new(FakeTransport::new());
    transport.set_connected();

    let publisher = Publisher::new(
        player,
        transport.clone() as Arc<dyn Transport>,
        topics(),
        PublisherIntervals {
            position_update: Duration::from_millis(10),
            update: Duration::from_millis(10),
            full_update: Duration::from_millis(50),
        },
        QoS::AtLeastOnce,
    );

    let cancellation = CancellationToken::new();
    let cancel_clone = cancellation.clone();
    let run = tokio::spawn(async move { publisher.run(cancel_clone).await });

    tokio::time::sleep(Duration::from_millis(25)).await;
    transport.set_disconnected();
    let count_at_disconnect = transport.published_messages().len();
    tokio::time::sleep(Duration::from_millis(40)).await;

    cancellation.cancel();
    run.await.unwrap();

    assert_eq!(transport.published_messages().len(), count_at_disconnect);
}
