//! Watchdog timing tests under the paused tokio clock

use std::sync::Arc;

use tokio::time::{Duration, Instant};
use tokio_test::assert_ok;

use telelink::{
    ChannelConnection, Connection, ConnectionReader, Error, LinkEvent, Message, MessageFilter,
    Watchdog,
};

#[tokio::test(start_paused = true)]
async fn test_lost_fires_exactly_once_without_messages() {
    let watchdog = Watchdog::new(Duration::from_secs(1), MessageFilter::Any);
    let mut events = watchdog.subscribe();

    let started_at = Instant::now();
    assert_ok!(watchdog.start());

    let event = events.recv().await.unwrap();
    assert_eq!(event, LinkEvent::Lost);
    let elapsed = started_at.elapsed();
    assert!(elapsed >= Duration::from_secs(1));
    assert!(elapsed < Duration::from_secs(2));
    assert!(watchdog.link_lost());

    // Quiet link stays lost: no second event before a restore.
    let second = tokio::time::timeout(Duration::from_secs(5), events.recv()).await;
    assert!(second.is_err());

    watchdog.stop();
}

#[tokio::test(start_paused = true)]
async fn test_accepted_message_restores_and_resets_clock() {
    let watchdog = Watchdog::new(Duration::from_secs(1), MessageFilter::Any);
    let mut events = watchdog.subscribe();
    watchdog.start().unwrap();

    assert_eq!(events.recv().await.unwrap(), LinkEvent::Lost);

    // The restore fires synchronously with the accept.
    watchdog.observe(&Message::new("ATTITUDE"));
    assert_eq!(events.try_recv().unwrap(), LinkEvent::Restored);
    assert!(!watchdog.link_lost());

    // last_seen was reset, so loss needs another full quiet timeout.
    let quiet_start = Instant::now();
    let event = tokio::time::timeout(Duration::from_secs(10), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, LinkEvent::Lost);
    assert!(quiet_start.elapsed() >= Duration::from_secs(1));

    watchdog.stop();
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_watchdog_ignores_other_traffic() {
    let watchdog = Watchdog::heartbeat(Duration::from_secs(1));
    let mut events = watchdog.subscribe();
    watchdog.start().unwrap();

    // A steady stream of non-heartbeat traffic is not proof of life.
    let feeder = watchdog.clone();
    let feed = tokio::spawn(async move {
        for _ in 0..8 {
            feeder.observe(&Message::new("ATTITUDE"));
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    });

    let event = tokio::time::timeout(Duration::from_secs(5), events.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(event, LinkEvent::Lost);
    feed.await.unwrap();

    // One heartbeat brings it back.
    watchdog.observe(&Message::heartbeat());
    assert_eq!(events.try_recv().unwrap(), LinkEvent::Restored);

    watchdog.stop();
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_start_is_not_reentrant() {
    let watchdog = Watchdog::new(Duration::from_secs(1), MessageFilter::Any);
    watchdog.start().unwrap();
    assert!(matches!(watchdog.start(), Err(Error::AlreadyStarted)));
    watchdog.stop();
}

#[tokio::test(start_paused = true)]
async fn test_watchdog_as_reader_handler() {
    let (ground, vehicle) = ChannelConnection::pair(16);
    let reader = ConnectionReader::new(Arc::new(ground));

    let watchdog = Watchdog::heartbeat(Duration::from_secs(1));
    let mut events = watchdog.subscribe();
    reader.add_message_handler_with_key("liveness", watchdog.clone());
    reader.start().unwrap();
    watchdog.start().unwrap();

    // Nothing on the link: the watchdog reports loss.
    assert_eq!(events.recv().await.unwrap(), LinkEvent::Lost);

    // A heartbeat dispatched through the reader restores it.
    vehicle.send(&Message::heartbeat()).await.unwrap();
    assert_eq!(events.recv().await.unwrap(), LinkEvent::Restored);

    reader.stop();
    watchdog.stop();
}

#[tokio::test(start_paused = true)]
async fn test_events_strictly_alternate() {
    let watchdog = Watchdog::new(Duration::from_secs(1), MessageFilter::Any);
    let mut events = watchdog.subscribe();
    watchdog.start().unwrap();

    let mut observed = Vec::new();
    for round in 0..3 {
        observed.push(events.recv().await.unwrap());
        watchdog.observe(&Message::new("STATUS"));
        observed.push(events.try_recv().unwrap());
        // Keep the link quiet again until the next loss.
        let _ = round;
    }

    assert_eq!(
        observed,
        vec![
            LinkEvent::Lost,
            LinkEvent::Restored,
            LinkEvent::Lost,
            LinkEvent::Restored,
            LinkEvent::Lost,
            LinkEvent::Restored,
        ]
    );

    watchdog.stop();
}
