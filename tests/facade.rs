//! End-to-end tests of the anchor system facade against mock providers.

use std::sync::Arc;

use anchor_hub::provider::mock::{CallLog, MockAnchorProvider};
use anchor_hub::{
    AnchorEvent, AnchorId, AnchorProvider, AnchorSystem, Config, CreateAnchorRequest, EventFilter, EventKind,
    MoveAnchorRequest, Pose, ProviderHandle,
};

fn provider(name: &str, accepts: bool, log: &CallLog) -> (Arc<MockAnchorProvider>, ProviderHandle) {
    let provider = Arc::new(
        MockAnchorProvider::new(name)
            .with_accepts(accepts)
            .with_call_log(log.clone()),
    );
    let handle = ProviderHandle::from_arc(provider.clone());
    (provider, handle)
}

fn located(id: &str) -> AnchorEvent {
    AnchorEvent::AnchorLocated {
        id: AnchorId::new(id),
    }
}

// ============================================================================
// Registration
// ============================================================================

#[tokio::test]
async fn register_twice_keeps_one_entry() {
    let system = AnchorSystem::new(Config::for_test());
    let (_, handle) = provider("device", true, &CallLog::default());

    assert!(system.register(handle.clone()).await);
    assert!(!system.register(handle).await);

    assert_eq!(system.provider_count().await, 1);
}

#[tokio::test]
async fn rewrapped_provider_is_registered_once() {
    let system = AnchorSystem::new(Config::for_test());
    let (device, handle) = provider("device", true, &CallLog::default());
    let mut events = system.subscribe(EventFilter::All).await;

    assert!(system.register(handle).await);
    assert!(!system.register(ProviderHandle::from_arc(device.clone())).await);
    device.emit(located("X")).await;

    assert_eq!(system.provider_count().await, 1);
    assert_eq!(events.drain().len(), 1);
}

#[tokio::test]
async fn unregister_unknown_leaves_registry_unchanged() {
    let system = AnchorSystem::new(Config::for_test());
    let log = CallLog::default();
    let (_, registered) = provider("device", true, &log);
    let (_, stranger) = provider("cloud", true, &log);
    system.register(registered.clone()).await;

    assert!(!system.unregister(&stranger).await);

    let active = system.active_providers().await;
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, registered.id());
}

// ============================================================================
// Event relay
// ============================================================================

#[tokio::test]
async fn located_event_relayed_only_while_registered() {
    let system = AnchorSystem::new(Config::for_test());
    let (device, handle) = provider("device", true, &CallLog::default());
    let mut events = system.subscribe(EventFilter::All).await;

    system.register(handle.clone()).await;
    device.emit(located("X")).await;

    let received = events.drain();
    assert_eq!(received.len(), 1);
    assert_eq!(*received[0].event, located("X"));
    assert_eq!(received[0].provider, handle.id());

    system.unregister(&handle).await;
    device.emit(located("X")).await;

    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn events_from_all_providers_reach_one_subscriber() {
    let log = CallLog::default();
    let (device, device_handle) = provider("device", true, &log);
    let (cloud, cloud_handle) = provider("cloud", true, &log);
    let system = AnchorSystem::builder(Config::for_test())
        .with_provider(device_handle.clone())
        .with_provider(cloud_handle.clone())
        .build()
        .await;
    let mut events = system.subscribe(EventFilter::only(EventKind::AnchorLocated)).await;

    device.emit(located("a")).await;
    cloud.emit(located("b")).await;

    let sources: Vec<_> = events.drain().iter().map(|e| e.provider).collect();
    assert_eq!(sources, vec![device_handle.id(), cloud_handle.id()]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unregister_is_synchronous_with_concurrent_emission() {
    let system = AnchorSystem::new(Config::for_test());
    let (device, handle) = provider("device", true, &CallLog::default());
    system.register(handle.clone()).await;
    let mut events = system.subscribe(EventFilter::All).await;

    let emitter = {
        let device = Arc::clone(&device);
        tokio::spawn(async move {
            for i in 0..500 {
                device.emit(located(&i.to_string())).await;
                tokio::task::yield_now().await;
            }
        })
    };

    tokio::task::yield_now().await;
    assert!(system.unregister(&handle).await);
    events.drain();

    emitter.await.unwrap();

    assert!(events.try_recv().is_none());
}

#[tokio::test]
async fn lagging_subscriber_loses_nothing() {
    let system = AnchorSystem::new(Config::for_test());
    let (device, handle) = provider("device", true, &CallLog::default());
    system.register(handle).await;
    let mut events = system.subscribe(EventFilter::All).await;

    for i in 0..3000 {
        device.emit(located(&i.to_string())).await;
    }

    let received: Vec<AnchorEvent> = events.drain().iter().map(|e| (*e.event).clone()).collect();
    let expected: Vec<AnchorEvent> = (0..3000).map(|i| located(&i.to_string())).collect();
    assert_eq!(received, expected);
}

// ============================================================================
// Dispatch
// ============================================================================

#[tokio::test]
async fn find_falls_back_in_registration_order() {
    let log = CallLog::default();
    let (_, declining) = provider("p1", false, &log);
    let (_, accepting) = provider("p2", true, &log);
    let system = AnchorSystem::builder(Config::for_test())
        .with_provider(declining)
        .with_provider(accepting)
        .build()
        .await;

    assert!(system.find_anchor(&AnchorId::new("a")).await.unwrap());

    assert_eq!(*log.read().await, vec!["p1:find_anchor", "p2:find_anchor"]);
}

#[tokio::test]
async fn find_reversed_order_tries_accepting_provider_first() {
    let log = CallLog::default();
    let (_, declining) = provider("p1", false, &log);
    let (_, accepting) = provider("p2", true, &log);
    let system = AnchorSystem::builder(Config::for_test())
        .with_provider(accepting)
        .with_provider(declining)
        .build()
        .await;

    assert!(system.find_anchor(&AnchorId::new("a")).await.unwrap());

    assert_eq!(*log.read().await, vec!["p2:find_anchor"]);
}

#[tokio::test]
async fn unregistered_provider_is_skipped() {
    let log = CallLog::default();
    let (_, first) = provider("p1", true, &log);
    let (_, second) = provider("p2", true, &log);
    let system = AnchorSystem::builder(Config::for_test())
        .with_provider(first.clone())
        .with_provider(second)
        .build()
        .await;

    system.unregister(&first).await;
    assert!(system.delete_anchor(&AnchorId::new("a")).await.unwrap());

    assert_eq!(*log.read().await, vec!["p2:delete_anchor"]);
}

#[tokio::test]
async fn zero_providers_is_not_an_error() {
    let system = AnchorSystem::new(Config::for_test());
    let id = AnchorId::new("a");

    let request = CreateAnchorRequest::expiring_in("chair", Pose::default(), chrono::Duration::hours(1));
    assert_eq!(system.create_anchor(request).await, Ok(None));
    assert_eq!(system.find_anchor(&id).await, Ok(false));
    assert_eq!(system.find_anchors(&[id.clone()]).await, Ok(false));
    assert_eq!(
        system
            .move_anchor(MoveAnchorRequest::new("chair", Pose::default()).with_anchor_id("a"))
            .await,
        Ok(false)
    );
    assert_eq!(system.delete_anchors(&[id]).await, Ok(false));
    assert!(!system.clear_cache().await);
}

#[tokio::test]
async fn clear_cache_reaches_every_provider() {
    let log = CallLog::default();
    let (_, failing) = provider("p1", false, &log);
    let (_, succeeding) = provider("p2", true, &log);
    let system = AnchorSystem::builder(Config::for_test())
        .with_provider(failing)
        .with_provider(succeeding)
        .build()
        .await;

    assert!(system.clear_cache().await);

    assert_eq!(*log.read().await, vec!["p1:clear_cache", "p2:clear_cache"]);
}

#[tokio::test]
async fn shutdown_stops_every_provider() {
    let log = CallLog::default();
    let (device, device_handle) = provider("device", true, &log);
    let (cloud, cloud_handle) = provider("cloud", true, &log);
    let system = AnchorSystem::builder(Config::default())
        .with_provider(device_handle)
        .with_provider(cloud_handle)
        .build()
        .await;
    let mut events = system.subscribe(EventFilter::All).await;

    assert_eq!(system.start_providers().await, 2);
    assert_eq!(system.shutdown().await, 2);
    device.emit(located("X")).await;

    assert!(!device.is_running());
    assert!(!cloud.is_running());
    assert!(system.active_providers().await.is_empty());
    assert!(events.try_recv().is_none());
}
