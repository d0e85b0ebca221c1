use mosaic_event_bus::*;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PhaseTick(usize);

#[tokio::test]
async fn events_flow_to_every_subscriber() {
    let bus = EventBus::new();
    let mut first = bus.subscribe::<PhaseTick>().unwrap();
    let mut second = bus.subscribe::<PhaseTick>().unwrap();

    assert_eq!(bus.publish(PhaseTick(42)).unwrap(), 2);

    assert_eq!(*first.recv_event().await.unwrap(), PhaseTick(42));
    assert_eq!(*second.recv_event().await.unwrap(), PhaseTick(42));
}

#[tokio::test]
async fn lagged_receiver_recovers() {
    let bus = EventBus::new();
    let capacity = 2;
    let mut rx = bus.subscribe_with_capacity::<PhaseTick>(capacity).unwrap();

    let total = 100;
    for i in 0..total {
        bus.publish(PhaseTick(i)).unwrap();
    }

    let first = rx.recv_event().await.expect("should recover from lag");
    assert!(first.0 >= total - capacity, "expected the buffered tail, got {}", first.0);

    let second = rx.recv_event().await.expect("should continue receiving");
    assert_eq!(second.0, first.0 + 1);
}

#[tokio::test]
async fn ordering_is_preserved() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<PhaseTick>().unwrap();

    for i in 0..50 {
        bus.publish(PhaseTick(i)).unwrap();
    }
    for i in 0..50 {
        assert_eq!(rx.recv_event().await.unwrap().0, i);
    }
}

#[tokio::test]
async fn dropping_the_bus_closes_receivers() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<PhaseTick>().unwrap();

    drop(bus);

    assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
}

#[tokio::test]
async fn shutdown_closes_all_channels() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<PhaseTick>().unwrap();
    let _other = bus.subscribe::<String>().unwrap();

    assert_eq!(bus.shutdown(), 2);
    assert!(rx.recv_event().await.is_none());
}

#[tokio::test]
async fn concurrent_publishers_deliver_everything() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe::<PhaseTick>().unwrap();

    let handles: Vec<_> = (0..2)
        .map(|n| {
            let bus = bus.clone();
            tokio::spawn(async move {
                for i in 0..50 {
                    bus.publish(PhaseTick(n * 50 + i)).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap();
    }

    let mut received = 0;
    while tokio::time::timeout(Duration::from_millis(100), rx.recv_event()).await.is_ok() {
        received += 1;
        if received == 100 {
            break;
        }
    }
    assert_eq!(received, 100);
}
