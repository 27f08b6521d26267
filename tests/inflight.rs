//! Lease control: ack/release laws, error paths, and the in-flight put
//! policies.

use leaseq::{InFlightPolicy, LeasedKeyQueue, QueueConfig, QueueError};

fn queue() -> LeasedKeyQueue<&'static str, i64> {
    LeasedKeyQueue::new(QueueConfig::default())
}

#[tokio::test]
async fn ack_removes_permanently() {
    let queue = queue();
    queue.put("key1", 100).unwrap();

    let (_, _, lease) = queue.get(None, None).await.unwrap();
    assert_eq!(queue.inflight_size(), 1);

    queue.ack(&lease).unwrap();
    assert_eq!(queue.inflight_size(), 0);
    assert_eq!(queue.qsize(), 0);
    assert!(!queue.contains(&"key1"));
}

#[tokio::test]
async fn lease_from_another_queue_is_invalid() {
    let ours = queue();
    let theirs = queue();
    theirs.put("key1", 100).unwrap();
    let (_, _, foreign) = theirs.get(None, None).await.unwrap();

    assert!(matches!(
        ours.ack(&foreign),
        Err(QueueError::InvalidLease { .. })
    ));
    assert!(matches!(
        ours.release(&foreign, false),
        Err(QueueError::InvalidLease { .. })
    ));
}

#[tokio::test]
async fn double_ack_fails() {
    let queue = queue();
    queue.put("key1", 100).unwrap();

    let (_, _, lease) = queue.get(None, None).await.unwrap();
    queue.ack(&lease).unwrap();

    assert!(matches!(
        queue.ack(&lease),
        Err(QueueError::AlreadyAcknowledged { .. })
    ));
}

#[tokio::test]
async fn release_after_ack_fails() {
    let queue = queue();
    queue.put("key1", 100).unwrap();

    let (_, _, lease) = queue.get(None, None).await.unwrap();
    queue.ack(&lease).unwrap();

    assert!(matches!(
        queue.release(&lease, false),
        Err(QueueError::AlreadyAcknowledged { .. })
    ));
}

#[tokio::test]
async fn release_after_release_fails() {
    let queue = queue();
    queue.put("key1", 100).unwrap();

    let (_, _, lease) = queue.get(None, None).await.unwrap();
    queue.release(&lease, false).unwrap();

    assert!(matches!(
        queue.release(&lease, false),
        Err(QueueError::InvalidLease { .. })
    ));
}

#[tokio::test]
async fn release_requeues_to_back_by_default() {
    let queue = queue();
    queue.put("key1", 100).unwrap();
    queue.put("key2", 200).unwrap();

    let (_, _, lease1) = queue.get(None, None).await.unwrap();
    let (_, _, lease2) = queue.get(None, None).await.unwrap();

    queue.release(&lease1, false).unwrap();
    queue.ack(&lease2).unwrap();

    let (key, _, _) = queue.get(None, None).await.unwrap();
    assert_eq!(key, "key1");
}

#[tokio::test]
async fn release_requeues_to_front_on_request() {
    let queue = queue();
    queue.put("a", 1).unwrap();
    queue.put("b", 2).unwrap();

    let (_, _, lease) = queue.get(None, None).await.unwrap();
    queue.release(&lease, true).unwrap();

    let (key, value, _) = queue.get(None, None).await.unwrap();
    assert_eq!((key, value), ("a", 1));
}

#[tokio::test]
async fn reject_policy_fails_while_in_flight() {
    let queue = queue();
    queue.put("a", 1).unwrap();
    let (_, _, lease) = queue.get(None, None).await.unwrap();

    let err = queue.put_with("a", 9, InFlightPolicy::Reject).unwrap_err();
    assert!(matches!(err, QueueError::KeyInFlight { .. }));
    assert_eq!(err.as_label(), "key_in_flight");

    queue.ack(&lease).unwrap();
    assert!(!queue.contains(&"a"));

    // No longer in flight, so Reject behaves like a plain put.
    queue.put_with("a", 9, InFlightPolicy::Reject).unwrap();
    assert_eq!(queue.peek(&"a"), Some(9));
}

#[tokio::test]
async fn update_policy_changes_value_seen_on_requeue() {
    let queue = queue();
    queue.put("key1", 100).unwrap();

    let (_, value, lease) = queue.get(None, None).await.unwrap();
    assert_eq!(value, 100);

    // The holder keeps the value from `get`; the update lands on release.
    queue.put("key1", 200).unwrap();
    queue.release(&lease, false).unwrap();

    let (_, value, _) = queue.get(None, None).await.unwrap();
    assert_eq!(value, 200);
}

#[tokio::test]
async fn update_policy_value_is_dropped_on_ack() {
    let queue = queue();
    queue.put("key1", 100).unwrap();

    let (_, _, lease) = queue.get(None, None).await.unwrap();
    queue.put("key1", 200).unwrap();
    queue.ack(&lease).unwrap();

    assert!(!queue.contains(&"key1"));
    assert_eq!(queue.qsize(), 0);
}

#[tokio::test]
async fn buffer_policy_enqueues_fresh_copy() {
    let queue = queue();
    queue.put("key1", 100).unwrap();
    let (_, _, _lease) = queue.get(None, None).await.unwrap();

    queue.put_with("key1", 200, InFlightPolicy::Buffer).unwrap();

    assert_eq!(queue.qsize(), 1);
    assert_eq!(queue.inflight_size(), 1);
    assert_eq!(queue.peek(&"key1"), Some(200));
}

#[tokio::test]
async fn release_does_not_duplicate_buffered_key() {
    let queue = queue();
    queue.put("key1", 100).unwrap();
    let (_, _, lease) = queue.get(None, None).await.unwrap();

    queue.put_with("key1", 200, InFlightPolicy::Buffer).unwrap();
    let before = queue.qsize();

    queue.release(&lease, false).unwrap();
    assert_eq!(queue.qsize(), before);

    // The buffered copy wins over the released record's value.
    let (_, value, _) = queue.get(None, None).await.unwrap();
    assert_eq!(value, 200);
}

#[tokio::test]
async fn multiple_leases_resolve_independently() {
    let queue = queue();
    queue.put("key1", 100).unwrap();
    queue.put("key2", 200).unwrap();
    queue.put("key3", 300).unwrap();

    let (_, _, lease1) = queue.get(None, None).await.unwrap();
    let (_, _, lease2) = queue.get(None, None).await.unwrap();
    let (_, _, lease3) = queue.get(None, None).await.unwrap();
    assert_eq!(queue.inflight_size(), 3);

    queue.ack(&lease1).unwrap();
    assert_eq!(queue.inflight_size(), 2);

    queue.release(&lease2, false).unwrap();
    assert_eq!(queue.inflight_size(), 1);
    assert_eq!(queue.qsize(), 1);

    queue.ack(&lease3).unwrap();
    assert_eq!(queue.inflight_size(), 0);
}

#[tokio::test]
async fn inflight_keys_follow_lease_lifecycle() {
    let queue = queue();
    queue.put("key1", 100).unwrap();
    queue.put("key2", 200).unwrap();

    let (_, _, lease1) = queue.get(None, None).await.unwrap();
    assert_eq!(queue.inflight_keys().len(), 1);
    assert!(queue.inflight_keys().contains(&"key1"));

    let (_, _, lease2) = queue.get(None, None).await.unwrap();
    assert_eq!(queue.inflight_keys().len(), 2);

    queue.ack(&lease1).unwrap();
    assert!(!queue.inflight_keys().contains(&"key1"));

    queue.release(&lease2, false).unwrap();
    assert!(queue.inflight_keys().is_empty());
}
