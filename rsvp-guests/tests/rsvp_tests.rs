//! Guest RSVP path: token lookup, response recording, push notifications

use anyhow::bail;
use async_trait::async_trait;
use rsvp_common::db::{Attendee, Event, EventDetails, Response};
use rsvp_common::Error;
use rsvp_guests::events::create_event;
use rsvp_guests::notify::PushNotifier;
use rsvp_guests::rsvp::{find_by_token, ResponseRecorder};
use rsvp_guests::{reconcile, AttendeeStore, Candidate, MemoryStore};
use std::sync::Arc;
use tokio::sync::mpsc;

async fn setup() -> (Arc<MemoryStore>, Attendee) {
    let store = Arc::new(MemoryStore::new());
    let event = create_event(
        store.as_ref(),
        EventDetails {
            title: "Gala".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    let attendee = reconcile(
        store.as_ref(),
        Candidate::new(event.id, "Alice", "alice@x.com").with_party_size(2),
    )
    .await
    .unwrap()
    .attendee;
    (store, attendee)
}

/// Forwards every notification to a channel
struct ChannelNotifier(mpsc::UnboundedSender<(String, Option<Response>)>);

#[async_trait]
impl PushNotifier for ChannelNotifier {
    async fn notify(&self, event: &Event, attendee: &Attendee) -> anyhow::Result<()> {
        self.0.send((event.title.clone(), attendee.response))?;
        Ok(())
    }
}

struct FailingNotifier;

#[async_trait]
impl PushNotifier for FailingNotifier {
    async fn notify(&self, _event: &Event, _attendee: &Attendee) -> anyhow::Result<()> {
        bail!("push service down")
    }
}

#[tokio::test]
async fn test_malformed_tokens_rejected_before_lookup() {
    let (store, attendee) = setup().await;

    let upper = attendee.token.to_uppercase();
    let too_long = format!("{}0", attendee.token);
    for bad in ["", "abc", upper.as_str(), too_long.as_str()] {
        let result = find_by_token(store.as_ref(), bad).await;
        assert!(matches!(result, Err(Error::InvalidInput(_))), "accepted {:?}", bad);
    }
}

#[tokio::test]
async fn test_well_formed_unknown_token_is_not_found() {
    let (store, _) = setup().await;

    let result = find_by_token(store.as_ref(), "0123456789abcdef0123456789abcdef").await;

    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_find_by_token() {
    let (store, attendee) = setup().await;

    let found = find_by_token(store.as_ref(), &attendee.token).await.unwrap();

    assert_eq!(found.id, attendee.id);
}

#[tokio::test]
async fn test_record_response_with_party_size() {
    let (store, attendee) = setup().await;
    let recorder = ResponseRecorder::new(store.clone());

    let updated = recorder.record(&attendee.token, Response::Yes, Some(5)).await.unwrap();

    assert_eq!(updated.response, Some(Response::Yes));
    assert_eq!(updated.party_size, 5);
    assert!(updated.responded_at.is_some());
    assert!(updated.last_modified > attendee.last_modified);
    assert_eq!(store.get_attendee(attendee.id).await.unwrap().unwrap(), updated);
}

#[tokio::test]
async fn test_non_positive_party_size_ignored() {
    let (store, attendee) = setup().await;
    let recorder = ResponseRecorder::new(store.clone());

    let updated = recorder.record(&attendee.token, Response::No, Some(0)).await.unwrap();

    assert_eq!(updated.response, Some(Response::No));
    assert_eq!(updated.party_size, 2);
}

#[tokio::test]
async fn test_guest_can_change_answer() {
    let (store, attendee) = setup().await;
    let recorder = ResponseRecorder::new(store.clone());

    let first = recorder.record(&attendee.token, Response::Yes, None).await.unwrap();
    let second = recorder.record(&attendee.token, Response::No, None).await.unwrap();

    assert_eq!(second.response, Some(Response::No));
    assert!(second.last_modified > first.last_modified);
}

#[tokio::test]
async fn test_notifier_receives_response() {
    let (store, attendee) = setup().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let recorder = ResponseRecorder::new(store).with_notifier(Arc::new(ChannelNotifier(tx)));

    recorder.record(&attendee.token, Response::Yes, None).await.unwrap();

    let (title, response) = rx.recv().await.unwrap();
    assert_eq!(title, "Gala");
    assert_eq!(response, Some(Response::Yes));
}

#[tokio::test]
async fn test_notifier_failure_does_not_fail_response() {
    let (store, attendee) = setup().await;
    let recorder = ResponseRecorder::new(store.clone()).with_notifier(Arc::new(FailingNotifier));

    let updated = recorder.record(&attendee.token, Response::Yes, None).await.unwrap();

    assert_eq!(updated.response, Some(Response::Yes));
    let stored = store.get_attendee(attendee.id).await.unwrap().unwrap();
    assert_eq!(stored.response, Some(Response::Yes));
}

#[tokio::test]
async fn test_inline_notification_done_before_record_returns() {
    let (store, attendee) = setup().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let recorder = ResponseRecorder::new(store)
        .with_notifier(Arc::new(ChannelNotifier(tx)))
        .notify_inline();

    recorder.record(&attendee.token, Response::No, None).await.unwrap();

    let (title, response) = rx.try_recv().expect("notification already delivered");
    assert_eq!(title, "Gala");
    assert_eq!(response, Some(Response::No));
}

#[tokio::test]
async fn test_inline_notifier_failure_is_swallowed() {
    let (store, attendee) = setup().await;
    let recorder = ResponseRecorder::new(store.clone())
        .with_notifier(Arc::new(FailingNotifier))
        .notify_inline();

    let updated = recorder.record(&attendee.token, Response::Yes, Some(3)).await.unwrap();

    assert_eq!(updated.party_size, 3);
    assert_eq!(store.get_attendee(attendee.id).await.unwrap().unwrap(), updated);
}
