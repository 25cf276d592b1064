//! Invitation sender tests with a scripted mail transport

use anyhow::anyhow;
use async_trait::async_trait;
use rsvp_common::db::{EventDetails, NewAttendee};
use rsvp_common::{time, token};
use rsvp_guests::events::create_event;
use rsvp_guests::mailer::{Invitation, MailTransport};
use rsvp_guests::{reconcile, AttendeeStore, Candidate, InvitationSender, MemoryStore, SendError};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Records every invitation and fails for the listed addresses
#[derive(Default)]
struct MockTransport {
    fail_for: HashSet<String>,
    delivered: Mutex<Vec<Invitation>>,
}

impl MockTransport {
    fn failing_for(emails: &[&str]) -> Self {
        Self {
            fail_for: emails.iter().map(|e| e.to_string()).collect(),
            delivered: Mutex::new(Vec::new()),
        }
    }

    fn delivered_to(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|i| i.email.clone())
            .collect()
    }
}

#[async_trait]
impl MailTransport for MockTransport {
    async fn send(&self, invitation: &Invitation) -> anyhow::Result<()> {
        if self.fail_for.contains(&invitation.email) {
            return Err(anyhow!("mailbox unavailable"));
        }
        self.delivered.lock().unwrap().push(invitation.clone());
        Ok(())
    }
}

async fn setup() -> (Arc<MemoryStore>, Uuid) {
    let store = Arc::new(MemoryStore::new());
    let event = create_event(
        store.as_ref(),
        EventDetails {
            title: "Housewarming".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    (store, event.id)
}

async fn add(store: &MemoryStore, event: Uuid, name: &str, email: &str) -> Uuid {
    reconcile(store, Candidate::new(event, name, email))
        .await
        .unwrap()
        .attendee
        .id
}

fn seeded(event: Uuid, name: &str, email: &str, additional: Option<&str>) -> rsvp_common::db::Attendee {
    NewAttendee {
        event_id: event,
        name: name.to_string(),
        email: email.to_string(),
        party_size: 1,
        token: token::generate(),
        additional_emails: additional.map(str::to_string),
        last_modified: time::now(),
    }
    .into_attendee()
}

#[tokio::test]
async fn test_batch_continues_past_missing_recipient() {
    let (store, event) = setup().await;
    let a = add(&store, event, "A", "a@x.com").await;
    let b = seeded(event, "B", "", None);
    let b_id = b.id;
    store.seed_attendee(b).unwrap();
    let c = add(&store, event, "C", "c@x.com").await;

    let transport = Arc::new(MockTransport::default());
    let sender = InvitationSender::new(store.clone(), transport.clone(), "http://localhost:3000");

    let report = sender.send_all_pending(event).await.unwrap();

    assert_eq!(report.attempted, 3);
    assert_eq!(report.sent, vec![a, c]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].attendee_id, b_id);
    assert!(!report.all_succeeded());
    assert_eq!(transport.delivered_to(), vec!["a@x.com", "c@x.com"]);

    assert!(store.get_attendee(a).await.unwrap().unwrap().is_sent);
    assert!(!store.get_attendee(b_id).await.unwrap().unwrap().is_sent);
    assert!(store.get_attendee(c).await.unwrap().unwrap().is_sent);
}

#[tokio::test]
async fn test_transport_failure_leaves_attendee_unsent() {
    let (store, event) = setup().await;
    let ok = add(&store, event, "Ann", "ann@x.com").await;
    let bad = add(&store, event, "Bea", "bea@x.com").await;
    let before = store.get_attendee(bad).await.unwrap().unwrap();

    let transport = Arc::new(MockTransport::failing_for(&["bea@x.com"]));
    let sender = InvitationSender::new(store.clone(), transport, "http://localhost:3000");

    let report = sender.send_all_pending(event).await.unwrap();
    assert_eq!(report.sent, vec![ok]);
    assert!(report.failed[0].reason.contains("mailbox unavailable"));

    let after = store.get_attendee(bad).await.unwrap().unwrap();
    assert_eq!(after, before);

    // Only the failed one is still pending
    let pending = store.list_unsent(event).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, bad);
}

#[tokio::test]
async fn test_send_one_marks_sent_and_advances_stamp() {
    let (store, event) = setup().await;
    let id = reconcile(
        store.as_ref(),
        Candidate::new(event, "Bob", "bob@x.com").with_additional_emails(["carol@x.com"]),
    )
    .await
    .unwrap()
    .attendee
    .id;
    let before = store.get_attendee(id).await.unwrap().unwrap();

    let transport = Arc::new(MockTransport::default());
    let sender = InvitationSender::new(store.clone(), transport.clone(), "https://rsvp.example.org/");
    sender.send_one(id).await.unwrap();

    let after = store.get_attendee(id).await.unwrap().unwrap();
    assert!(after.is_sent);
    assert!(after.last_modified > before.last_modified);

    let delivered = transport.delivered.lock().unwrap();
    assert_eq!(delivered[0].cc, vec!["carol@x.com"]);
    assert_eq!(
        delivered[0].rsvp_url(),
        format!("https://rsvp.example.org/rsvp/{}", before.token)
    );
}

#[tokio::test]
async fn test_send_one_missing_recipient() {
    let (store, event) = setup().await;
    let nobody = seeded(event, "Nobody", "  ", None);
    let id = nobody.id;
    store.seed_attendee(nobody).unwrap();

    let sender = InvitationSender::new(store.clone(), Arc::new(MockTransport::default()), "http://localhost:3000");
    let result = sender.send_one(id).await;

    assert!(matches!(result, Err(SendError::MissingRecipient(x)) if x == id));
    assert!(!store.get_attendee(id).await.unwrap().unwrap().is_sent);
}

#[tokio::test]
async fn test_corrupt_additional_emails_still_sends_primary() {
    let (store, event) = setup().await;
    let broken = seeded(event, "Dee", "dee@x.com", Some("{not json"));
    let id = broken.id;
    store.seed_attendee(broken).unwrap();

    let transport = Arc::new(MockTransport::default());
    let sender = InvitationSender::new(store.clone(), transport.clone(), "http://localhost:3000");
    sender.send_one(id).await.unwrap();

    let delivered = transport.delivered.lock().unwrap();
    assert_eq!(delivered.len(), 1);
    assert!(delivered[0].cc.is_empty());
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let (store, _) = setup().await;
    let sender = InvitationSender::new(store, Arc::new(MockTransport::default()), "http://localhost:3000");

    assert!(matches!(sender.send_one(Uuid::new_v4()).await, Err(SendError::NotFound(_))));
    assert!(matches!(
        sender.send_all_pending(Uuid::new_v4()).await,
        Err(SendError::NotFound(_))
    ));
}

#[tokio::test]
async fn test_already_sent_skipped_by_batch() {
    let (store, event) = setup().await;
    let id = add(&store, event, "Ann", "ann@x.com").await;

    let transport = Arc::new(MockTransport::default());
    let sender = InvitationSender::new(store.clone(), transport.clone(), "http://localhost:3000");
    sender.send_all_pending(event).await.unwrap();
    let second = sender.send_all_pending(event).await.unwrap();

    assert_eq!(second.attempted, 0);
    assert!(second.all_succeeded());
    assert_eq!(transport.delivered_to(), vec!["ann@x.com"]);

    // Explicit resend is allowed
    sender.send_one(id).await.unwrap();
    assert_eq!(transport.delivered_to().len(), 2);
}

/// Deletes the recipient's row while "delivering", as a concurrent organizer edit would
struct RemovingTransport {
    store: Arc<MemoryStore>,
}

#[async_trait]
impl MailTransport for RemovingTransport {
    async fn send(&self, invitation: &Invitation) -> anyhow::Result<()> {
        if invitation.email == "gone@x.com" {
            if let Some(a) = self.store.find_attendee_by_token(&invitation.token).await? {
                self.store.delete_attendee(a.id).await?;
            }
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_attendee_removed_mid_send_is_not_reported_sent() {
    let (store, event) = setup().await;
    let kept = add(&store, event, "Ann", "ann@x.com").await;
    let gone = add(&store, event, "Gus", "gone@x.com").await;

    let transport = Arc::new(RemovingTransport { store: store.clone() });
    let sender = InvitationSender::new(store.clone(), transport, "http://localhost:3000");

    let report = sender.send_all_pending(event).await.unwrap();

    assert_eq!(report.sent, vec![kept]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].attendee_id, gone);
    assert!(!report.all_succeeded());
}
