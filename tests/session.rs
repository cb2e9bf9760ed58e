//! Session behaviour against the in-memory transport.

use async_trait::async_trait;
use siggo::api::events::TransportEvent;
use siggo::api::mock::MockTransport;
use siggo::api::models::{ReceiptEvent, ReceivedEvent};
use siggo::api::{Handlers, ReceiptCallback, ReceivedCallback, Transport};
use siggo::app::AppConfig;
use siggo::error::TransportError;
use siggo::{Contact, Conversation, Error, Message, Observer, Session};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

fn config() -> AppConfig {
    AppConfig {
        user_name: "me".into(),
        user_number: "+1000".into(),
        ..AppConfig::default()
    }
}

fn setup() -> (Arc<MockTransport>, Session) {
    let transport = Arc::new(MockTransport::new());
    let session = Session::new(transport.clone(), config());
    (transport, session)
}

fn received(from: &str, text: &str, ts: i64) -> ReceivedEvent {
    ReceivedEvent {
        source: from.into(),
        message: text.into(),
        timestamp: ts,
    }
}

fn receipt(from: &str, delivered: bool, read: bool, timestamps: Vec<i64>) -> ReceiptEvent {
    ReceiptEvent {
        source: from.into(),
        is_delivery: delivered,
        is_read: read,
        timestamps,
    }
}

fn rendered(session: &Session, number: &str) -> String {
    session
        .conversation(&Contact::new(number))
        .map(|c| c.to_string())
        .unwrap_or_default()
}

#[derive(Default)]
struct Recorder {
    new_info: Mutex<Vec<String>>,
    status: Mutex<Vec<String>>,
    sending: Mutex<Vec<i64>>,
}

impl Observer for Recorder {
    fn new_info(&self, conversation: &Conversation) {
        self.new_info
            .lock()
            .unwrap()
            .push(conversation.contact().number.clone());
    }

    fn status_changed(&self, conversation: &Conversation) {
        self.status
            .lock()
            .unwrap()
            .push(conversation.contact().number.clone());
    }

    fn sending(&self, message: &Message, _conversation: &Conversation) {
        self.sending.lock().unwrap().push(message.timestamp());
    }
}

#[test]
fn starts_with_the_local_user() {
    let (_, session) = setup();
    let contacts = session.contacts();
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts["+1000"].display_name(), "me");
    assert!(session.conversations().contains_key(&Contact::new("+1000")));
}

#[test]
fn first_message_from_unknown_sender() {
    let (transport, session) = setup();

    transport.deliver(received("+1555", "hi", 100)).unwrap();

    assert_eq!(session.contacts().len(), 2);
    assert_eq!(session.conversations().len(), 2);
    assert_eq!(session.contacts()["+1555"].name, None);
    assert_eq!(rendered(&session, "+1555"), "100|<? +1555: hi\n");
}

#[test]
fn known_contact_name_is_used_as_sender() {
    let transport = Arc::new(MockTransport::new());
    let registry = siggo::model::Registry::with_contacts([Contact::named("+1555", "Ada")]);
    let session = Session::with_registry(transport.clone(), config(), registry);

    transport.deliver(received("+1555", "hi", 100)).unwrap();

    assert_eq!(rendered(&session, "+1555"), "100|<? Ada: hi\n");
    assert_eq!(session.contacts().len(), 1);
}

#[test]
fn receipt_updates_the_matching_message() {
    let (transport, session) = setup();
    transport.deliver(received("+1555", "hi", 100)).unwrap();
    transport.deliver(received("+1555", "there", 101)).unwrap();

    transport
        .deliver_receipt(receipt("+1555", true, true, vec![100]))
        .unwrap();

    assert_eq!(
        rendered(&session, "+1555"),
        "100|<> +1555: hi\n101|<? +1555: there\n"
    );
}

#[test]
fn receipt_for_unknown_timestamp_changes_nothing() {
    let (transport, session) = setup();
    transport.deliver(received("+1555", "hi", 100)).unwrap();
    let before = session.conversation(&Contact::new("+1555")).unwrap();

    transport
        .deliver_receipt(receipt("+1555", true, true, vec![999]))
        .unwrap();

    let after = session.conversation(&Contact::new("+1555")).unwrap();
    assert_eq!(after.order(), before.order());
    assert_eq!(after.to_string(), before.to_string());
}

#[test]
fn receipt_from_unknown_sender_creates_an_empty_conversation() {
    let (transport, session) = setup();

    transport
        .deliver_receipt(receipt("+1999", true, false, vec![5]))
        .unwrap();

    let conv = session.conversation(&Contact::new("+1999")).unwrap();
    assert!(conv.is_empty());
    assert!(!conv.has_new_message());
}

#[test]
fn duplicate_delivery_keeps_one_entry() {
    let (transport, session) = setup();
    transport.deliver(received("+1555", "hi", 100)).unwrap();
    session.mark_seen(&Contact::new("+1555"));

    transport.deliver(received("+1555", "hi again", 100)).unwrap();

    let conv = session.conversation(&Contact::new("+1555")).unwrap();
    assert_eq!(conv.order(), &[100]);
    assert!(!conv.has_new_message());
    assert_eq!(conv.to_string(), "100|<? +1555: hi again\n");
}

#[test]
fn observers_hear_about_new_messages_and_status() {
    let (transport, session) = setup();
    let recorder = Arc::new(Recorder::default());
    let closure_hits = Arc::new(Mutex::new(0));
    session.subscribe(recorder.clone());
    let hits = closure_hits.clone();
    session.subscribe(Arc::new(move |_: &Conversation| {
        *hits.lock().unwrap() += 1;
    }));

    transport.deliver(received("+1555", "hi", 100)).unwrap();
    transport
        .deliver_receipt(receipt("+1555", true, true, vec![100]))
        .unwrap();
    transport
        .deliver_receipt(receipt("+1555", true, true, vec![404]))
        .unwrap();

    assert_eq!(*recorder.new_info.lock().unwrap(), vec!["+1555".to_string()]);
    assert_eq!(*recorder.status.lock().unwrap(), vec!["+1555".to_string()]);
    assert_eq!(*closure_hits.lock().unwrap(), 1);
}

#[test]
fn observers_may_reenter_the_session() {
    let transport = Arc::new(MockTransport::new());
    let session = Arc::new(Session::new(transport.clone(), config()));
    let weak = Arc::downgrade(&session);
    session.subscribe(Arc::new(move |conv: &Conversation| {
        if let Some(session) = weak.upgrade() {
            session.mark_seen(conv.contact());
        }
    }));

    transport.deliver(received("+1555", "hi", 100)).unwrap();

    let conv = session.conversation(&Contact::new("+1555")).unwrap();
    assert!(!conv.has_new_message());
}

#[tokio::test]
async fn send_records_a_pending_message() {
    let (transport, session) = setup();
    let recorder = Arc::new(Recorder::default());
    session.subscribe(recorder.clone());
    let ada = session.contact("+1555");

    session.send("hello", &ada).await.unwrap();

    assert_eq!(transport.sent(), vec![("+1555".to_string(), "hello".to_string())]);
    let conv = session.conversation(&ada).unwrap();
    let message = conv.last_message().unwrap();
    assert!(message.is_provisional());
    assert!(!message.is_delivered);
    assert_eq!(message.sender(), "me");
    assert_eq!(*recorder.sending.lock().unwrap(), vec![message.timestamp()]);
}

#[tokio::test]
async fn failed_send_is_reported_and_kept() {
    let (transport, session) = setup();
    transport.fail_next_send("daemon unreachable");
    let contact = Contact::new("+1555");

    let err = session.send("hello", &contact).await.unwrap_err();

    assert!(matches!(err, Error::Send(_)));
    let conv = session.conversation(&contact).unwrap();
    assert_eq!(conv.len(), 1);
    assert_eq!(conv.last_message().map(Message::content), Some("hello"));
    assert!(session.contacts().contains_key("+1555"));
}

#[tokio::test]
async fn confirmed_send_is_rekeyed_and_accepts_receipts() {
    let (transport, session) = setup();
    transport.deliver(received("+1555", "hi", 100)).unwrap();
    transport.confirm_next_send(200);
    let contact = session.contact("+1555");

    session.send("hello", &contact).await.unwrap();
    transport
        .deliver_receipt(receipt("+1555", true, false, vec![200]))
        .unwrap();

    assert_eq!(
        rendered(&session, "+1555"),
        "100|<? +1555: hi\n200|<? me: hello\n"
    );
}

#[tokio::test]
async fn consecutive_sends_get_distinct_keys() {
    let (_, session) = setup();
    let contact = session.contact("+1555");

    session.send("one", &contact).await.unwrap();
    session.send("two", &contact).await.unwrap();

    let conv = session.conversation(&contact).unwrap();
    assert_eq!(conv.len(), 2);
    assert_eq!(conv.to_string(), "-1|?? me: one\n-2|?? me: two\n");
}

#[tokio::test]
async fn receive_pumps_queued_events() {
    let (transport, session) = setup();
    transport.push(TransportEvent::Received(received("+1555", "hi", 100)));
    transport.push(TransportEvent::Receipt(receipt("+1555", true, true, vec![100])));

    session.receive().await.unwrap();

    assert_eq!(rendered(&session, "+1555"), "100|<> +1555: hi\n");
}

/// Delivers a receipt for the message it is sending before it reports the
/// timestamp back, the way the websocket can beat the HTTP reply.
#[derive(Default)]
struct ReceiptBeforeReply {
    handlers: Handlers,
}

#[async_trait]
impl Transport for ReceiptBeforeReply {
    async fn send(&self, number: &str, _text: &str) -> Result<Option<i64>, TransportError> {
        self.handlers
            .dispatch(TransportEvent::Receipt(receipt(number, true, false, vec![200])))
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Some(200))
    }

    async fn receive(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn on_received(&self, callback: ReceivedCallback) {
        self.handlers.add_received(callback);
    }

    fn on_receipt(&self, callback: ReceiptCallback) {
        self.handlers.add_receipt(callback);
    }
}

#[tokio::test]
async fn receipt_arriving_before_confirmation_is_kept() {
    let transport = Arc::new(ReceiptBeforeReply::default());
    let session = Session::new(transport, config());
    let contact = session.contact("+1555");

    session.send("hello", &contact).await.unwrap();

    let conv = session.conversation(&contact).unwrap();
    assert_eq!(conv.to_string(), "200|<? me: hello\n");
    assert_eq!(conv.held_receipts(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_receive_receipt_and_send_stay_consistent() {
    const ROUNDS: i64 = 200;
    const DISTINCT: i64 = 50;

    let transport = Arc::new(MockTransport::new());
    let session = Arc::new(Session::new(transport.clone(), config()));
    let contact = session.contact("+1555");

    let mut tasks = Vec::new();
    for i in 0..ROUNDS {
        let ts = i % DISTINCT + 1;
        let t = transport.clone();
        tasks.push(tokio::spawn(async move {
            t.deliver(received("+1555", "in", ts)).unwrap();
            t.deliver_receipt(receipt("+1555", true, i % 2 == 0, vec![ts, 10_000]))
                .unwrap();
        }));
        let s = session.clone();
        let c = contact.clone();
        tasks.push(tokio::spawn(async move {
            s.send("out", &c).await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    let conv = session.conversation(&contact).unwrap();
    let distinct: HashSet<i64> = conv.order().iter().copied().collect();
    assert_eq!(distinct.len(), conv.order().len());
    assert_eq!(conv.len() as i64, DISTINCT + ROUNDS);

    let provisional: HashSet<i64> = conv.order().iter().copied().filter(|&ts| ts < 0).collect();
    assert_eq!(provisional.len() as i64, ROUNDS);
    assert_eq!(conv.messages().count(), conv.len());
    assert_eq!(transport.sent().len() as i64, ROUNDS);
}
