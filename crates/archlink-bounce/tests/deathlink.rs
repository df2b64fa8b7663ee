//! End-to-end DeathLink flow through the dispatcher, with a loopback server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use archlink_bounce::{
    BounceError, BounceRegistry, DeathLink, DeathLinkService, Delivery,
    PacketDispatcher, PacketListener, PacketSender, DEATH_LINK_TAG, FAILED_LOG_KEY,
};
use archlink_protocol::memory::{Identity, MemoryAuditLog};
use archlink_protocol::{encode_packets, ActiveIdentity, Packet, Slot, Team};
use chrono::{TimeZone, Utc};

// =========================================================================
// Loopback: every Bounce comes straight back as a Bounced.
// =========================================================================

struct Loopback {
    dispatcher: Arc<PacketDispatcher>,
    sent: Mutex<Vec<Packet>>,
}

impl PacketSender for Loopback {
    fn send_packets(&self, packets: Vec<Packet>) -> Result<Delivery, BounceError> {
        self.sent.lock().unwrap().extend(packets.iter().cloned());

        let echoed: Vec<Packet> = packets
            .into_iter()
            .filter_map(|p| match p {
                Packet::Bounce(body) => Some(Packet::Bounced(body)),
                _ => None,
            })
            .collect();
        if !echoed.is_empty() {
            let wire = encode_packets(&echoed)?;
            self.dispatcher.dispatch(&wire)?;
        }
        Ok(Delivery::written())
    }
}

struct ClosedSender;

impl PacketSender for ClosedSender {
    fn send_packets(&self, _packets: Vec<Packet>) -> Result<Delivery, BounceError> {
        Err(BounceError::ConnectionClosed("test".into()))
    }
}

/// Accepts packets but never writes them, like a writer that died with
/// the packets still queued.
#[derive(Default)]
struct DroppingSender {
    queued: Mutex<Vec<Packet>>,
}

impl PacketSender for DroppingSender {
    fn send_packets(&self, packets: Vec<Packet>) -> Result<Delivery, BounceError> {
        self.queued.lock().unwrap().extend(packets);
        let (notice, delivery) = Delivery::pending();
        drop(notice);
        Ok(delivery)
    }
}

/// An identity whose tag reads are slow enough for callers to overlap.
struct SlowIdentity(Identity);

impl ActiveIdentity for SlowIdentity {
    fn team(&self) -> Team {
        self.0.team()
    }

    fn slot(&self) -> Slot {
        self.0.slot()
    }

    fn tags(&self) -> Vec<String> {
        let tags = self.0.tags();
        std::thread::sleep(Duration::from_millis(5));
        tags
    }

    fn set_tags(&self, tags: Vec<String>) {
        self.0.set_tags(tags);
    }
}

fn connect_updates(sent: &[Packet]) -> Vec<Vec<String>> {
    sent.iter()
        .filter_map(|p| match p {
            Packet::ConnectUpdate(u) => Some(u.tags.clone()),
            _ => None,
        })
        .collect()
}

struct Harness {
    dispatcher: Arc<PacketDispatcher>,
    loopback: Arc<Loopback>,
    identity: Arc<Identity>,
    audit: Arc<MemoryAuditLog>,
    service: Arc<DeathLinkService>,
    received: Arc<Mutex<Vec<DeathLink>>>,
}

fn harness() -> Harness {
    let dispatcher = Arc::new(PacketDispatcher::new());
    let loopback = Arc::new(Loopback {
        dispatcher: Arc::clone(&dispatcher),
        sent: Mutex::new(Vec::new()),
    });
    let registry = Arc::new(BounceRegistry::new(loopback.clone()));
    let listener: Arc<dyn PacketListener> = registry.clone();
    dispatcher.subscribe(listener);

    let identity = Arc::new(Identity::new(Team(0), Slot(3)).with_tags(["AP"]));
    let audit = Arc::new(MemoryAuditLog::new());
    let service = Arc::new(DeathLinkService::new(
        registry,
        identity.clone(),
        audit.clone(),
    ));
    service.attach();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    service.on_death_link(Arc::new(move |dl: &DeathLink| {
        sink.lock().unwrap().push(dl.clone());
    }));

    Harness {
        dispatcher,
        loopback,
        identity,
        audit,
        service,
        received,
    }
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_sent_death_link_comes_back_intact() {
    let h = harness();
    let ts = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
    let death = DeathLink::at(ts, "Link", Some("fell in a pit".into()));

    h.service.send(&death).await.unwrap();

    assert_eq!(*h.received.lock().unwrap(), vec![death]);
    assert_eq!(h.audit.entries("team-0/slot-3/deathlink/send").len(), 1);
    assert_eq!(h.audit.entries("team-0/slot-3/deathlink/received").len(), 1);
    assert!(h.audit.entries(FAILED_LOG_KEY).is_empty());
}

#[test]
fn test_payload_without_source_is_audited_but_not_delivered() {
    let h = harness();

    h.dispatcher
        .dispatch(r#"[{"cmd":"Bounced","tags":["DeathLink"],"data":{"time":100}}]"#)
        .unwrap();

    assert!(h.received.lock().unwrap().is_empty());
    assert_eq!(h.audit.entries("team-0/slot-3/deathlink/received").len(), 1);
    let failed = h.audit.entries(FAILED_LOG_KEY);
    assert_eq!(failed.len(), 1);
    assert!(failed[0].contains("source"), "{failed:?}");
}

#[test]
fn test_bounces_for_other_tags_do_not_reach_death_link() {
    let h = harness();

    h.dispatcher
        .dispatch(r#"[{"cmd":"Bounced","tags":["Other"],"data":{"time":1,"source":"x"}}]"#)
        .unwrap();

    assert!(h.received.lock().unwrap().is_empty());
    assert!(h.audit.keys().is_empty());
}

#[tokio::test]
async fn test_enable_adds_tag_once_and_announces_it() {
    let h = harness();

    assert!(h.service.enable().await.unwrap());
    assert!(!h.service.enable().await.unwrap());

    assert_eq!(h.identity.tags(), vec!["AP", DEATH_LINK_TAG]);
    let updates = connect_updates(&h.loopback.sent.lock().unwrap());
    assert_eq!(updates, vec![vec!["AP".to_string(), DEATH_LINK_TAG.to_string()]]);
}

#[tokio::test]
async fn test_disable_removes_only_the_death_link_tag() {
    let h = harness();
    h.service.enable().await.unwrap();

    assert!(h.service.disable().await.unwrap());
    assert!(!h.service.disable().await.unwrap());
    assert_eq!(h.identity.tags(), vec!["AP"]);
    assert!(!h.service.is_enabled());
}

#[tokio::test]
async fn test_enable_on_closed_connection_leaves_tags_alone() {
    let registry = Arc::new(BounceRegistry::new(Arc::new(ClosedSender)));
    let identity = Arc::new(Identity::new(Team(1), Slot(2)));
    let audit = Arc::new(MemoryAuditLog::new());
    let service = DeathLinkService::new(registry, identity.clone(), audit.clone());

    assert!(matches!(
        service.enable().await,
        Err(BounceError::ConnectionClosed(_))
    ));
    assert!(identity.tags().is_empty());

    assert!(service.send(&DeathLink::new("Samus", None)).await.is_err());
    assert!(audit.entries("team-1/slot-2/deathlink/send").is_empty());
}

#[test]
fn test_custom_scope_changes_audit_keys() {
    let registry = Arc::new(BounceRegistry::new(Arc::new(ClosedSender)));
    let service = DeathLinkService::new(
        registry,
        Arc::new(Identity::new(Team(0), Slot(1))),
        Arc::new(MemoryAuditLog::new()),
    )
    .with_scope("seed-42");

    assert_eq!(service.received_log_key(), "seed-42/deathlink/received");
    assert_eq!(service.send_log_key(), "seed-42/deathlink/send");
}

#[tokio::test]
async fn test_unwritten_death_link_fails_and_is_not_logged() {
    let sender = Arc::new(DroppingSender::default());
    let registry = Arc::new(BounceRegistry::new(sender.clone()));
    let audit = Arc::new(MemoryAuditLog::new());
    let service = DeathLinkService::new(
        registry,
        Arc::new(Identity::new(Team(0), Slot(4))),
        audit.clone(),
    );

    let result = service.send(&DeathLink::new("Link", None)).await;

    assert!(matches!(result, Err(BounceError::ConnectionClosed(_))));
    assert_eq!(sender.queued.lock().unwrap().len(), 1);
    assert!(audit.entries("team-0/slot-4/deathlink/send").is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_enables_append_the_tag_once() {
    let sender = Arc::new(DroppingSender::default());
    let registry = Arc::new(BounceRegistry::new(sender.clone()));
    let identity = Arc::new(SlowIdentity(Identity::new(Team(0), Slot(1)).with_tags(["AP"])));
    let service = Arc::new(DeathLinkService::new(
        registry,
        identity.clone(),
        Arc::new(MemoryAuditLog::new()),
    ));

    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.enable().await })
        })
        .collect();
    let mut changed = 0;
    for task in tasks {
        // Only the call that appended waits on a (dropped) delivery.
        match task.await.unwrap() {
            Ok(false) => {}
            Err(BounceError::ConnectionClosed(_)) => changed += 1,
            other => panic!("unexpected enable result: {other:?}"),
        }
    }

    assert_eq!(changed, 1);
    assert_eq!(identity.tags(), vec!["AP", DEATH_LINK_TAG]);
    assert_eq!(connect_updates(&sender.queued.lock().unwrap()).len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_enable_and_disable_keep_server_and_identity_in_step() {
    let h = harness();
    let identity = Arc::new(SlowIdentity(Identity::new(Team(0), Slot(3))));
    let registry = Arc::new(BounceRegistry::new(h.loopback.clone()));
    let service = Arc::new(DeathLinkService::new(
        registry,
        identity.clone(),
        Arc::new(MemoryAuditLog::new()),
    ));

    let tasks: Vec<_> = (0..12)
        .map(|i| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    service.enable().await
                } else {
                    service.disable().await
                }
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let updates = connect_updates(&h.loopback.sent.lock().unwrap());
    let last = updates.last().cloned().unwrap_or_default();
    assert_eq!(last, identity.tags());
    // Updates strictly alternate: no two enables or disables in a row.
    for pair in updates.windows(2) {
        assert_ne!(pair[0], pair[1]);
    }
}
