//! `ArchlinkClient` builder and connection wiring.
//!
//! This ties the layers together for one server connection:
//!
//! ```text
//! WebSocketConnection ──on_message──► PacketDispatcher ──► BounceRegistry ──► DeathLinkService
//!         ▲                                            └─► LogDecoder
//!         │
//!    writer task ◄── outbound queue ◄── send_death_link / send_bounce / say
//! ```
//!
//! Incoming packets are handled on the connection's receive task. Outgoing
//! packets are encoded synchronously and put on a bounded queue; a single
//! writer task drains it so whole messages go out in the order they were
//! queued, and reports each write back through the message's `Delivery`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use archlink_bounce::{
    BounceError, BounceHandler, BounceRegistry, DeathLink, DeathLinkHandler,
    DeathLinkService, Delivery, DeliveryNotice, PacketDispatcher, PacketListener,
    PacketSender, SubscriptionId,
};
use archlink_messages::{LogDecoder, LogMessageHandler, PartResolver};
use archlink_protocol::memory::{Identity, MemoryAuditLog, NameCatalog, Roster};
use archlink_protocol::{
    encode_packets, ActiveIdentity, AuditLog, ItemNames, LocationNames, Packet,
    PlayerRoster, SayPacket, Slot, Team,
};
use archlink_transport::{
    Connection, ConnectionId, ConnectionState, Transport, TransportError,
    TransportHandler, WebSocketConnection, WebSocketTransport,
};
use serde_json::{Map, Value};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::{ArchlinkError, ClientConfig};

// ---------------------------------------------------------------------------
// Connection plumbing
// ---------------------------------------------------------------------------

/// Open/closed flags shared by the handler, the queue, and the client.
struct LinkState {
    open: AtomicBool,
    closed: watch::Sender<bool>,
}

impl LinkState {
    fn new() -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            open: AtomicBool::new(false),
            closed,
        }
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }
}

/// Feeds transport events into the dispatcher.
struct ClientHandler {
    dispatcher: Arc<PacketDispatcher>,
    link: Arc<LinkState>,
}

impl TransportHandler for ClientHandler {
    fn on_open(&self) {
        self.link.open.store(true, Ordering::Release);
    }

    fn on_close(&self) {
        self.link.open.store(false, Ordering::Release);
        self.link.closed.send_replace(true);
        tracing::info!("disconnected from server");
    }

    fn on_error(&self, error: &TransportError) {
        tracing::warn!(%error, "transport error");
    }

    fn on_message(&self, message: &str) {
        if let Err(e) = self.dispatcher.dispatch(message) {
            tracing::warn!(error = %e, len = message.len(), "dropping undecodable message");
        }
    }
}

/// One queued wire message and the notice its sender waits on.
struct Outgoing {
    text: String,
    notice: DeliveryNotice,
}

/// The [`PacketSender`] behind every feature: encode, then queue.
struct Outbound {
    tx: mpsc::Sender<Outgoing>,
    capacity: usize,
    link: Arc<LinkState>,
}

impl PacketSender for Outbound {
    fn send_packets(&self, packets: Vec<Packet>) -> Result<Delivery, BounceError> {
        if !self.link.is_open() {
            return Err(BounceError::ConnectionClosed(
                "connection is not open".into(),
            ));
        }
        let text = encode_packets(&packets)?;
        let (notice, delivery) = Delivery::pending();
        match self.tx.try_send(Outgoing { text, notice }) {
            Ok(()) => Ok(delivery),
            Err(TrySendError::Full(_)) => Err(BounceError::QueueFull(self.capacity)),
            Err(TrySendError::Closed(_)) => Err(BounceError::ConnectionClosed(
                "writer has stopped".into(),
            )),
        }
    }
}

/// Writes queued messages in order until `stop` fires or a write fails.
///
/// On stop the queue is closed and whatever it already holds is written
/// first. On a failed write the link is marked closed and every message
/// still queued fails its delivery.
async fn write_loop<C>(
    connection: Arc<C>,
    mut rx: mpsc::Receiver<Outgoing>,
    mut stop: watch::Receiver<bool>,
    link: Arc<LinkState>,
) -> Result<(), TransportError>
where
    C: Connection<Error = TransportError>,
{
    let result = 'writer: loop {
        tokio::select! {
            biased;
            outgoing = rx.recv() => match outgoing {
                Some(outgoing) => {
                    if let Err(e) = write(connection.as_ref(), outgoing).await {
                        break 'writer Err(e);
                    }
                }
                None => break 'writer Ok(()),
            },
            _ = stop.changed() => {
                rx.close();
                while let Some(outgoing) = rx.recv().await {
                    if let Err(e) = write(connection.as_ref(), outgoing).await {
                        break 'writer Err(e);
                    }
                }
                break 'writer Ok(());
            }
        }
    };

    if let Err(e) = &result {
        link.open.store(false, Ordering::Release);
        rx.close();
        let mut dropped = 0usize;
        while let Ok(outgoing) = rx.try_recv() {
            outgoing.notice.complete(Err(BounceError::ConnectionClosed(format!(
                "an earlier write failed: {e}"
            ))));
            dropped += 1;
        }
        tracing::warn!(id = %connection.id(), error = %e, dropped, "writer stopped");
    }
    result
}

async fn write<C>(connection: &C, outgoing: Outgoing) -> Result<(), TransportError>
where
    C: Connection<Error = TransportError>,
{
    match connection.send(&outgoing.text).await {
        Ok(()) => {
            outgoing.notice.complete(Ok(()));
            Ok(())
        }
        Err(e) => {
            outgoing
                .notice
                .complete(Err(BounceError::SendFailed(e.to_string().into())));
            Err(e)
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for an [`ArchlinkClient`].
///
/// Collaborators that are not supplied fall back to empty in-memory
/// versions: no roster, no names (every id renders as a placeholder),
/// identity team 0 slot 0, and an in-memory audit log.
///
/// # Example
///
/// ```rust,ignore
/// use archlink::prelude::*;
///
/// let client = ArchlinkClient::builder(ClientConfig::default().with_url(url))
///     .roster(roster)
///     .identity(identity)
///     .connect()
///     .await?;
/// client.enable_death_link().await?;
/// ```
pub struct ArchlinkClientBuilder {
    config: ClientConfig,
    roster: Option<Arc<dyn PlayerRoster>>,
    items: Option<Arc<dyn ItemNames>>,
    locations: Option<Arc<dyn LocationNames>>,
    identity: Option<Arc<dyn ActiveIdentity>>,
    audit: Option<Arc<dyn AuditLog>>,
}

impl ArchlinkClientBuilder {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            roster: None,
            items: None,
            locations: None,
            identity: None,
            audit: None,
        }
    }

    pub fn roster(mut self, roster: Arc<dyn PlayerRoster>) -> Self {
        self.roster = Some(roster);
        self
    }

    pub fn item_names(mut self, items: Arc<dyn ItemNames>) -> Self {
        self.items = Some(items);
        self
    }

    pub fn location_names(mut self, locations: Arc<dyn LocationNames>) -> Self {
        self.locations = Some(locations);
        self
    }

    pub fn identity(mut self, identity: Arc<dyn ActiveIdentity>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn audit_log(mut self, audit: Arc<dyn AuditLog>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Wires every feature, then connects to `config.url`.
    ///
    /// Features are subscribed before the connection opens, so no packet
    /// sent right after the handshake is missed.
    pub async fn connect(self) -> Result<ArchlinkClient, ArchlinkError> {
        let transport = WebSocketTransport::new(&self.config.transport)?;
        let capacity = self.config.send_queue_capacity;
        if capacity == 0 {
            return Err(TransportError::InvalidConfig(
                "send_queue_capacity must be greater than zero".into(),
            )
            .into());
        }

        let catalog = Arc::new(NameCatalog::new());
        let roster = self.roster.unwrap_or_else(|| Arc::new(Roster::new()));
        let items = self.items.unwrap_or_else(|| catalog.clone());
        let locations = self.locations.unwrap_or(catalog);
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(Identity::new(Team(0), Slot(0))));
        let audit = self
            .audit
            .unwrap_or_else(|| Arc::new(MemoryAuditLog::new()));

        let link = Arc::new(LinkState::new());
        let (tx, rx) = mpsc::channel(capacity);
        let outbound = Arc::new(Outbound {
            tx,
            capacity,
            link: Arc::clone(&link),
        });

        let dispatcher = Arc::new(PacketDispatcher::new());
        let bounce = Arc::new(BounceRegistry::new(outbound.clone()));
        dispatcher.subscribe(bounce.clone());

        let mut death_link =
            DeathLinkService::new(Arc::clone(&bounce), Arc::clone(&identity), audit);
        if let Some(scope) = &self.config.death_link_scope {
            death_link = death_link.with_scope(scope.clone());
        }
        let death_link = Arc::new(death_link);
        death_link.attach();

        let log = Arc::new(LogDecoder::new(PartResolver::new(
            roster, items, locations, identity,
        )));
        dispatcher.subscribe(log.clone());

        let handler = Arc::new(ClientHandler {
            dispatcher: Arc::clone(&dispatcher),
            link: Arc::clone(&link),
        });
        let connection = Arc::new(transport.connect(&self.config.url, handler).await?);
        tracing::info!(id = %connection.id(), url = %self.config.url, "connected to server");

        let (stop, stop_rx) = watch::channel(false);
        let writer = tokio::spawn(write_loop(
            Arc::clone(&connection),
            rx,
            stop_rx,
            Arc::clone(&link),
        ));

        Ok(ArchlinkClient {
            connection,
            writer: Mutex::new(Some(writer)),
            stop,
            outbound,
            link,
            dispatcher,
            bounce,
            death_link,
            log,
        })
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// A connected client.
///
/// Every `send_*` method encodes and queues synchronously, then waits until
/// the writer has put the message on the wire. A message that never gets
/// there fails with an error; nothing queued is dropped silently. Code
/// that cannot await, such as packet handlers, uses
/// [`queue_packets`](Self::queue_packets) instead.
///
/// Dropping the client stops the writer once the queue is drained.
pub struct ArchlinkClient {
    connection: Arc<WebSocketConnection>,
    writer: Mutex<Option<JoinHandle<Result<(), TransportError>>>>,
    stop: watch::Sender<bool>,
    outbound: Arc<Outbound>,
    link: Arc<LinkState>,
    dispatcher: Arc<PacketDispatcher>,
    bounce: Arc<BounceRegistry>,
    death_link: Arc<DeathLinkService>,
    log: Arc<LogDecoder>,
}

impl ArchlinkClient {
    pub fn builder(config: ClientConfig) -> ArchlinkClientBuilder {
        ArchlinkClientBuilder::new(config)
    }

    /// Connects with in-memory defaults for every collaborator.
    pub async fn connect(config: ClientConfig) -> Result<Self, ArchlinkError> {
        Self::builder(config).connect().await
    }

    pub fn id(&self) -> ConnectionId {
        self.connection.id()
    }

    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    // -- outgoing ---------------------------------------------------------

    /// Queues raw packets as one wire message without waiting.
    ///
    /// # Errors
    /// Fails at once if the connection is not open or the queue is full.
    /// Later write failures are reported through the returned [`Delivery`].
    pub fn queue_packets(&self, packets: Vec<Packet>) -> Result<Delivery, ArchlinkError> {
        Ok(self.outbound.send_packets(packets)?)
    }

    /// Sends raw packets as one wire message.
    pub async fn send_packets(&self, packets: Vec<Packet>) -> Result<(), ArchlinkError> {
        self.queue_packets(packets)?.wait().await?;
        Ok(())
    }

    /// Sends a chat message.
    pub async fn say(&self, text: impl Into<String>) -> Result<(), ArchlinkError> {
        self.send_packets(vec![Packet::Say(SayPacket { text: text.into() })])
            .await
    }

    /// Bounces `data` to every client advertising `tag`.
    pub async fn send_bounce(
        &self,
        tag: impl Into<String>,
        data: Map<String, Value>,
    ) -> Result<(), ArchlinkError> {
        self.bounce.send(tag, data)?.wait().await?;
        Ok(())
    }

    pub async fn send_death_link(&self, death_link: &DeathLink) -> Result<(), ArchlinkError> {
        Ok(self.death_link.send(death_link).await?)
    }

    /// Starts advertising the DeathLink tag. Returns `false` if it already
    /// was.
    pub async fn enable_death_link(&self) -> Result<bool, ArchlinkError> {
        Ok(self.death_link.enable().await?)
    }

    pub async fn disable_death_link(&self) -> Result<bool, ArchlinkError> {
        Ok(self.death_link.disable().await?)
    }

    // -- incoming ---------------------------------------------------------

    pub fn on_death_link(&self, handler: Arc<dyn DeathLinkHandler>) {
        self.death_link.on_death_link(handler);
    }

    pub fn on_log_message(&self, handler: Arc<dyn LogMessageHandler>) {
        self.log.on_log_message(handler);
    }

    /// Registers a handler for bounces carrying any of `tags`.
    pub fn on_bounce<I, S>(&self, tags: I, handler: Arc<dyn BounceHandler>) -> SubscriptionId
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bounce.register(tags, handler)
    }

    /// Sees every recognized incoming packet.
    pub fn subscribe(&self, listener: Arc<dyn PacketListener>) {
        self.dispatcher.subscribe(listener);
    }

    pub fn bounce(&self) -> &Arc<BounceRegistry> {
        &self.bounce
    }

    pub fn death_link(&self) -> &Arc<DeathLinkService> {
        &self.death_link
    }

    pub fn log_decoder(&self) -> &Arc<LogDecoder> {
        &self.log
    }

    // -- lifecycle --------------------------------------------------------

    /// Flushes queued messages, then closes the connection.
    ///
    /// New sends fail as soon as this is called. Calling it again is a
    /// no-op. If both the flush and the close fail, the two errors are
    /// returned together as [`TransportError::Aggregate`].
    pub async fn disconnect(&self) -> Result<(), ArchlinkError> {
        self.link.open.store(false, Ordering::Release);

        let Some(writer) = self.writer.lock().await.take() else {
            return Ok(());
        };

        let mut errors = Vec::new();
        self.stop.send_replace(true);
        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => errors.push(e),
            Err(e) => errors.push(TransportError::SendFailed(std::io::Error::other(e))),
        }

        if self.connection.state().is_open() {
            if let Err(e) = self.connection.close().await {
                errors.push(e);
            }
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0).into()),
            _ => Err(TransportError::Aggregate(errors).into()),
        }
    }

    /// Resolves once the connection has fully closed, whichever side
    /// started it.
    pub async fn closed(&self) {
        let mut rx = self.link.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A connection whose every write fails, as after a peer reset.
    struct ResetConnection;

    impl Connection for ResetConnection {
        type Error = TransportError;

        async fn send(&self, _message: &str) -> Result<(), TransportError> {
            Err(TransportError::SendFailed(std::io::Error::from(
                std::io::ErrorKind::ConnectionReset,
            )))
        }

        async fn close(&self) -> Result<(), TransportError> {
            Ok(())
        }

        fn state(&self) -> ConnectionState {
            ConnectionState::Open
        }

        fn id(&self) -> ConnectionId {
            ConnectionId::new(7)
        }
    }

    fn open_outbound(capacity: usize) -> (Outbound, mpsc::Receiver<Outgoing>) {
        let link = Arc::new(LinkState::new());
        link.open.store(true, Ordering::Release);
        let (tx, rx) = mpsc::channel(capacity);
        (Outbound { tx, capacity, link }, rx)
    }

    fn say(text: &str) -> Vec<Packet> {
        vec![Packet::Say(SayPacket { text: text.into() })]
    }

    #[tokio::test]
    async fn test_failed_write_fails_every_queued_message() {
        let (outbound, rx) = open_outbound(8);
        let deliveries: Vec<Delivery> = ["a", "b", "c"]
            .iter()
            .map(|text| outbound.send_packets(say(text)).unwrap())
            .collect();
        let (_stop, stop_rx) = watch::channel(false);

        let result = write_loop(
            Arc::new(ResetConnection),
            rx,
            stop_rx,
            Arc::clone(&outbound.link),
        )
        .await;

        assert!(matches!(result, Err(TransportError::SendFailed(_))));
        assert!(!outbound.link.is_open());
        let mut outcomes = Vec::new();
        for delivery in deliveries {
            outcomes.push(delivery.wait().await);
        }
        assert!(matches!(outcomes[0], Err(BounceError::SendFailed(_))));
        assert!(matches!(outcomes[1], Err(BounceError::ConnectionClosed(_))));
        assert!(matches!(outcomes[2], Err(BounceError::ConnectionClosed(_))));
        assert!(matches!(
            outbound.send_packets(say("d")),
            Err(BounceError::ConnectionClosed(_))
        ));
    }

    #[test]
    fn test_full_queue_refuses_instead_of_growing() {
        let (outbound, _rx) = open_outbound(2);
        outbound.send_packets(say("a")).unwrap();
        outbound.send_packets(say("b")).unwrap();

        assert!(matches!(
            outbound.send_packets(say("c")),
            Err(BounceError::QueueFull(2))
        ));
    }

    #[test]
    fn test_closed_link_refuses_before_queueing() {
        let (outbound, mut rx) = open_outbound(2);
        outbound.link.open.store(false, Ordering::Release);

        assert!(matches!(
            outbound.send_packets(say("a")),
            Err(BounceError::ConnectionClosed(_))
        ));
        assert!(rx.try_recv().is_err());
    }
}
