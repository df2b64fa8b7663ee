//! DeathLink: "when one player dies, everyone linked dies".
//!
//! DeathLink is a bounce convention. Clients that opt in advertise the
//! `DeathLink` tag and exchange payloads shaped like
//!
//! ```json
//! {"time": 1700000000.123, "source": "Link", "cause": "fell in a pit"}
//! ```
//!
//! `time` is fractional seconds since the Unix epoch, `cause` is optional.
//! Incoming payloads that do not fit this shape are dropped, but every
//! payload, good or bad, is written to an [`AuditLog`] so cross-client
//! traffic can be diagnosed afterwards.

use std::sync::{Arc, Mutex, PoisonError, RwLock};

use archlink_protocol::{
    ActiveIdentity, AuditLog, ConnectUpdatePacket, Packet,
};
use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};

use crate::{
    BounceError, BounceEvent, BounceHandler, BounceRegistry, Delivery, SubscriptionId,
};

/// The bounce tag DeathLink clients advertise.
pub const DEATH_LINK_TAG: &str = "DeathLink";

/// Audit key shared by every scope for payloads that failed to parse.
pub const FAILED_LOG_KEY: &str = "deathlink/failed";

/// Why a bounced payload is not a valid DeathLink.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeathLinkParseError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("field `{field}` should be {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    #[error("time {0} is out of range")]
    TimeOutOfRange(f64),
}

/// One player's death, as shared over DeathLink.
///
/// Timestamps are kept at millisecond precision, which is what survives a
/// trip through the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeathLink {
    timestamp: DateTime<Utc>,
    source: String,
    cause: Option<String>,
}

impl DeathLink {
    /// A death happening now.
    pub fn new(source: impl Into<String>, cause: Option<String>) -> Self {
        Self::at(Utc::now(), source, cause)
    }

    /// A death at `timestamp`, truncated to milliseconds.
    pub fn at(
        timestamp: DateTime<Utc>,
        source: impl Into<String>,
        cause: Option<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(3),
            source: source.into(),
            cause,
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Name of the player who died.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    /// Parses a bounced payload.
    ///
    /// `time` must be a number and `source` a string. `cause` is kept only
    /// when it is a string; any other value counts as absent.
    pub fn from_bounce_data(
        data: &Map<String, Value>,
    ) -> Result<Self, DeathLinkParseError> {
        let time = match data.get("time") {
            None | Some(Value::Null) => {
                return Err(DeathLinkParseError::MissingField("time"));
            }
            Some(value) => value.as_f64().ok_or(DeathLinkParseError::InvalidField {
                field: "time",
                expected: "a number",
            })?,
        };
        let source = match data.get("source") {
            None | Some(Value::Null) => {
                return Err(DeathLinkParseError::MissingField("source"));
            }
            Some(value) => value.as_str().ok_or(DeathLinkParseError::InvalidField {
                field: "source",
                expected: "a string",
            })?,
        };
        let cause = data.get("cause").and_then(Value::as_str).map(str::to_owned);

        let millis = (time * 1000.0).round();
        if !millis.is_finite() || millis.abs() > i64::MAX as f64 {
            return Err(DeathLinkParseError::TimeOutOfRange(time));
        }
        let timestamp = DateTime::from_timestamp_millis(millis as i64)
            .ok_or(DeathLinkParseError::TimeOutOfRange(time))?;

        Ok(Self {
            timestamp,
            source: source.to_owned(),
            cause,
        })
    }

    /// Formats the payload for an outgoing bounce.
    pub fn to_bounce_data(&self) -> Map<String, Value> {
        let mut data = Map::new();
        let seconds = self.timestamp.timestamp_millis() as f64 / 1000.0;
        data.insert("time".into(), Value::from(seconds));
        data.insert("source".into(), Value::from(self.source.clone()));
        if let Some(cause) = &self.cause {
            data.insert("cause".into(), Value::from(cause.clone()));
        }
        data
    }
}

/// Receives valid incoming DeathLinks.
pub trait DeathLinkHandler: Send + Sync {
    fn on_death_link(&self, death_link: &DeathLink);
}

impl<F> DeathLinkHandler for F
where
    F: Fn(&DeathLink) + Send + Sync,
{
    fn on_death_link(&self, death_link: &DeathLink) {
        self(death_link)
    }
}

/// The DeathLink feature: tag management, sending, and receiving.
///
/// Create it with [`new`](Self::new), then [`attach`](Self::attach) it to
/// the bounce registry so it sees incoming `DeathLink` bounces.
pub struct DeathLinkService {
    registry: Arc<BounceRegistry>,
    identity: Arc<dyn ActiveIdentity>,
    audit: Arc<dyn AuditLog>,
    scope: String,
    handlers: RwLock<Vec<Arc<dyn DeathLinkHandler>>>,
    tags_lock: Mutex<()>,
}

impl DeathLinkService {
    /// Creates the service. Audit entries are scoped to
    /// `team-{team}/slot-{slot}` of `identity`.
    pub fn new(
        registry: Arc<BounceRegistry>,
        identity: Arc<dyn ActiveIdentity>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        let scope = format!("team-{}/slot-{}", identity.team(), identity.slot());
        Self {
            registry,
            identity,
            audit,
            scope,
            handlers: RwLock::new(Vec::new()),
            tags_lock: Mutex::new(()),
        }
    }

    /// Overrides the audit scope.
    pub fn with_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = scope.into();
        self
    }

    /// Subscribes the service to `DeathLink` bounces.
    pub fn attach(self: &Arc<Self>) -> SubscriptionId {
        let handler: Arc<dyn BounceHandler> = Arc::clone(self) as Arc<dyn BounceHandler>;
        self.registry.register([DEATH_LINK_TAG], handler)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Audit key for incoming payloads in this scope.
    pub fn received_log_key(&self) -> String {
        format!("{}/deathlink/received", self.scope)
    }

    /// Audit key for outgoing payloads in this scope.
    pub fn send_log_key(&self) -> String {
        format!("{}/deathlink/send", self.scope)
    }

    /// Registers a consumer of incoming DeathLinks.
    pub fn on_death_link(&self, handler: Arc<dyn DeathLinkHandler>) {
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(handler);
    }

    /// Makes sure this client advertises the DeathLink tag.
    ///
    /// The tag is appended only when absent; an existing tag is never
    /// duplicated and no other tag is touched. Returns `true` if the tag
    /// list changed, in which case the server is told via `ConnectUpdate`
    /// and this waits until that update was written.
    pub async fn enable(&self) -> Result<bool, BounceError> {
        let delivery = {
            let _tags = self.tags_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let mut tags = self.identity.tags();
            if tags.iter().any(|t| t == DEATH_LINK_TAG) {
                return Ok(false);
            }
            tags.push(DEATH_LINK_TAG.to_owned());
            self.update_tags(tags)?
        };
        delivery.wait().await?;
        tracing::info!(scope = %self.scope, "DeathLink enabled");
        Ok(true)
    }

    /// Stops advertising the DeathLink tag. Returns `true` if it was present.
    pub async fn disable(&self) -> Result<bool, BounceError> {
        let delivery = {
            let _tags = self.tags_lock.lock().unwrap_or_else(PoisonError::into_inner);
            let tags = self.identity.tags();
            if !tags.iter().any(|t| t == DEATH_LINK_TAG) {
                return Ok(false);
            }
            let tags = tags.into_iter().filter(|t| t != DEATH_LINK_TAG).collect();
            self.update_tags(tags)?
        };
        delivery.wait().await?;
        tracing::info!(scope = %self.scope, "DeathLink disabled");
        Ok(true)
    }

    /// Returns `true` if the identity currently advertises the tag.
    pub fn is_enabled(&self) -> bool {
        self.identity.tags().iter().any(|t| t == DEATH_LINK_TAG)
    }

    // Caller holds `tags_lock`, so the queued update and the stored list
    // change in the same order.
    fn update_tags(&self, tags: Vec<String>) -> Result<Delivery, BounceError> {
        let delivery = self
            .registry
            .send_packet(Packet::ConnectUpdate(ConnectUpdatePacket {
                tags: tags.clone(),
                items_handling: None,
            }))?;
        self.identity.set_tags(tags);
        Ok(delivery)
    }

    /// Broadcasts a death to every linked client.
    ///
    /// The payload is written to the send log once the message is on the
    /// wire; a message that never got there is not logged.
    pub async fn send(&self, death_link: &DeathLink) -> Result<(), BounceError> {
        let data = death_link.to_bounce_data();
        let entry = Value::Object(data.clone()).to_string();
        self.registry.send(DEATH_LINK_TAG, data)?.wait().await?;
        self.audit.append(&self.send_log_key(), &[entry]);
        tracing::debug!(scope = %self.scope, source = death_link.source(), "DeathLink sent");
        Ok(())
    }

    fn receive(&self, event: &BounceEvent) {
        let payload = Value::Object(event.data.clone()).to_string();

        match DeathLink::from_bounce_data(&event.data) {
            Ok(death_link) => {
                self.audit
                    .append(&self.received_log_key(), &[format!("ok {payload}")]);
                let handlers = self
                    .handlers
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone();
                for handler in &handlers {
                    handler.on_death_link(&death_link);
                }
            }
            Err(e) => {
                tracing::warn!(scope = %self.scope, error = %e, %payload, "dropping malformed DeathLink");
                self.audit.append(
                    &self.received_log_key(),
                    &[format!("failed {payload}: {e}")],
                );
                self.audit.append(
                    FAILED_LOG_KEY,
                    &[format!("{} {payload}: {e}", self.scope)],
                );
            }
        }
    }
}

impl BounceHandler for DeathLinkService {
    fn on_bounce(&self, event: &BounceEvent) {
        self.receive(event);
    }
}
