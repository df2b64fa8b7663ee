//! Write confirmation for queued packets.
//!
//! A [`PacketSender`](crate::PacketSender) usually queues packets and
//! writes them later. The [`Delivery`] it hands back resolves once the
//! writer has put the message on the wire, or with an error if the message
//! never got there. A message dropped from the queue (the writer stopped,
//! the connection died) resolves as [`BounceError::ConnectionClosed`].

use tokio::sync::oneshot;

use crate::BounceError;

/// Resolves when a queued message has been written.
#[derive(Debug)]
pub struct Delivery {
    receipt: Option<oneshot::Receiver<Result<(), BounceError>>>,
}

/// Writer-side half of a [`Delivery`].
///
/// Dropping it without calling [`complete`](Self::complete) fails the
/// matching `Delivery`.
#[derive(Debug)]
pub struct DeliveryNotice(oneshot::Sender<Result<(), BounceError>>);

impl Delivery {
    /// A delivery still waiting on its writer.
    pub fn pending() -> (DeliveryNotice, Self) {
        let (tx, rx) = oneshot::channel();
        (DeliveryNotice(tx), Self { receipt: Some(rx) })
    }

    /// A delivery for a message that was written synchronously.
    pub fn written() -> Self {
        Self { receipt: None }
    }

    /// Waits for the writer's verdict.
    pub async fn wait(self) -> Result<(), BounceError> {
        match self.receipt {
            None => Ok(()),
            Some(rx) => rx.await.unwrap_or_else(|_| {
                Err(BounceError::ConnectionClosed(
                    "message dropped before it was written".into(),
                ))
            }),
        }
    }
}

impl DeliveryNotice {
    /// Reports the write outcome. A waiter that has gone away is ignored.
    pub fn complete(self, result: Result<(), BounceError>) {
        let _ = self.0.send(result);
    }
}
