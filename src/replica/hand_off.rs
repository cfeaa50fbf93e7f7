//! A rendezvous between RPC handler tasks and the driver loop.
//!
//! An offer only succeeds if the driver is polling the receiving side while the sender is still
//! waiting. Offers that the driver picks up after the sender gave up are discarded, so a hand-off
//! never delivers stale input.
use tokio::sync::{mpsc, oneshot};
use tokio::time::Duration;

pub(crate) fn channel<T>() -> (HandOffSender<T>, HandOffReceiver<T>) {
    // Capacity 1 is the smallest tokio allows. Acceptance is signalled separately, so a buffered
    // offer does not count as delivered.
    let (tx, rx) = mpsc::channel(1);

    (HandOffSender { tx }, HandOffReceiver { rx })
}

struct Offer<T> {
    value: T,
    accepted: oneshot::Sender<()>,
}

#[derive(Debug, thiserror::Error, Eq, PartialEq)]
pub(crate) enum HandOffError {
    #[error("Receiver did not accept within {0:?}")]
    NotAccepting(Duration),
    #[error("Receiver is gone")]
    Closed,
}

pub(crate) struct HandOffSender<T> {
    tx: mpsc::Sender<Offer<T>>,
}

impl<T> Clone for HandOffSender<T> {
    fn clone(&self) -> Self {
        HandOffSender { tx: self.tx.clone() }
    }
}

impl<T> HandOffSender<T> {
    /// Offer `value` and wait up to `wait` for the receiver to take it.
    pub(crate) async fn offer(&self, value: T, wait: Duration) -> Result<(), HandOffError> {
        let (accepted_tx, accepted_rx) = oneshot::channel();
        let attempt = async {
            self.tx
                .send(Offer {
                    value,
                    accepted: accepted_tx,
                })
                .await
                .map_err(|_| HandOffError::Closed)?;

            // The receiver drops the ack sender without answering only when it's shutting down.
            accepted_rx.await.map_err(|_| HandOffError::Closed)
        };

        match tokio::time::timeout(wait, attempt).await {
            Ok(result) => result,
            Err(_) => Err(HandOffError::NotAccepting(wait)),
        }
    }
}

pub(crate) struct HandOffReceiver<T> {
    rx: mpsc::Receiver<Offer<T>>,
}

impl<T> HandOffReceiver<T> {
    /// Wait for the next live offer. Returns `None` once every sender is dropped.
    ///
    /// Cancel safe: there is no await point between taking an offer and acknowledging it.
    pub(crate) async fn accept(&mut self) -> Option<T> {
        loop {
            let offer = self.rx.recv().await?;
            if offer.accepted.send(()).is_ok() {
                return Some(offer.value);
            }
            // Sender already gave up on this one.
        }
    }
}
