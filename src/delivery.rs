//! Hand-off of decoded events from the HTTP edge to the application.
//!
//! Every request handler publishes into one shared channel; the application
//! owns the single [`EventStream`] on the other end. Publishing is the only
//! point where request handling may wait on the consumer:
//!
//! ```text
//! request ──┐
//! request ──┼──► EventPublisher ──► [ channel ] ──► EventStream ──► consumer
//! request ──┘        (clone per handler)
//! ```
//!
//! Whether a full channel makes the request wait or fail, and for how long a
//! wait may last, is set by [`DeliveryConfig`].

use std::num::NonZeroUsize;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

use crate::webhooks::Event;

/// Default capacity of the bounded channel.
pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// What a publish does when a bounded channel is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Overflow {
    /// Wait until the consumer makes room (back-pressure onto the sender).
    #[default]
    Block,
    /// Fail immediately; the request is answered with 503 so GitHub retries.
    Reject,
}

/// Channel configuration, chosen by whoever builds the endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// Bounded capacity, or `None` for an unbounded channel.
    pub capacity: Option<NonZeroUsize>,

    /// Behaviour of a publish into a full bounded channel.
    pub overflow: Overflow,

    /// Longest a blocked publish may wait. `None` waits indefinitely.
    ///
    /// Only [`Overflow::Block`] waits, so this is unused under
    /// [`Overflow::Reject`].
    pub publish_timeout: Option<Duration>,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        DeliveryConfig {
            capacity: Some(DEFAULT_CAPACITY),
            overflow: Overflow::Block,
            publish_timeout: None,
        }
    }
}

impl DeliveryConfig {
    /// An unbounded channel: publishing never waits.
    pub fn unbounded() -> Self {
        DeliveryConfig {
            capacity: None,
            ..Self::default()
        }
    }

    /// A bounded channel with the given capacity.
    pub fn bounded(capacity: NonZeroUsize) -> Self {
        DeliveryConfig {
            capacity: Some(capacity),
            ..Self::default()
        }
    }

    pub fn with_overflow(mut self, overflow: Overflow) -> Self {
        self.overflow = overflow;
        self
    }

    pub fn with_publish_timeout(mut self, timeout: Duration) -> Self {
        self.publish_timeout = Some(timeout);
        self
    }
}

/// Errors that can occur when publishing an event.
///
/// In every case the event is dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PublishError {
    /// The channel was full and the overflow policy is [`Overflow::Reject`].
    #[error("delivery channel is full")]
    Full,

    /// The channel stayed full for longer than the publish timeout.
    #[error("timed out after {0:?} waiting for the consumer")]
    TimedOut(Duration),

    /// The [`EventStream`] was dropped or closed.
    #[error("delivery channel closed: no consumer")]
    Closed,
}

#[derive(Debug, Clone)]
enum Tx {
    Bounded(mpsc::Sender<Event>),
    Unbounded(mpsc::UnboundedSender<Event>),
}

#[derive(Debug)]
enum Rx {
    Bounded(mpsc::Receiver<Event>),
    Unbounded(mpsc::UnboundedReceiver<Event>),
}

/// Sending half of the delivery channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EventPublisher {
    tx: Tx,
    overflow: Overflow,
    publish_timeout: Option<Duration>,
}

/// Receiving half of the delivery channel, owned by the application.
#[derive(Debug)]
pub struct EventStream {
    rx: Rx,
}

/// Creates the delivery channel.
pub fn event_channel(config: &DeliveryConfig) -> (EventPublisher, EventStream) {
    let (tx, rx) = match config.capacity {
        Some(capacity) => {
            let (tx, rx) = mpsc::channel(capacity.get());
            (Tx::Bounded(tx), Rx::Bounded(rx))
        }
        None => {
            let (tx, rx) = mpsc::unbounded_channel();
            (Tx::Unbounded(tx), Rx::Unbounded(rx))
        }
    };

    let publisher = EventPublisher {
        tx,
        overflow: config.overflow,
        publish_timeout: config.publish_timeout,
    };

    (publisher, EventStream { rx })
}

impl EventPublisher {
    /// Publishes an event, applying the configured overflow policy.
    ///
    /// Dropping the returned future abandons the publish without affecting
    /// the receiver.
    pub async fn publish(&self, event: Event) -> Result<(), PublishError> {
        let tx = match &self.tx {
            Tx::Unbounded(tx) => return tx.send(event).map_err(|_| PublishError::Closed),
            Tx::Bounded(tx) => tx,
        };

        match self.overflow {
            Overflow::Reject => tx.try_send(event).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => PublishError::Full,
                mpsc::error::TrySendError::Closed(_) => PublishError::Closed,
            }),
            Overflow::Block => {
                if tx.capacity() == 0 {
                    trace!("delivery channel full, waiting for consumer");
                }
                match self.publish_timeout {
                    Some(limit) => tokio::time::timeout(limit, tx.send(event))
                        .await
                        .map_err(|_| PublishError::TimedOut(limit))?
                        .map_err(|_| PublishError::Closed),
                    None => tx.send(event).await.map_err(|_| PublishError::Closed),
                }
            }
        }
    }

    /// Returns true once the [`EventStream`] has gone away.
    pub fn is_closed(&self) -> bool {
        match &self.tx {
            Tx::Bounded(tx) => tx.is_closed(),
            Tx::Unbounded(tx) => tx.is_closed(),
        }
    }
}

impl EventStream {
    /// Receives the next event.
    ///
    /// Returns `None` once the channel is closed and drained, which happens
    /// after every [`EventPublisher`] (including the ones held by the router)
    /// has been dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        match &mut self.rx {
            Rx::Bounded(rx) => rx.recv().await,
            Rx::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Receives an event if one is ready, without waiting.
    pub fn try_recv(&mut self) -> Option<Event> {
        match &mut self.rx {
            Rx::Bounded(rx) => rx.try_recv().ok(),
            Rx::Unbounded(rx) => rx.try_recv().ok(),
        }
    }

    /// Stops accepting new events. Already queued events can still be read.
    pub fn close(&mut self) {
        match &mut self.rx {
            Rx::Bounded(rx) => rx.close(),
            Rx::Unbounded(rx) => rx.close(),
        }
    }
}
