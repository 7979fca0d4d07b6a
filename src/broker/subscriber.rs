//! Subscribers and their dispatch loops.
//!
//! A [`Subscriber`] is built by a collaborator (a transport adapter, a test)
//! and handed to [`Broker::subscribe`](crate::broker::Broker::subscribe). On
//! registration it turns into two tasks and a [`Registration`] kept in the
//! topic bucket:
//!
//! ```text
//! broadcast ──► lane (unbounded) ──► fan-out task ──► inbox (capacity) ──► dispatch loop ──► sink.deliver()
//!                                                                              └─► failure → Termination
//! ```
//!
//! - The lane is pushed to while the broker holds its read lock, so every
//!   subscriber sees messages in broadcast order.
//! - The fan-out task is the only producer of the inbox. When the inbox is
//!   full it waits, which stalls delivery to this subscriber only.
//! - The dispatch loop calls the sink for one message at a time. The first
//!   failure emits a single [`Termination`] and ends the loop.
//! - The lane itself has no bound. [`InboxCapacity`] only limits the inbox, so
//!   a sink that stalls without ever failing lets the lane grow for as long
//!   as the topic keeps receiving broadcasts. Publishers never feel that
//!   pressure; the memory is released once the subscriber is removed.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, warn};
use uuid::Uuid;

use crate::broker::message::Message;
use crate::utils::error::DeliveryError;

pub type SubscriberId = String;

/// Delivery capability supplied by whoever owns the subscriber.
///
/// Returning an error tells the broker that this destination is gone; the
/// subscriber is removed and never called again.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<F, Fut> Sink for F
where
    F: Fn(Arc<Message>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), DeliveryError>> + Send + 'static,
{
    async fn deliver(&self, message: Arc<Message>) -> Result<(), DeliveryError> {
        (self)(message).await
    }
}

/// How many messages may wait in a subscriber's inbox before the fan-out
/// task delivering to it has to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InboxCapacity {
    /// Hand over one message at a time (a single slot in Tokio terms).
    #[default]
    Rendezvous,
    Bounded(usize),
    Unbounded,
}

impl InboxCapacity {
    /// Maps a configured depth to a capacity; `0` means rendezvous.
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 => InboxCapacity::Rendezvous,
            n => InboxCapacity::Bounded(n),
        }
    }
}

/// Identity of a registered subscriber: what `unsubscribe` needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subscription {
    id: SubscriberId,
    topic: String,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Emitted once by a dispatch loop whose sink failed.
#[derive(Debug, Clone)]
pub struct Termination {
    pub subscription: Subscription,
    pub reason: DeliveryError,
}

/// A consumer bound to exactly one topic.
pub struct Subscriber {
    id: SubscriberId,
    topic: String,
    capacity: InboxCapacity,
    sink: Arc<dyn Sink>,
    span: Option<Span>,
}

impl std::fmt::Debug for Subscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("id", &self.id)
            .field("topic", &self.topic)
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Subscriber {
    /// Creates a subscriber for `topic` with a rendezvous inbox.
    pub fn new(topic: impl Into<String>, sink: impl Sink + 'static) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            topic: topic.into(),
            capacity: InboxCapacity::default(),
            sink: Arc::new(sink),
            span: None,
        }
    }

    pub fn with_capacity(mut self, capacity: InboxCapacity) -> Self {
        self.capacity = capacity;
        self
    }

    /// Runs the dispatch loop inside `span` instead of the default
    /// `subscriber` span.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn capacity(&self) -> InboxCapacity {
        self.capacity
    }

    pub fn subscription(&self) -> Subscription {
        Subscription {
            id: self.id.clone(),
            topic: self.topic.clone(),
        }
    }

    /// Spawns the fan-out task and the dispatch loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub(crate) fn start(
        self,
        terminations: mpsc::UnboundedSender<Termination>,
        shutdown: watch::Receiver<bool>,
    ) -> Registration {
        let subscription = self.subscription();
        let span = self.span.unwrap_or_else(|| {
            tracing::debug_span!("subscriber", id = %self.id, topic = %self.topic)
        });

        let (lane, mut lane_rx) = mpsc::unbounded_channel::<Arc<Message>>();
        let (inbox_tx, inbox_rx) = inbox(self.capacity);

        tokio::spawn(
            async move {
                while let Some(message) = lane_rx.recv().await {
                    if inbox_tx.push(message).await.is_err() {
                        debug!("inbox closed, dropping queued messages");
                        break;
                    }
                }
            }
            .instrument(span.clone()),
        );

        let dispatch = tokio::spawn(
            dispatch_loop(self.sink, inbox_rx, subscription, terminations, shutdown)
                .instrument(span),
        );

        Registration {
            id: self.id,
            lane,
            dispatch,
        }
    }
}

async fn dispatch_loop(
    sink: Arc<dyn Sink>,
    mut inbox: InboxReceiver,
    subscription: Subscription,
    terminations: mpsc::UnboundedSender<Termination>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let message = tokio::select! {
            _ = shutdown.wait_for(|stopping| *stopping) => break,
            next = inbox.recv() => match next {
                Some(message) => message,
                None => break,
            },
        };

        let outcome = tokio::select! {
            _ = shutdown.wait_for(|stopping| *stopping) => break,
            outcome = sink.deliver(Arc::clone(&message)) => outcome,
        };

        if let Err(reason) = outcome {
            warn!(message_id = %message.id(), error = %reason, "delivery failed, leaving topic");
            let _ = terminations.send(Termination {
                subscription,
                reason,
            });
            return;
        }
    }
    debug!("dispatch loop stopped");
}

/// Broker-side half of a running subscriber.
///
/// Dropping it closes the lane: messages already queued are still
/// delivered, after which both tasks end.
#[derive(Debug)]
pub(crate) struct Registration {
    pub(crate) id: SubscriberId,
    pub(crate) lane: mpsc::UnboundedSender<Arc<Message>>,
    pub(crate) dispatch: JoinHandle<()>,
}

impl Registration {
    /// Hands `message` to the fan-out task. Never waits.
    pub(crate) fn enqueue(&self, message: Arc<Message>) -> bool {
        self.lane.send(message).is_ok()
    }
}

enum InboxSender {
    Bounded(mpsc::Sender<Arc<Message>>),
    Unbounded(mpsc::UnboundedSender<Arc<Message>>),
}

enum InboxReceiver {
    Bounded(mpsc::Receiver<Arc<Message>>),
    Unbounded(mpsc::UnboundedReceiver<Arc<Message>>),
}

fn inbox(capacity: InboxCapacity) -> (InboxSender, InboxReceiver) {
    match capacity {
        InboxCapacity::Rendezvous => bounded(1),
        InboxCapacity::Bounded(depth) => bounded(depth.max(1)),
        InboxCapacity::Unbounded => {
            let (tx, rx) = mpsc::unbounded_channel();
            (InboxSender::Unbounded(tx), InboxReceiver::Unbounded(rx))
        }
    }
}

fn bounded(depth: usize) -> (InboxSender, InboxReceiver) {
    let (tx, rx) = mpsc::channel(depth);
    (InboxSender::Bounded(tx), InboxReceiver::Bounded(rx))
}

impl InboxSender {
    async fn push(&self, message: Arc<Message>) -> Result<(), Arc<Message>> {
        match self {
            InboxSender::Bounded(tx) => tx.send(message).await.map_err(|e| e.0),
            InboxSender::Unbounded(tx) => tx.send(message).map_err(|e| e.0),
        }
    }
}

impl InboxReceiver {
    async fn recv(&mut self) -> Option<Arc<Message>> {
        match self {
            InboxReceiver::Bounded(rx) => rx.recv().await,
            InboxReceiver::Unbounded(rx) => rx.recv().await,
        }
    }
}
