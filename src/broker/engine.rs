//! Broker engine
//!
//! This module contains the in-memory broker responsible for:
//! - managing the topic → subscriber registry
//! - fanning out published messages to the current subscribers of a topic
//! - removing subscribers whose sink failed, via a supervisor task
//!
//! Concurrency and usage notes:
//! - `Broker` is cheap to clone; every clone talks to the same registry.
//! - The registry sits behind a single `RwLock`. `subscribe` and
//!   `unsubscribe` take it exclusively; `broadcast` takes it shared and only
//!   hands messages to per-subscriber lanes, which never blocks.
//! - A broadcast is delivered to exactly the subscribers present when its
//!   read lock was taken. A subscriber removed afterwards still receives what
//!   was already handed to it, and nothing later.
//! - `Broker::new` spawns the supervisor task and therefore must be called
//!   from within a Tokio runtime.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tokio::sync::{Mutex, RwLock, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, info, warn};

use crate::broker::message::Message;
use crate::broker::subscriber::{Registration, Subscriber, Subscription, Termination};
use crate::broker::topic::Topic;
use crate::utils::error::BrokerError;

#[derive(Clone)]
pub struct Broker {
    shared: Arc<Shared>,
}

struct Shared {
    topics: RwLock<HashMap<String, Topic>>,
    terminations: mpsc::UnboundedSender<Termination>,
    shutdown: watch::Sender<bool>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    span: Span,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker").finish_non_exhaustive()
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker {
    pub fn new() -> Self {
        Self::with_span(tracing::info_span!("broker"))
    }

    /// Creates a broker whose tracing and supervisor run inside `span`.
    pub fn with_span(span: Span) -> Self {
        let (terminations, termination_rx) = mpsc::unbounded_channel();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let shared = Arc::new_cyclic(|weak| {
            let handle = tokio::spawn(
                supervise(weak.clone(), termination_rx, shutdown_rx).instrument(span.clone()),
            );
            Shared {
                topics: RwLock::new(HashMap::new()),
                terminations,
                shutdown,
                supervisor: Mutex::new(Some(handle)),
                span,
            }
        });

        Self { shared }
    }

    /// Registers `subscriber` under its topic and starts its dispatch loop.
    ///
    /// The topic is created if it does not exist yet. Once this returns, a
    /// failing sink is guaranteed to lead to the subscriber's removal.
    pub async fn subscribe(&self, subscriber: Subscriber) -> Result<Subscription, BrokerError> {
        if subscriber.topic().trim().is_empty() {
            return Err(BrokerError::InvalidSubscriber);
        }

        let mut topics = self.shared.topics.write().await;
        let shutdown = self.shared.shutdown.subscribe();
        if *shutdown.borrow() {
            return Err(BrokerError::ShuttingDown);
        }

        let subscription = subscriber.subscription();
        info!(
            parent: &self.shared.span,
            topic = %subscription.topic(),
            subscriber = %subscription.id(),
            "adding subscriber to topic"
        );

        let registration = subscriber.start(self.shared.terminations.clone(), shutdown);
        topics
            .entry(subscription.topic().to_string())
            .or_insert_with(|| Topic::new(subscription.topic()))
            .subscribe(registration);

        Ok(subscription)
    }

    /// Publishes `data` to every current subscriber of `topic`.
    ///
    /// Returns once the message has been handed to each subscriber; it does
    /// not wait for any sink. A known topic without subscribers is not an
    /// error.
    pub async fn broadcast(&self, data: impl Into<Vec<u8>>, topic: &str) -> Result<(), BrokerError> {
        let topics = self.shared.topics.read().await;
        let Some(bucket) = topics.get(topic) else {
            return Err(BrokerError::TopicNotFound(topic.to_string()));
        };

        let message = Arc::new(Message::new(data));
        debug!(
            parent: &self.shared.span,
            topic,
            message_id = %message.id(),
            recipients = bucket.len(),
            "broadcasting message"
        );

        for member in bucket.members() {
            if !member.enqueue(Arc::clone(&message)) {
                debug!(
                    parent: &self.shared.span,
                    topic,
                    subscriber = %member.id,
                    "subscriber already terminated, message dropped"
                );
            }
        }

        Ok(())
    }

    /// Removes the subscriber identified by `subscription` from its topic.
    ///
    /// Removing a subscriber that is no longer a member of a known topic is
    /// a no-op.
    pub async fn unsubscribe(&self, subscription: &Subscription) -> Result<(), BrokerError> {
        unsubscribe(&self.shared, subscription).await
    }

    /// Number of subscribers currently registered under `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> usize {
        self.shared
            .topics
            .read()
            .await
            .get(topic)
            .map_or(0, Topic::len)
    }

    /// Names of every topic known to the broker, including empty ones.
    pub async fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.topics.read().await.keys().cloned().collect();
        names.sort();
        names
    }

    /// Stops every dispatch loop and the supervisor, then clears the registry.
    ///
    /// Messages still waiting in inboxes are dropped. Later calls to
    /// `subscribe` fail with [`BrokerError::ShuttingDown`].
    pub async fn shutdown(&self) {
        self.shared.shutdown.send_replace(true);

        let drained: Vec<Registration> = {
            let mut topics = self.shared.topics.write().await;
            topics
                .drain()
                .flat_map(|(_, topic)| topic.into_members())
                .collect()
        };

        info!(
            parent: &self.shared.span,
            subscribers = drained.len(),
            "shutting down broker"
        );

        for registration in drained {
            let Registration { id, lane, dispatch } = registration;
            drop(lane);
            if let Err(e) = dispatch.await {
                warn!(parent: &self.shared.span, subscriber = %id, error = %e, "dispatch loop ended abnormally");
            }
        }

        if let Some(handle) = self.shared.supervisor.lock().await.take() {
            if let Err(e) = handle.await {
                warn!(parent: &self.shared.span, error = %e, "supervisor ended abnormally");
            }
        }
    }
}

async fn unsubscribe(shared: &Shared, subscription: &Subscription) -> Result<(), BrokerError> {
    let mut topics = shared.topics.write().await;
    let Some(topic) = topics.get_mut(subscription.topic()) else {
        return Err(BrokerError::TopicNotFound(subscription.topic().to_string()));
    };

    if topic.unsubscribe(subscription.id()).is_some() {
        info!(
            parent: &shared.span,
            topic = %topic.name,
            subscriber = %subscription.id(),
            "removed subscriber from topic"
        );
    }
    Ok(())
}

/// Removes subscribers whose dispatch loop reported a delivery failure.
///
/// Holds only a weak reference so that dropping every `Broker` handle lets
/// the registry go away.
async fn supervise(
    shared: Weak<Shared>,
    mut terminations: mpsc::UnboundedReceiver<Termination>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let termination = tokio::select! {
            _ = shutdown.wait_for(|stopping| *stopping) => break,
            next = terminations.recv() => match next {
                Some(termination) => termination,
                None => break,
            },
        };

        let Some(shared) = shared.upgrade() else {
            break;
        };

        info!(
            topic = %termination.subscription.topic(),
            subscriber = %termination.subscription.id(),
            reason = %termination.reason,
            "removing subscriber after delivery failure"
        );
        if let Err(e) = unsubscribe(&shared, &termination.subscription).await {
            warn!(error = %e, "error unsubscribing from topic");
        }
    }
    debug!("supervisor stopped");
}
