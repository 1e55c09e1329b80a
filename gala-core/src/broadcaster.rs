use std::{collections::HashMap, fmt::Display, sync::Arc};

use crossbeam::atomic::AtomicCell;
use log::{debug, info, warn};
use tokio::sync::mpsc::{
    self, error::TrySendError, Receiver, Sender, UnboundedReceiver, UnboundedSender,
};

use crate::Config;

static SUBSCRIBER_COUNTER: AtomicCell<u64> = AtomicCell::new(1);

/// Identifies a subscriber for as long as the process runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

impl SubscriberId {
    fn next() -> Self {
        Self(SUBSCRIBER_COUNTER.fetch_add(1))
    }
}

impl Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A committed journal delta, serialized once and shared by every subscriber.
#[derive(Debug, Clone)]
pub struct Message {
    pub sequence: i64,
    pub payload: Arc<str>,
}

enum Command {
    Register(SubscriberId, Sender<Message>),
    Unregister(SubscriberId),
    Broadcast(Message),
    Shutdown,
}

/// Handle to the fan-out loop.
///
/// The loop is the only owner of the subscriber registry. Handles talk to it through a
/// single command queue, so registrations, removals and broadcasts take effect in the
/// order they were issued.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    commands: UnboundedSender<Command>,
    queue_capacity: usize,
}

/// A registered subscriber's end of its outbound queue.
///
/// Unregisters itself when dropped.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: Receiver<Message>,
    commands: UnboundedSender<Command>,
}

impl Broadcaster {
    /// Starts the fan-out loop on the current tokio runtime.
    pub fn spawn(config: &Config) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();

        tokio::spawn(fan_out(receiver));

        Self {
            commands,
            queue_capacity: config.queue_capacity,
        }
    }

    /// Registers a new subscriber. Every message broadcast after this returns is delivered to it.
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId::next();
        let (sender, receiver) = mpsc::channel(self.queue_capacity);

        self.send(Command::Register(id, sender));

        Subscription {
            id,
            receiver,
            commands: self.commands.clone(),
        }
    }

    /// Removes a subscriber and closes its queue. Does nothing if it is already gone.
    pub fn unsubscribe(&self, id: SubscriberId) {
        self.send(Command::Unregister(id));
    }

    /// Queues a message for every subscriber, without waiting for any of them.
    pub fn broadcast(&self, message: Message) {
        self.send(Command::Broadcast(message));
    }

    /// Closes every subscriber queue and stops the loop.
    pub fn shutdown(&self) {
        self.send(Command::Shutdown);
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            debug!("Fan-out loop has stopped, command dropped");
        }
    }
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Waits for the next message. Returns [None] once the subscriber has been removed,
    /// either by unsubscribing, by being evicted for falling behind, or on shutdown.
    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Unregister(self.id));
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Register(id, _) => write!(f, "Register({id})"),
            Command::Unregister(id) => write!(f, "Unregister({id})"),
            Command::Broadcast(message) => write!(f, "Broadcast({})", message.sequence),
            Command::Shutdown => write!(f, "Shutdown"),
        }
    }
}

async fn fan_out(mut commands: UnboundedReceiver<Command>) {
    let mut subscribers: HashMap<SubscriberId, Sender<Message>> = HashMap::new();

    while let Some(command) = commands.recv().await {
        match command {
            Command::Register(id, sender) => {
                subscribers.insert(id, sender);
                debug!("Subscriber {id} registered ({} total)", subscribers.len());
            }
            Command::Unregister(id) => {
                if subscribers.remove(&id).is_some() {
                    debug!("Subscriber {id} unregistered ({} left)", subscribers.len());
                }
            }
            Command::Broadcast(message) => {
                subscribers.retain(|id, sender| match sender.try_send(message.clone()) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        warn!(
                            "Subscriber {id} fell behind at sequence {}, evicting it",
                            message.sequence
                        );
                        false
                    }
                    Err(TrySendError::Closed(_)) => false,
                });
            }
            Command::Shutdown => break,
        }
    }

    info!("Fan-out stopped, closing {} subscriber(s)", subscribers.len());
}
