//! Event fan-out
//!
//! Every subscriber owns an unbounded queue, so a slow consumer never stalls
//! the accept loop or a connection relay. Subscribers whose receiver was
//! dropped are pruned on the next emit.

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::config::ChannelConfig;
use crate::events::{SignalEvent, SignalEvents};

/// Fans events out to all subscribers of one channel
pub(crate) struct EventEmitter {
    subscribers: Mutex<Subscribers>,
    /// Transport label used in diagnostic output
    transport: &'static str,
    debug: bool,
}

struct Subscribers {
    senders: Vec<mpsc::UnboundedSender<SignalEvent>>,
    /// Set once `Closed` went out; later subscribers get an ended stream
    finished: bool,
}

impl EventEmitter {
    pub(crate) fn new(transport: &'static str, config: ChannelConfig) -> Self {
        Self {
            subscribers: Mutex::new(Subscribers {
                senders: Vec::new(),
                finished: false,
            }),
            transport,
            debug: config.debug,
        }
    }

    /// Add a subscriber that sees every event emitted from now on
    pub(crate) fn subscribe(&self) -> SignalEvents {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut subscribers = self.subscribers.lock();
        if !subscribers.finished {
            subscribers.senders.push(tx);
        }
        SignalEvents::new(rx)
    }

    /// Deliver an event to every live subscriber
    ///
    /// Emitting `Closed` disconnects all subscribers afterwards.
    pub(crate) fn emit(&self, event: SignalEvent) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.finished {
            tracing::debug!(event = event.name(), "Dropping event emitted after close");
            return;
        }

        if self.debug {
            tracing::info!(
                target: "signal_core::events",
                transport = self.transport,
                "{event}"
            );
        }

        let terminal = event.is_terminal();
        subscribers
            .senders
            .retain(|tx| tx.send(event.clone()).is_ok());

        if terminal {
            subscribers.senders.clear();
            subscribers.finished = true;
        }
    }

    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers.lock().senders.len()
    }
}
