//! Listener Lifecycle
//!
//! State machine and accept loop shared by both transports. A transport only
//! supplies the future that binds its listener; everything from readiness to
//! the final `Closed` event happens here.
//!
//! ```text
//!            bind ok              close() / listener failure
//! Binding ───────────► Listening ───────────────────────────► Closed
//!    │                                                          ▲
//!    └──────────── bind error / close() before bind ────────────┘
//! ```
//!
//! Shutdown order: release the listener (inside `close()` itself, so the OS
//! refuses connections as soon as it returns), stop every relay (each emits
//! `ConnectionClosed`), emit `Closed`.

use std::future::{poll_fn, Future};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::io::AsyncRead;
use tokio::sync::watch;
use tokio::task::JoinSet;

use super::emitter::EventEmitter;
use super::relay::relay_connection;
use super::traits::ChannelState;
use crate::address::SignalAddress;
use crate::config::ChannelConfig;
use crate::error::SignalError;
use crate::events::{ConnectionId, SignalEvent, SignalEvents};

/// A bound listener the accept loop can drive
pub(crate) trait Acceptor: Send + 'static {
    /// Stream type of accepted connections
    type Stream: AsyncRead + Unpin + Send + 'static;

    /// Poll for the next inbound connection
    fn poll_accept(&self, cx: &mut Context<'_>) -> Poll<io::Result<Self::Stream>>;

    /// Release the listener and anything it owns on disk
    fn release(self)
    where
        Self: Sized,
    {
    }
}

/// Slot holding the bound listener until it is released
///
/// The accept loop only locks it for the duration of a poll, so `close()`
/// can take the listener out from any thread without waiting on the loop.
type ListenerSlot<A> = Arc<Mutex<Option<A>>>;

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// Outcome of the readiness future
#[derive(Clone, Debug)]
enum Readiness {
    Pending,
    Ready,
    Failed(SignalError),
}

impl Readiness {
    fn outcome(&self) -> Option<Result<(), SignalError>> {
        match self {
            Self::Pending => None,
            Self::Ready => Some(Ok(())),
            Self::Failed(err) => Some(Err(err.clone())),
        }
    }
}

/// Shared state of one channel, owned jointly by the handle and its tasks
pub(crate) struct Lifecycle {
    address: SignalAddress,
    url: String,
    state: watch::Sender<ChannelState>,
    readiness: watch::Sender<Readiness>,
    close_requested: AtomicBool,
    shutdown: watch::Sender<bool>,
    release: Mutex<Option<ReleaseHook>>,
    emitter: EventEmitter,
}

impl Lifecycle {
    pub(crate) fn new(
        address: SignalAddress,
        transport: &'static str,
        config: ChannelConfig,
    ) -> Arc<Self> {
        let url = address.url();
        Arc::new(Self {
            address,
            url,
            state: watch::Sender::new(ChannelState::Binding),
            readiness: watch::Sender::new(Readiness::Pending),
            close_requested: AtomicBool::new(false),
            shutdown: watch::Sender::new(false),
            release: Mutex::new(None),
            emitter: EventEmitter::new(transport, config),
        })
    }

    pub(crate) fn address(&self) -> &SignalAddress {
        &self.address
    }

    pub(crate) fn url(&self) -> &str {
        &self.url
    }

    pub(crate) fn state(&self) -> ChannelState {
        *self.state.borrow()
    }

    pub(crate) fn subscribe(&self) -> SignalEvents {
        self.emitter.subscribe()
    }

    pub(crate) fn emit(&self, event: SignalEvent) {
        self.emitter.emit(event);
    }

    /// Wait until the channel is listening or has failed to
    pub(crate) async fn ready(&self) -> Result<(), SignalError> {
        let mut rx = self.readiness.subscribe();
        if rx.wait_for(|r| r.outcome().is_some()).await.is_err() {
            return Err(SignalError::Closed);
        }
        let outcome = rx.borrow().outcome();
        outcome.unwrap_or(Err(SignalError::Closed))
    }

    /// Wait until the channel reached its terminal state
    pub(crate) async fn closed(&self) {
        let mut rx = self.state.subscribe();
        let _ = rx.wait_for(|state| *state == ChannelState::Closed).await;
    }

    /// Ask the channel to shut down
    ///
    /// A bound listener is released before this returns. Returns false if
    /// shutdown had already been requested.
    pub(crate) fn request_close(&self) -> bool {
        if self.close_requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.release_listener();
        self.shutdown.send_replace(true);
        tracing::debug!(url = %self.url, "Signal channel close requested");
        true
    }

    pub(crate) fn is_close_requested(&self) -> bool {
        self.close_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Hand the bound listener to the lifecycle so `close()` can release it
    ///
    /// Releases it straight away if close was requested while binding.
    fn install_listener<A: Acceptor>(&self, listener: A) -> ListenerSlot<A> {
        let slot = Arc::new(Mutex::new(Some(listener)));
        let held = Arc::clone(&slot);
        *self.release.lock() = Some(Box::new(move || {
            if let Some(listener) = held.lock().take() {
                listener.release();
            }
        }));

        // Pairs with the swap in request_close: one side always sees the other
        if self.is_close_requested() {
            self.release_listener();
        }
        slot
    }

    fn release_listener(&self) {
        let hook = self.release.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }

    fn mark_listening(&self) {
        self.state.send_replace(ChannelState::Listening);
        self.emit(SignalEvent::Listening {
            url: self.url.clone(),
        });
        self.readiness.send_replace(Readiness::Ready);
        tracing::debug!(url = %self.url, "Signal channel listening");
    }

    fn fail_bind(&self, err: SignalError) {
        tracing::warn!(url = %self.url, error = %err, "Signal channel failed to bind");
        self.emit(SignalEvent::Error(err.clone()));
        self.readiness.send_replace(Readiness::Failed(err));
        self.finish();
    }

    fn finish(&self) {
        self.readiness.send_if_modified(|readiness| {
            if matches!(readiness, Readiness::Pending) {
                *readiness = Readiness::Failed(SignalError::Closed);
                true
            } else {
                false
            }
        });
        self.emit(SignalEvent::Closed);
        self.state.send_replace(ChannelState::Closed);
        tracing::debug!(url = %self.url, "Signal channel closed");
    }
}

/// Resolves once shutdown has been requested
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|closing| *closing).await;
}

/// Spawn the task that binds a listener and runs the channel to completion
///
/// Must be called from within a Tokio runtime.
pub(crate) fn spawn_listener<A, B>(lifecycle: Arc<Lifecycle>, bind: B)
where
    A: Acceptor,
    B: Future<Output = io::Result<A>> + Send + 'static,
{
    tokio::spawn(async move {
        let mut shutdown = lifecycle.shutdown_signal();

        let bound = tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => None,
            result = bind => Some(result),
        };

        let listener = match bound {
            None => {
                tracing::debug!(url = %lifecycle.url(), "Bind abandoned by close");
                lifecycle.finish();
                return;
            }
            Some(Err(e)) => {
                let err = SignalError::bind(lifecycle.url(), e);
                lifecycle.fail_bind(err);
                return;
            }
            Some(Ok(listener)) => listener,
        };

        let slot = lifecycle.install_listener(listener);
        if lifecycle.is_close_requested() {
            lifecycle.finish();
            return;
        }

        lifecycle.mark_listening();
        serve(&lifecycle, &slot).await;
    });
}

/// Accept loop: one relay task per connection until shutdown
async fn serve<A: Acceptor>(lifecycle: &Arc<Lifecycle>, slot: &ListenerSlot<A>) {
    let mut shutdown = lifecycle.shutdown_signal();
    let mut relays = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            () = shutdown_requested(&mut shutdown) => break,
            Some(_) = relays.join_next(), if !relays.is_empty() => {}
            accepted = poll_fn(|cx| poll_slot(slot, cx)) => match accepted {
                // Released by close()
                None => break,
                Some(Ok(stream)) => {
                    if lifecycle.is_close_requested() {
                        drop(stream);
                        break;
                    }
                    let connection = ConnectionId::new();
                    tracing::debug!(url = %lifecycle.url(), conn_id = %connection, "Peer connected");
                    lifecycle.emit(SignalEvent::Connect(connection));
                    relays.spawn(relay_connection(Arc::clone(lifecycle), connection, stream));
                }
                Some(Err(e)) if is_transient_accept_error(&e) => {
                    tracing::warn!(url = %lifecycle.url(), error = %e, "Accept error");
                }
                Some(Err(e)) => {
                    let err = SignalError::listener(lifecycle.url(), e);
                    tracing::warn!(url = %lifecycle.url(), error = %err, "Listener failed");
                    lifecycle.emit(SignalEvent::Error(err));
                    break;
                }
            },
        }
    }

    // Releases the listener if the loop ended on its own
    lifecycle.request_close();
    while relays.join_next().await.is_some() {}

    lifecycle.finish();
}

/// Poll the listener in `slot`, or yield `None` once it has been released
fn poll_slot<A: Acceptor>(
    slot: &ListenerSlot<A>,
    cx: &mut Context<'_>,
) -> Poll<Option<io::Result<A::Stream>>> {
    match slot.lock().as_ref() {
        Some(listener) => listener.poll_accept(cx).map(Some),
        None => Poll::Ready(None),
    }
}

/// Accept errors that concern only the connection being accepted
fn is_transient_accept_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}
