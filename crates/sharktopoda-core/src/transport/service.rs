//! Inbound UDP service.
//!
//! Accepts datagrams on one port at a time and reports everything it does
//! as [`ServiceEvent`]s, so the owner can process them on its own
//! serialized context.

use crate::{
    CoreResult, ProtocolError,
    transport::{ClientAddress, Inbound, inbound::MAX_DATAGRAM_LEN},
};

use std::{
    net::{Ipv4Addr, SocketAddr},
    panic::Location,
    sync::{Arc, Mutex},
    time::Duration,
};

use error_location::ErrorLocation;
use serde_json::Value;
use tokio::{
    net::UdpSocket,
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::{debug, error, info, instrument, warn};

/// Lifecycle of the inbound socket.
///
/// `Idle -> Binding -> Listening -> Closing -> Idle`; only `Listening`
/// processes datagrams. A failed bind goes straight back to `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenState {
    /// No socket.
    Idle,
    /// Bind in progress.
    Binding {
        /// Requested port.
        port: u16,
    },
    /// Receiving datagrams.
    Listening {
        /// Bound port.
        port: u16,
    },
    /// Stop requested; the socket has not closed yet.
    Closing {
        /// Port being released.
        port: u16,
    },
}

/// Notifications from the inbound service.
#[derive(Debug)]
pub enum ServiceEvent {
    /// The socket is bound and receiving.
    Started {
        /// Bound port.
        port: u16,
    },
    /// The socket has actually closed.
    Stopped {
        /// Port that was released.
        port: u16,
    },
    /// A datagram decoded as JSON.
    Json {
        /// Decoded message.
        json: Value,
        /// Sender.
        from: ClientAddress,
    },
    /// A datagram that was not JSON but was UTF-8 text.
    Text {
        /// Decoded text.
        message: String,
        /// Sender.
        from: ClientAddress,
    },
    /// A reply left the socket.
    ResponseSent {
        /// Tag returned by [`UdpService::send_response`].
        tag: u64,
        /// Destination.
        to: ClientAddress,
    },
    /// A reply could not be sent.
    ResponseFailed {
        /// Tag returned by [`UdpService::send_response`].
        tag: u64,
        /// Destination.
        to: ClientAddress,
        /// What went wrong.
        error: ProtocolError,
    },
}

struct Binding {
    port: u16,
    socket: Arc<UdpSocket>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// UDP listener bound to at most one port.
pub struct UdpService {
    state: Arc<Mutex<ListenState>>,
    binding: Option<Binding>,
    closing_task: Option<JoinHandle<()>>,
    response_tag: u64,
    events: mpsc::UnboundedSender<ServiceEvent>,
}

impl UdpService {
    /// Create an idle service that reports to `events`.
    pub fn new(events: mpsc::UnboundedSender<ServiceEvent>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ListenState::Idle)),
            binding: None,
            closing_task: None,
            response_tag: 0,
            events,
        }
    }

    /// Bind `port` on all interfaces and start receiving.
    ///
    /// Any previous binding is closed first, and that close is awaited so
    /// the port is free again. Port 0 binds an OS-assigned port.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BindFailed`] with the OS error; the service
    /// is left idle and nothing is retried.
    #[instrument(skip(self))]
    pub async fn start_listening(&mut self, port: u16) -> CoreResult<u16> {
        let location = ErrorLocation::from(Location::caller());

        if self.binding.is_some() {
            self.stop_listening();
        }
        if let Some(task) = self.closing_task.take()
            && let Err(e) = task.await
        {
            warn!(error = ?e, "Previous receive task ended abnormally");
        }

        self.set_state(ListenState::Binding { port });

        let socket = match UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port))).await {
            Ok(socket) => Arc::new(socket),
            Err(source) => {
                self.set_state(ListenState::Idle);
                error!(port, error = %source, "Failed to bind UDP port");
                return Err(ProtocolError::BindFailed {
                    port,
                    source,
                    location,
                });
            }
        };

        let bound_port = socket.local_addr().map(|a| a.port()).unwrap_or(port);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        self.set_state(ListenState::Listening { port: bound_port });

        let task = tokio::spawn(receive_loop(
            Arc::clone(&socket),
            bound_port,
            shutdown_rx,
            Arc::clone(&self.state),
            self.events.clone(),
        ));

        self.binding = Some(Binding {
            port: bound_port,
            socket,
            shutdown_tx,
            task,
        });

        info!(port = bound_port, "UDP service listening");
        let _ = self.events.send(ServiceEvent::Started { port: bound_port });

        Ok(bound_port)
    }

    /// Request the socket to close.
    ///
    /// Returns immediately. [`running`](Self::running) stays true until the
    /// receive task has closed the socket and emitted
    /// [`ServiceEvent::Stopped`].
    #[instrument(skip(self))]
    pub fn stop_listening(&mut self) {
        let Some(binding) = self.binding.take() else {
            debug!("Stop requested while not listening");
            return;
        };

        self.set_state(ListenState::Closing { port: binding.port });
        let _ = binding.shutdown_tx.send(true);
        self.closing_task = Some(binding.task);
    }

    /// Send a reply datagram without waiting for it to leave.
    ///
    /// The outcome arrives later as [`ServiceEvent::ResponseSent`] or
    /// [`ServiceEvent::ResponseFailed`] carrying the returned tag.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::NotListening`] when no port is bound.
    #[track_caller]
    pub fn send_response(&mut self, data: Vec<u8>, to: ClientAddress) -> CoreResult<u64> {
        let Some(binding) = &self.binding else {
            return Err(ProtocolError::NotListening {
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let tag = self.response_tag;
        self.response_tag += 1;

        let socket = Arc::clone(&binding.socket);
        let events = self.events.clone();
        tokio::spawn(async move {
            let event = match socket.send_to(&data, to.socket_addr()).await {
                Ok(_) => ServiceEvent::ResponseSent { tag, to },
                Err(source) => ServiceEvent::ResponseFailed {
                    tag,
                    to,
                    error: ProtocolError::SendFailed {
                        destination: to.to_string(),
                        source,
                        location: ErrorLocation::from(Location::caller()),
                    },
                },
            };
            let _ = events.send(event);
        });

        Ok(tag)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ListenState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// True from a successful bind until the socket has actually closed.
    pub fn running(&self) -> bool {
        matches!(
            self.state(),
            ListenState::Listening { .. } | ListenState::Closing { .. }
        )
    }

    /// Port currently bound, including while closing.
    pub fn port(&self) -> Option<u16> {
        match self.state() {
            ListenState::Listening { port } | ListenState::Closing { port } => Some(port),
            ListenState::Idle | ListenState::Binding { .. } => None,
        }
    }

    /// Shared view of the lifecycle state for observers on other tasks.
    pub(crate) fn state_handle(&self) -> Arc<Mutex<ListenState>> {
        Arc::clone(&self.state)
    }

    fn set_state(&self, next: ListenState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }
}

/// Consecutive receive errors tolerated before the service stops itself.
pub(crate) const MAX_CONSECUTIVE_RECEIVE_ERRORS: u32 = 8;

const RECEIVE_RETRY_BASE: Duration = Duration::from_millis(10);
const RECEIVE_RETRY_CAP: Duration = Duration::from_millis(500);

/// Delay before retrying after `failures` consecutive receive errors.
pub(crate) fn receive_retry_delay(failures: u32) -> Duration {
    let doubled = RECEIVE_RETRY_BASE.saturating_mul(1 << failures.saturating_sub(1).min(16));
    doubled.min(RECEIVE_RETRY_CAP)
}

async fn receive_loop(
    socket: Arc<UdpSocket>,
    port: u16,
    mut shutdown_rx: watch::Receiver<bool>,
    state: Arc<Mutex<ListenState>>,
    events: mpsc::UnboundedSender<ServiceEvent>,
) {
    let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
    let mut failures = 0u32;

    loop {
        tokio::select! {
            _ = shutdown_rx.changed() => break,
            received = socket.recv_from(&mut buf) => match received {
                Ok((len, from)) => {
                    failures = 0;
                    let from = ClientAddress::from(from);
                    let event = match Inbound::decode(&buf[..len]) {
                        Some(Inbound::Json(json)) => ServiceEvent::Json { json, from },
                        Some(Inbound::Text(message)) => ServiceEvent::Text { message, from },
                        None => {
                            debug!(%from, len, "Dropped datagram that is neither JSON nor UTF-8");
                            continue;
                        }
                    };
                    if events.send(event).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    failures += 1;
                    if failures >= MAX_CONSECUTIVE_RECEIVE_ERRORS {
                        error!(port, failures, error = %e, "UDP receive keeps failing, stopping");
                        break;
                    }
                    let delay = receive_retry_delay(failures);
                    warn!(port, failures, error = %e, ?delay, "UDP receive failed");
                    tokio::select! {
                        _ = shutdown_rx.changed() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    drop(socket);
    *state.lock().unwrap_or_else(|e| e.into_inner()) = ListenState::Idle;
    info!(port, "UDP service stopped");
    let _ = events.send(ServiceEvent::Stopped { port });
}
