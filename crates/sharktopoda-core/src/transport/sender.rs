//! Outbound UDP sender for messages to the remote endpoint.

use crate::{
    CoreResult, ProtocolError,
    transport::{ClientAddress, Inbound, inbound::MAX_DATAGRAM_LEN},
};

use std::{
    collections::HashMap,
    io::ErrorKind,
    net::{Ipv4Addr, SocketAddr},
    panic::Location,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::SystemTime,
};

use error_location::ErrorLocation;
use serde_json::Value;
use tokio::{net::UdpSocket, sync::mpsc};
use tracing::{debug, error, instrument, trace};

/// A message that has been handed to the sender.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    /// Identifier returned by the send call.
    pub tag: u64,
    /// The datagram as text.
    pub message: String,
    /// Destination host.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// When the send was requested.
    pub sent_at: SystemTime,
}

/// Notifications from the sender.
#[derive(Debug)]
pub enum SenderEvent {
    /// The datagram left the socket.
    Sent(SentMessage),
    /// The datagram could not be sent.
    SendFailed {
        /// What was being sent.
        message: SentMessage,
        /// Why it failed.
        error: ProtocolError,
    },
    /// The first reply after a send decoded as JSON.
    ReceivedJson {
        /// Decoded reply.
        json: Value,
        /// Who replied.
        from: ClientAddress,
    },
    /// The first reply after a send was text but not JSON.
    ReceivedMessage {
        /// Decoded reply.
        message: String,
        /// Who replied.
        from: ClientAddress,
    },
}

/// UDP socket on an ephemeral port used to reach the remote endpoint.
///
/// The socket is IPv4 only; a send to an IPv6 host is reported as
/// [`SenderEvent::SendFailed`].
///
/// Every send is tagged; the tag's [`SentMessage`] is tracked until its
/// outcome is reported as a [`SenderEvent`].
pub struct UdpSender {
    socket: Arc<UdpSocket>,
    next_tag: u64,
    pending: Arc<Mutex<HashMap<u64, SentMessage>>>,
    listening: Arc<AtomicBool>,
    events: mpsc::UnboundedSender<SenderEvent>,
}

impl UdpSender {
    /// Bind an ephemeral port on all IPv4 interfaces.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BindFailed`] if the OS refuses the socket.
    pub async fn bind(events: mpsc::UnboundedSender<SenderEvent>) -> CoreResult<Self> {
        let location = ErrorLocation::from(Location::caller());

        let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)))
            .await
            .map_err(|source| ProtocolError::BindFailed {
                port: 0,
                source,
                location,
            })?;

        if let Ok(local) = socket.local_addr() {
            debug!(port = local.port(), "UDP sender bound");
        }

        Ok(Self {
            socket: Arc::new(socket),
            next_tag: 0,
            pending: Arc::new(Mutex::new(HashMap::new())),
            listening: Arc::new(AtomicBool::new(false)),
            events,
        })
    }

    /// Local port the sender is bound to.
    pub fn local_port(&self) -> Option<u16> {
        self.socket.local_addr().ok().map(|a| a.port())
    }

    /// Send UTF-8 text to `host:port`.
    pub fn send_message(&mut self, message: &str, host: &str, port: u16) -> u64 {
        self.send_data(message.as_bytes().to_vec(), host, port)
    }

    /// Send raw bytes to `host:port`, returning the send's tag.
    ///
    /// The outcome arrives later as [`SenderEvent::Sent`] or
    /// [`SenderEvent::SendFailed`]. A receive-once listener is armed first
    /// so the remote's reply, if any, is reported.
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub fn send_data(&mut self, data: Vec<u8>, host: &str, port: u16) -> u64 {
        let tag = self.next_tag;
        self.next_tag += 1;

        let message = SentMessage {
            tag,
            message: String::from_utf8_lossy(&data).into_owned(),
            host: host.to_owned(),
            port,
            sent_at: SystemTime::now(),
        };
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(tag, message);

        self.receive_once();

        let socket = Arc::clone(&self.socket);
        let pending = Arc::clone(&self.pending);
        let events = self.events.clone();
        let host = host.to_owned();
        tokio::spawn(async move {
            let result = socket.send_to(&data, (host.as_str(), port)).await;

            let Some(message) = pending
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(&tag)
            else {
                return;
            };

            let event = match result {
                Ok(_) => {
                    trace!(tag, %host, port, "Message sent");
                    SenderEvent::Sent(message)
                }
                Err(source) => {
                    error!(tag, %host, port, error = %source, "Message send failed");
                    SenderEvent::SendFailed {
                        error: ProtocolError::SendFailed {
                            destination: format!("{host}:{port}"),
                            source,
                            location: ErrorLocation::from(Location::caller()),
                        },
                        message,
                    }
                }
            };
            let _ = events.send(event);
        });

        tag
    }

    /// Messages whose outcome has not been reported yet.
    pub fn pending(&self) -> Vec<SentMessage> {
        let mut messages: Vec<SentMessage> = self
            .pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        messages.sort_by_key(|m| m.tag);
        messages
    }

    /// Arm a single-shot listener for the next reply.
    ///
    /// Datagrams that arrived while no listener was armed are stale and
    /// discarded first. Does nothing if a listener is already waiting.
    fn receive_once(&self) {
        if self.listening.swap(true, Ordering::AcqRel) {
            return;
        }

        let mut buf = vec![0u8; MAX_DATAGRAM_LEN];
        loop {
            match self.socket.try_recv_from(&mut buf) {
                Ok((len, from)) => debug!(%from, len, "Discarded stale reply"),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    debug!(error = %e, "Stopped draining stale replies");
                    break;
                }
            }
        }

        let socket = Arc::clone(&self.socket);
        let listening = Arc::clone(&self.listening);
        let events = self.events.clone();
        tokio::spawn(async move {
            let received = socket.recv_from(&mut buf).await;
            listening.store(false, Ordering::Release);

            let (len, from) = match received {
                Ok(received) => received,
                Err(e) => {
                    debug!(error = %e, "Receive-once listener failed");
                    return;
                }
            };
            let from = ClientAddress::from(from);

            let event = match Inbound::decode(&buf[..len]) {
                Some(Inbound::Json(json)) => SenderEvent::ReceivedJson { json, from },
                Some(Inbound::Text(message)) => SenderEvent::ReceivedMessage { message, from },
                None => {
                    debug!(%from, len, "Dropped undecodable reply");
                    return;
                }
            };
            let _ = events.send(event);
        });
    }
}
