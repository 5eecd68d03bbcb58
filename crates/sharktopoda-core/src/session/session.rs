//! The serialized session loop: dispatch, routing and transport ownership.

use crate::{
    CoreResult, ProtocolError,
    command::{Arguments, Command, CommandVerb, Responder},
    interpreter::{Interpreter, InterpreterConfigurator},
    response::Response,
    session::serial::{self, SerialContext, SerialQueue},
    transport::{
        ClientAddress, ListenState, SenderEvent, ServiceEvent, UdpSender, UdpService,
    },
};

use std::{
    fmt,
    panic::Location,
    sync::{Arc, Mutex},
};

use error_location::ErrorLocation;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, instrument, trace, warn};

/// Where asynchronous replies go, as set by the last `connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEndpoint {
    /// Host name or address.
    pub host: String,
    /// UDP port.
    pub port: u16,
}

impl fmt::Display for RemoteEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Requests delivered to the session task.
pub(crate) enum SessionMessage {
    Respond {
        response: Response,
        client: ClientAddress,
    },
    StartListening {
        port: u16,
        reply: oneshot::Sender<CoreResult<u16>>,
    },
    StopListening,
    ToggleListening {
        port: u16,
        reply: oneshot::Sender<CoreResult<bool>>,
    },
    Shutdown {
        done: oneshot::Sender<()>,
    },
}

/// Owns the interpreter and both transports, and runs every dispatch and
/// routing decision on one task.
///
/// Build it with [`Session::new`], add handlers with
/// [`configure`](Session::configure), keep a [`SessionHandle`], then spawn
/// [`run`](Session::run).
pub struct Session {
    interpreter: Interpreter,
    service: UdpService,
    sender: UdpSender,
    remote: Arc<Mutex<Option<RemoteEndpoint>>>,
    service_rx: mpsc::UnboundedReceiver<ServiceEvent>,
    sender_rx: mpsc::UnboundedReceiver<SenderEvent>,
    inbox_tx: mpsc::UnboundedSender<SessionMessage>,
    inbox_rx: mpsc::UnboundedReceiver<SessionMessage>,
    serial: SerialContext,
    jobs: SerialQueue,
}

impl Session {
    /// Bind the outbound sender and register the `connect` handler.
    ///
    /// The inbound service starts idle; see
    /// [`SessionHandle::start_listening`].
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BindFailed`] if the sender socket cannot
    /// be bound.
    #[instrument]
    pub async fn new() -> CoreResult<Self> {
        let (service_tx, service_rx) = mpsc::unbounded_channel();
        let (sender_tx, sender_rx) = mpsc::unbounded_channel();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        let (serial, jobs) = serial::channel();

        let sender = UdpSender::bind(sender_tx).await?;
        let service = UdpService::new(service_tx);

        let remote = Arc::new(Mutex::new(None));
        let mut interpreter = Interpreter::new();
        let connect_remote = Arc::clone(&remote);
        interpreter.register(CommandVerb::Connect, move |arguments, _command| {
            if let Arguments::Connect { port, host } = arguments {
                let endpoint = RemoteEndpoint { host, port };
                info!(remote = %endpoint, "Remote endpoint set");
                *connect_remote.lock().unwrap_or_else(|e| e.into_inner()) = Some(endpoint);
            }
        });

        Ok(Self {
            interpreter,
            service,
            sender,
            remote,
            service_rx,
            sender_rx,
            inbox_tx,
            inbox_rx,
            serial,
            jobs,
        })
    }

    /// Apply a configurator. Later registrations replace earlier ones.
    pub fn configure(&mut self, configurator: &dyn InterpreterConfigurator) {
        self.interpreter.configure(configurator);
    }

    /// Handle for posting work onto the session task.
    pub fn serial_context(&self) -> SerialContext {
        self.serial.clone()
    }

    /// Cloneable control handle.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            inbox_tx: self.inbox_tx.clone(),
            listen_state: self.service.state_handle(),
            remote: Arc::clone(&self.remote),
        }
    }

    /// Run until [`SessionHandle::shutdown`] is called.
    #[instrument(skip(self))]
    pub async fn run(mut self) {
        info!("Session started");

        loop {
            tokio::select! {
                Some(event) = self.service_rx.recv() => self.handle_service_event(event),

                Some(event) = self.sender_rx.recv() => self.handle_sender_event(event),

                Some(message) = self.inbox_rx.recv() => {
                    match message {
                        SessionMessage::Respond { response, client } => self.route(response, client),
                        SessionMessage::StartListening { port, reply } => {
                            let result = self.service.start_listening(port).await;
                            let _ = reply.send(result);
                        }
                        SessionMessage::StopListening => self.service.stop_listening(),
                        SessionMessage::ToggleListening { port, reply } => {
                            let result = if self.service.running() {
                                self.service.stop_listening();
                                Ok(false)
                            } else {
                                self.service.start_listening(port).await.map(|_| true)
                            };
                            let _ = reply.send(result);
                        }
                        SessionMessage::Shutdown { done } => {
                            info!("Shutdown requested");
                            self.service.stop_listening();
                            let _ = done.send(());
                            break;
                        }
                    }
                }

                Some(job) = self.jobs.next() => job(),

                else => {
                    info!("All channels closed, session ending");
                    break;
                }
            }
        }

        info!("Session stopped");
    }

    fn handle_service_event(&mut self, event: ServiceEvent) {
        match event {
            ServiceEvent::Started { port } => info!(port, "Listening for commands"),
            ServiceEvent::Stopped { port } => info!(port, "Stopped listening for commands"),
            ServiceEvent::Json { json, from } => self.dispatch(json, from),
            ServiceEvent::Text { message, from } => {
                warn!(client = %from, %message, "Received non-JSON text, ignored");
            }
            ServiceEvent::ResponseSent { tag, to } => trace!(tag, client = %to, "Response sent"),
            ServiceEvent::ResponseFailed { tag, to, error } => {
                error!(tag, client = %to, error = %error, "Response send failed");
            }
        }
    }

    fn handle_sender_event(&mut self, event: SenderEvent) {
        match event {
            SenderEvent::Sent(message) => {
                debug!(
                    tag = message.tag,
                    host = %message.host,
                    port = message.port,
                    "Remote message sent"
                );
            }
            SenderEvent::SendFailed { message, error } => {
                error!(tag = message.tag, error = %error, "Remote message send failed");
            }
            SenderEvent::ReceivedJson { json, from } => {
                debug!(remote = %from, %json, "Remote replied");
            }
            SenderEvent::ReceivedMessage { message, from } => {
                debug!(remote = %from, %message, "Remote replied with text");
            }
        }
    }

    fn dispatch(&mut self, json: Value, from: ClientAddress) {
        let inbox_tx = self.inbox_tx.clone();
        let responder = Responder::new(move |response| {
            let _ = inbox_tx.send(SessionMessage::Respond {
                response,
                client: from,
            });
        });

        let Some(command) = Command::parse(json.clone(), from, Some(responder)) else {
            let e = ProtocolError::MalformedMessage {
                reason: format!("not a known command: {json}"),
                location: ErrorLocation::from(Location::caller()),
            };
            warn!(client = %from, error = %e, "Message dropped");
            return;
        };

        debug!(client = %from, %command, "Command received");
        self.interpreter.handle(command);
    }

    /// Decide where a response goes, if anywhere.
    #[instrument(skip_all, fields(verb = %response.verb(), client = %client))]
    fn route(&mut self, response: Response, client: ClientAddress) {
        if !response.is_transmittable() {
            match response.error() {
                Some(detail) => debug!(error = %detail, "Failure not sent"),
                None => debug!("Failure not sent: unknown error"),
            }
            return;
        }

        let Some(data) = response.to_wire() else {
            error!(%response, "Malformed response, not sent");
            return;
        };

        let verb = response.verb();
        if response.is_structural_failure() || verb.sends_response_to_client() {
            match self.service.send_response(data, client) {
                Ok(tag) => trace!(tag, "Response queued"),
                Err(e) => error!(error = %e, "Response dropped"),
            }
        } else if verb.sends_response_to_remote() {
            let remote = self
                .remote
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone();
            match remote {
                Some(remote) => {
                    let tag = self.sender.send_data(data, &remote.host, remote.port);
                    trace!(tag, %remote, "Response queued for remote");
                }
                None => warn!("No remote endpoint connected, response dropped"),
            }
        } else {
            debug!("Verb sends no response");
        }
    }
}

/// Cloneable control surface for a running [`Session`].
#[derive(Clone)]
pub struct SessionHandle {
    inbox_tx: mpsc::UnboundedSender<SessionMessage>,
    listen_state: Arc<Mutex<ListenState>>,
    remote: Arc<Mutex<Option<RemoteEndpoint>>>,
}

impl SessionHandle {
    /// Bind `port` and start accepting commands, replacing any current
    /// binding. Returns the bound port.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::BindFailed`] if the port cannot be bound,
    /// or [`ProtocolError::SessionClosed`] if the session is gone.
    pub async fn start_listening(&self, port: u16) -> CoreResult<u16> {
        let (reply, response) = oneshot::channel();
        self.send(SessionMessage::StartListening { port, reply })?;
        response.await.map_err(|_| session_closed())?
    }

    /// Ask the service to stop. Returns before the socket has closed.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SessionClosed`] if the session is gone.
    #[track_caller]
    pub fn stop_listening(&self) -> CoreResult<()> {
        self.send(SessionMessage::StopListening)
    }

    /// Stop if running, otherwise start on `port`. Returns whether the
    /// service is now listening.
    ///
    /// # Errors
    ///
    /// As [`start_listening`](Self::start_listening).
    pub async fn toggle_listening(&self, port: u16) -> CoreResult<bool> {
        let (reply, response) = oneshot::channel();
        self.send(SessionMessage::ToggleListening { port, reply })?;
        response.await.map_err(|_| session_closed())?
    }

    /// True from a successful bind until the socket has actually closed.
    pub fn is_running(&self) -> bool {
        matches!(
            self.listen_state(),
            ListenState::Listening { .. } | ListenState::Closing { .. }
        )
    }

    /// Current lifecycle state of the inbound service.
    pub fn listen_state(&self) -> ListenState {
        *self.listen_state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The endpoint set by the most recent `connect`.
    pub fn remote_endpoint(&self) -> Option<RemoteEndpoint> {
        self.remote
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stop listening and end the session loop.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::SessionClosed`] if the session is already gone.
    pub async fn shutdown(&self) -> CoreResult<()> {
        let (done, finished) = oneshot::channel();
        self.send(SessionMessage::Shutdown { done })?;
        finished.await.map_err(|_| session_closed())
    }

    #[track_caller]
    fn send(&self, message: SessionMessage) -> CoreResult<()> {
        if self.inbox_tx.send(message).is_err() {
            return Err(session_closed());
        }
        Ok(())
    }
}

#[track_caller]
fn session_closed() -> ProtocolError {
    ProtocolError::SessionClosed {
        location: ErrorLocation::from(Location::caller()),
    }
}
