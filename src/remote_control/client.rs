use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, trace, warn};

use crate::error::Error;

use super::correlator::{Correlator, RequestKind, Responder};
use super::dialect::{codec_for, DialectCodec, Inbound, ResponseBody};
use super::transport::{Transport, TransportEvent};
use super::{ConnectionOptions, ConnectionState, Scene};

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

type ErrorCallback = Box<dyn Fn(&str) + Send + Sync>;
type CloseCallback = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Callbacks {
    on_error: Mutex<Option<ErrorCallback>>,
    on_close: Mutex<Option<CloseCallback>>,
}

impl Callbacks {
    fn error(&self, reason: &str) {
        if let Some(callback) = self.on_error.lock().unwrap().as_ref() {
            callback(reason);
        }
    }

    fn closed(&self) {
        if let Some(callback) = self.on_close.lock().unwrap().as_ref() {
            callback();
        }
    }
}

#[derive(Debug)]
enum Operation {
    ListScenes,
    ActiveScene,
    SetScene(Scene),
}

impl Operation {
    fn kind(&self) -> RequestKind {
        match self {
            Operation::ListScenes => RequestKind::ListScenes,
            Operation::ActiveScene => RequestKind::ActiveScene,
            Operation::SetScene(_) => RequestKind::SetScene,
        }
    }
}

enum Command {
    Request {
        operation: Operation,
        respond: Responder,
    },
    Close,
}

struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: tokio::task::JoinHandle<()>,
}

/// Remote control client for one streaming tool.
///
/// One instance owns at most one connection. `connect` always builds a
/// fresh transport and runs the dialect handshake, a stale socket is never
/// reused. All logical operations go through the connection task, which is
/// the only place that touches the socket and the pending table.
pub struct Client {
    options: ConnectionOptions,
    connect_timeout: Duration,
    connection: Mutex<Option<ConnectionHandle>>,
    state: Arc<Mutex<ConnectionState>>,
    callbacks: Arc<Callbacks>,
}

impl Client {
    pub fn new(options: ConnectionOptions) -> Self {
        Self::with_connect_timeout(options, DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn with_connect_timeout(options: ConnectionOptions, connect_timeout: Duration) -> Self {
        Self {
            options,
            connect_timeout,
            connection: Mutex::new(None),
            state: Arc::new(Mutex::new(ConnectionState::Disconnected)),
            callbacks: Arc::new(Callbacks::default()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Registers the error listener. One at a time, the last one wins.
    pub fn on_error(&self, callback: impl Fn(&str) + Send + Sync + 'static) {
        *self.callbacks.on_error.lock().unwrap() = Some(Box::new(callback));
    }

    /// Registers the close listener. One at a time, the last one wins.
    pub fn on_close(&self, callback: impl Fn() + Send + Sync + 'static) {
        *self.callbacks.on_close.lock().unwrap() = Some(Box::new(callback));
    }

    /// Opens a fresh connection and runs the dialect auth handshake.
    ///
    /// True only when the remote accepted us before the timeout. Auth
    /// refusal, a hello we cannot use, transport failures and the timeout
    /// all come back as false, this method never errors.
    pub async fn connect(&self) -> bool {
        self.discard_previous();
        self.set_state(ConnectionState::Connecting);

        let codec = codec_for(self.options.dialect, &self.options.auth_secret);
        let url = self.options.url(codec.endpoint_path());

        // One deadline for the whole attempt, opening the socket included.
        let deadline = tokio::time::Instant::now() + self.connect_timeout;

        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let opened = tokio::time::timeout_at(deadline, Transport::open(&url, events_tx));
        let transport = match opened.await {
            Ok(Ok(t)) => t,
            Ok(Err(e)) => {
                warn!(?e, "could not open the websocket");
                self.callbacks.error(&e.to_string());
                self.set_state(ConnectionState::Disconnected);
                return false;
            }
            Err(_) => {
                warn!(timeout = ?self.connect_timeout, "connect timed out");
                self.callbacks.error("timeout");
                self.set_state(ConnectionState::Disconnected);
                return false;
            }
        };

        let mut correlator = Correlator::new();
        let (tx, rx) = oneshot::channel();
        let connect_id = correlator.register(RequestKind::Connect, tx);
        let greeting = codec.open_request(connect_id);

        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let inner = InnerConnection {
            transport,
            codec,
            correlator,
            state: self.state.clone(),
            callbacks: self.callbacks.clone(),
        };
        let task = tokio::spawn(inner.run(greeting, events_rx, commands_rx));

        {
            let mut connection = self.connection.lock().unwrap();
            *connection = Some(ConnectionHandle {
                commands: commands_tx,
                task,
            });
        }

        let connected = match tokio::time::timeout_at(deadline, rx).await {
            Ok(Ok(Ok(ResponseBody::Ack(true)))) => true,
            Ok(Ok(Ok(_))) => false,
            Ok(Ok(Err(e))) => {
                debug!(?e, "connect settled with an error");
                false
            }
            // The connection task went away before the handshake finished.
            Ok(Err(_)) => false,
            Err(_) => {
                warn!(timeout = ?self.connect_timeout, "connect timed out");
                self.callbacks.error("timeout");
                self.send_close();
                false
            }
        };

        if connected {
            info!(host = %self.options.host, "connected to the streaming tool");
        } else {
            self.set_state(ConnectionState::Disconnected);
        }

        connected
    }

    /// Closes the current connection. Idempotent, fine to call when never
    /// connected.
    pub fn disconnect(&self) {
        let connection = self.connection.lock().unwrap().take();

        if let Some(connection) = connection {
            debug!("disconnecting");
            let _ = connection.commands.send(Command::Close);
        }
    }

    /// Full scene list. Empty when the remote has none.
    pub async fn get_scenes(&self) -> Result<Vec<Scene>, Error> {
        match self.request(Operation::ListScenes).await? {
            ResponseBody::Scenes(scenes) => Ok(scenes),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Looks a scene up by its user visible name, exact and case
    /// sensitive. With an empty `scenes` the list is fetched first.
    pub async fn find_scene(&self, name: &str, scenes: &[Scene]) -> Result<Option<Scene>, Error> {
        let fetched;
        let scenes = if scenes.is_empty() {
            fetched = self.get_scenes().await?;
            &fetched
        } else {
            scenes
        };

        Ok(scenes.iter().find(|s| s.name == name).cloned())
    }

    pub async fn active_scene(&self) -> Result<Option<Scene>, Error> {
        match self.request(Operation::ActiveScene).await? {
            ResponseBody::ActiveScene(scene) => Ok(scene),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    /// Asks the remote to switch. The returned bool is the remote's own
    /// verdict, false means it refused.
    pub async fn set_active_scene(&self, scene: &Scene) -> Result<bool, Error> {
        match self.request(Operation::SetScene(scene.clone())).await? {
            ResponseBody::Ack(ok) => Ok(ok),
            _ => Err(Error::UnexpectedResponse),
        }
    }

    async fn request(&self, operation: Operation) -> Result<ResponseBody, Error> {
        let commands = {
            let connection = self.connection.lock().unwrap();
            match connection.as_ref() {
                Some(connection) => connection.commands.clone(),
                None => return Err(Error::NotConnected),
            }
        };

        let (tx, rx) = oneshot::channel();
        commands
            .send(Command::Request {
                operation,
                respond: tx,
            })
            .map_err(|_| Error::NotConnected)?;

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(Error::Disconnected),
        }
    }

    /// Drops the previous connection without ceremony. Its task is
    /// aborted, so none of its socket events reach the listeners.
    fn discard_previous(&self) {
        let previous = self.connection.lock().unwrap().take();

        if let Some(connection) = previous {
            debug!("discarding the previous connection");
            connection.task.abort();
        }
    }

    fn send_close(&self) {
        let connection = self.connection.lock().unwrap();
        if let Some(connection) = connection.as_ref() {
            let _ = connection.commands.send(Command::Close);
        }
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }
}

struct InnerConnection {
    transport: Transport,
    codec: Box<dyn DialectCodec>,
    correlator: Correlator,
    state: Arc<Mutex<ConnectionState>>,
    callbacks: Arc<Callbacks>,
}

impl InnerConnection {
    async fn run(
        mut self,
        greeting: Option<String>,
        mut events: mpsc::UnboundedReceiver<TransportEvent>,
        mut commands: mpsc::UnboundedReceiver<Command>,
    ) {
        if let Some(frame) = greeting {
            if let Err(e) = self.transport.send_text(frame).await {
                error!(?e, "could not start the handshake");
                return self.teardown().await;
            }
        }

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(TransportEvent::Message(text)) => {
                        if !self.handle_message(&text).await {
                            break;
                        }
                    }
                    Some(TransportEvent::Error(reason)) => {
                        error!("websocket error: {}", reason);
                        self.callbacks.error(&reason);
                        self.correlator.settle_connect(false);
                    }
                    Some(TransportEvent::Open) => {}
                    Some(TransportEvent::Closed) | None => break,
                },
                command = commands.recv() => match command {
                    Some(Command::Request { operation, respond }) => {
                        self.handle_request(operation, respond).await;
                    }
                    Some(Command::Close) | None => {
                        debug!("close requested");
                        break;
                    }
                },
            }
        }

        self.teardown().await;
    }

    /// Returns false when the connection is done for.
    async fn handle_message(&mut self, raw: &str) -> bool {
        match self.codec.parse_message(raw) {
            Inbound::Handshake(frame) => {
                if let Err(e) = self.transport.send_text(frame).await {
                    error!(?e, "could not answer the handshake");
                    self.correlator.settle_connect(false);
                    return false;
                }
            }
            Inbound::Authenticated => {
                info!("remote accepted the connection");
                self.set_state(ConnectionState::Connected);
                self.correlator.settle_connect(true);
            }
            Inbound::AuthRejected => {
                warn!("remote rejected the authentication");
                self.correlator.settle_connect(false);
                return false;
            }
            Inbound::Response(response) => {
                let connect_reply = self.correlator.waiting_kind(response.request_id)
                    == Some(RequestKind::Connect);
                let auth_ok = matches!(response.body, ResponseBody::Ack(true));

                if connect_reply {
                    if auth_ok {
                        info!("remote accepted the connection");
                        self.set_state(ConnectionState::Connected);
                    } else {
                        warn!("remote rejected the authentication");
                    }
                }

                self.correlator.resolve(response);

                if connect_reply && !auth_ok {
                    return false;
                }
            }
            Inbound::Ignored => trace!("ignoring frame: {}", raw),
        }

        true
    }

    async fn handle_request(&mut self, operation: Operation, respond: Responder) {
        let kind = operation.kind();
        let request_id = self.correlator.register(kind, respond);

        let frame = match &operation {
            Operation::ListScenes => self.codec.list_scenes_request(request_id),
            Operation::ActiveScene => self.codec.active_scene_request(request_id),
            Operation::SetScene(scene) => self.codec.set_active_scene_request(request_id, scene),
        };

        if let Err(e) = self.transport.send_text(frame).await {
            error!(?e, "could not send the request");
            self.correlator.fail(kind, e);
        }
    }

    async fn teardown(mut self) {
        self.transport.close().await;
        self.set_state(ConnectionState::Disconnected);
        self.correlator.drain();
        self.callbacks.closed();
    }

    fn set_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }
}
