use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Result;
use crate::session::{ChannelSession, Collaborators, ConnectionState, TransportEvent};
use crate::types::{encode_client_message, ClientMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;

/// Upper bound on the close handshake before the task is aborted
const TEARDOWN_TIMEOUT: Duration = Duration::from_secs(2);

struct Connection {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

/// Real-time notification channel for one signed-in user.
///
/// With no user id nothing connects. Otherwise a single background task owns
/// the socket, authenticates on open and turns balance updates into a toast
/// plus a bus signal. There is no reconnect: once disconnected the channel
/// stays that way until the user id changes.
///
/// Dropping the handle tears the connection down; `close` does the same and
/// waits for it to finish. Must be created inside a tokio runtime.
pub struct NotificationChannel {
    endpoint: Url,
    collaborators: Collaborators,
    user_id: Option<String>,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    connection: Option<Connection>,
}

impl NotificationChannel {
    pub fn open(endpoint: Url, user_id: Option<String>, collaborators: Collaborators) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Absent);

        let mut channel = Self {
            endpoint,
            collaborators,
            user_id: normalize(user_id),
            state_tx: Arc::new(state_tx),
            connection: None,
        };

        channel.connection = channel.user_id.clone().map(|id| channel.spawn(id));
        if channel.connection.is_none() {
            debug!("No user id, notification channel stays idle");
        }

        channel
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Read-only view of the connection state
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Swap the identity, reconnecting if it actually changed.
    pub async fn set_user_id(&mut self, user_id: Option<String>) {
        let user_id = normalize(user_id);
        if user_id == self.user_id {
            return;
        }

        self.teardown().await;
        self.user_id = user_id;
        self.connection = self.user_id.clone().map(|id| self.spawn(id));
    }

    pub async fn close(mut self) {
        self.teardown().await;
    }

    fn spawn(&self, user_id: String) -> Connection {
        let (shutdown, shutdown_rx) = oneshot::channel();
        let session = ChannelSession::new(user_id, self.collaborators.clone(), self.state_tx.clone());
        let task = tokio::spawn(drive(self.endpoint.clone(), session, shutdown_rx));

        Connection { shutdown, task }
    }

    async fn teardown(&mut self) {
        if let Some(connection) = self.connection.take() {
            // Fails only if the task already finished
            let _ = connection.shutdown.send(());
            join_or_abort(connection.task, TEARDOWN_TIMEOUT).await;
        }
        self.state_tx.send_replace(ConnectionState::Absent);
    }
}

/// Wait for the connection task, aborting it if the peer stalls the close.
async fn join_or_abort(mut task: JoinHandle<()>, limit: Duration) {
    match timeout(limit, &mut task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Notification task ended abnormally: {}", e),
        Err(_) => {
            warn!("Notification task did not stop within {:?}, aborting", limit);
            task.abort();
            // Cancelled is the expected outcome here
            let _ = task.await;
        }
    }
}

/// Binary frames must carry UTF-8 text, same as text frames.
fn binary_frame_text(bytes: Vec<u8>) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Dropping binary frame that is not UTF-8: {}", e);
            None
        }
    }
}

fn normalize(user_id: Option<String>) -> Option<String> {
    user_id.filter(|id| !id.is_empty())
}

/// Connection task. Ends on teardown, close, or the first transport error.
async fn drive(endpoint: Url, mut session: ChannelSession, mut shutdown: oneshot::Receiver<()>) {
    info!("Connecting to notification endpoint at {}", endpoint);

    let ws_stream = tokio::select! {
        biased;
        _ = &mut shutdown => {
            session.teardown();
            return;
        }
        result = connect_async(endpoint.as_str()) => match result {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                session.handle(TransportEvent::Error(e.to_string())).await;
                return;
            }
        }
    };

    let (mut write, mut read) = ws_stream.split();

    if let Some(msg) = session.handle(TransportEvent::Opened).await {
        if let Err(e) = send_client_message(&mut write, &msg).await {
            session.handle(TransportEvent::Error(e.to_string())).await;
            return;
        }
        debug!("Sent authenticate for {}", session.user_id());
    }

    loop {
        tokio::select! {
            biased;
            // Sender dropped counts as teardown too
            _ = &mut shutdown => {
                session.teardown();
                if let Err(e) = write.close().await {
                    debug!("Close handshake failed: {}", e);
                }
                info!("Notification channel for {} shut down", session.user_id());
                break;
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Received: {}", text);
                        session.handle(TransportEvent::Message(text)).await;
                    }
                    Some(Ok(Message::Binary(bytes))) => {
                        if let Some(text) = binary_frame_text(bytes) {
                            session.handle(TransportEvent::Message(text)).await;
                        }
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = write.send(Message::Pong(data)).await {
                            session.handle(TransportEvent::Error(e.to_string())).await;
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Close frame: {:?}", frame);
                        session.handle(TransportEvent::Closed).await;
                        break;
                    }
                    Some(Ok(_)) => {} // pong, raw frames
                    Some(Err(e)) => {
                        session.handle(TransportEvent::Error(e.to_string())).await;
                        break;
                    }
                    None => {
                        session.handle(TransportEvent::Closed).await;
                        break;
                    }
                }
            }
        }
    }
}

async fn send_client_message(write: &mut WsWriter, msg: &ClientMessage) -> Result<()> {
    let text = encode_client_message(msg)?;
    write.send(Message::Text(text)).await?;
    Ok(())
}
