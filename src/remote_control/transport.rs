use futures_util::{
    stream::{SplitSink, SplitStream},
    SinkExt, StreamExt,
};
use tokio::{net::TcpStream, sync::mpsc};
use tokio_tungstenite::{tungstenite::Message as TMessage, MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace};

use crate::error::Error;

pub type Writer = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, TMessage>;
pub type Reader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Raw socket events, forwarded in arrival order to whoever owns the
/// connection.
#[derive(Debug)]
pub enum TransportEvent {
    Open,
    Message(String),
    Error(String),
    Closed,
}

/// A single websocket connection. No retries at this layer, a failed or
/// closed socket is reported once and the owner decides what to do.
pub struct Transport {
    write: Writer,
    read_handle: tokio::task::JoinHandle<()>,
    closed: bool,
}

impl Transport {
    /// Opens the socket and forwards everything it produces to `events`.
    pub async fn open(
        url: &str,
        events: mpsc::UnboundedSender<TransportEvent>,
    ) -> Result<Self, Error> {
        debug!(%url, "opening websocket");
        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (write, read) = ws_stream.split();

        let _ = events.send(TransportEvent::Open);
        let read_handle = tokio::spawn(read_loop(read, events));

        Ok(Self {
            write,
            read_handle,
            closed: false,
        })
    }

    /// Sends one already encoded text frame. Dialect framing is the
    /// codec's job, nothing is re-encoded here.
    pub async fn send_text(&mut self, frame: String) -> Result<(), Error> {
        trace!(?frame, "sending");
        self.write.send(TMessage::Text(frame)).await?;
        Ok(())
    }

    /// Closes the socket. Safe to call when already closed.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        if let Err(e) = self.write.close().await {
            trace!(?e, "socket already gone");
        }
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.read_handle.abort();
    }
}

async fn read_loop(mut read: Reader, events: mpsc::UnboundedSender<TransportEvent>) {
    while let Some(message) = read.next().await {
        match message {
            Ok(TMessage::Text(text)) => {
                if events.send(TransportEvent::Message(text)).is_err() {
                    break;
                }
            }
            Ok(TMessage::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                let _ = events.send(TransportEvent::Error(e.to_string()));
                break;
            }
        }
    }

    debug!("websocket reader stopped");
    let _ = events.send(TransportEvent::Closed);
}
