use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures::stream::StreamExt;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::trace;

/// The slice of a WebSocket the scoring app needs: text frames in, text
/// frames out.
#[async_trait]
pub trait ScorerSocket: Send {
    async fn send_text(&mut self, frame: String) -> Result<(), SocketError>;

    /// Next text frame from the peer; `None` means the peer is gone.
    async fn next_text(&mut self) -> Result<Option<String>, SocketError>;

    async fn close(&mut self) -> Result<(), SocketError>;
}

/// Consumer of inbound frames. A connection is not pinned to a match: the
/// same socket can score one game while watching another, so only the
/// client identity travels with each frame.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle_message(&self, client_id: &str, message: String);
}

#[derive(Debug, Error)]
pub enum SocketError {
    #[error("failed to send frame: {0}")]
    Send(String),
    #[error("failed to read frame: {0}")]
    Receive(String),
}

#[async_trait]
impl ScorerSocket for WebSocket {
    async fn send_text(&mut self, frame: String) -> Result<(), SocketError> {
        self.send(Message::Text(frame))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))
    }

    async fn next_text(&mut self) -> Result<Option<String>, SocketError> {
        loop {
            match self.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // axum answers pings itself; binary frames are not part of
                // the wire protocol
                Some(Ok(_)) => trace!("Ignoring non-text frame"),
                Some(Err(e)) => return Err(SocketError::Receive(e.to_string())),
            }
        }
    }

    async fn close(&mut self) -> Result<(), SocketError> {
        self.send(Message::Close(None))
            .await
            .map_err(|e| SocketError::Send(e.to_string()))
    }
}

/// One upgraded connection: pumps broadcast frames out and scorer frames in
/// until either side hangs up.
pub struct Connection {
    pub client_id: String,
    socket: Box<dyn ScorerSocket>,
    outbound: mpsc::UnboundedReceiver<String>,
    handler: Arc<dyn MessageHandler>,
}

impl Connection {
    pub fn new(
        client_id: String,
        socket: Box<dyn ScorerSocket>,
        outbound: mpsc::UnboundedReceiver<String>,
        handler: Arc<dyn MessageHandler>,
    ) -> Self {
        Self {
            client_id,
            socket,
            outbound,
            handler,
        }
    }

    pub async fn run(mut self) -> Result<(), SocketError> {
        loop {
            tokio::select! {
                outgoing = self.outbound.recv() => {
                    // The connection manager dropped its sender; we are
                    // being disconnected server-side
                    let Some(frame) = outgoing else { break };
                    self.socket.send_text(frame).await?;
                }

                incoming = self.socket.next_text() => {
                    match incoming? {
                        Some(frame) => {
                            self.handler
                                .handle_message(&self.client_id, frame)
                                .await;
                        }
                        None => break,
                    }
                }
            }
        }

        let _ = self.socket.close().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedSocket {
        inbound: Mutex<VecDeque<String>>,
        sent: Arc<Mutex<Vec<String>>>,
        closed: Arc<Mutex<bool>>,
    }

    #[async_trait]
    impl ScorerSocket for ScriptedSocket {
        async fn send_text(&mut self, frame: String) -> Result<(), SocketError> {
            self.sent.lock().unwrap().push(frame);
            Ok(())
        }

        async fn next_text(&mut self) -> Result<Option<String>, SocketError> {
            Ok(self.inbound.lock().unwrap().pop_front())
        }

        async fn close(&mut self) -> Result<(), SocketError> {
            *self.closed.lock().unwrap() = true;
            Ok(())
        }
    }

    struct RecordingHandler {
        frames: Arc<Mutex<Vec<(String, String)>>>,
    }

    #[async_trait]
    impl MessageHandler for RecordingHandler {
        async fn handle_message(&self, client_id: &str, message: String) {
            self.frames
                .lock()
                .unwrap()
                .push((client_id.to_string(), message));
        }
    }

    #[tokio::test]
    async fn test_inbound_frames_reach_the_handler_with_client_identity() {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(Mutex::new(false));

        let socket = ScriptedSocket {
            inbound: Mutex::new(VecDeque::from([
                r#"{"type":"ball-redo"}"#.to_string(),
                r#"{"type":"leave-match"}"#.to_string(),
            ])),
            sent: sent.clone(),
            closed: closed.clone(),
        };
        let (_tx, rx) = mpsc::unbounded_channel();
        let connection = Connection::new(
            "scorer-1".to_string(),
            Box::new(socket),
            rx,
            Arc::new(RecordingHandler {
                frames: frames.clone(),
            }),
        );

        connection.run().await.unwrap();

        let recorded = frames.lock().unwrap();
        assert_eq!(recorded.len(), 2);
        assert!(recorded.iter().all(|(id, _)| id == "scorer-1"));
        assert!(*closed.lock().unwrap());
    }

    #[tokio::test]
    async fn test_connection_stops_when_the_outbound_channel_drops() {
        let socket = ScriptedSocket {
            // A stream of inbound frames that would keep the loop busy
            inbound: Mutex::new(VecDeque::new()),
            sent: Arc::new(Mutex::new(Vec::new())),
            closed: Arc::new(Mutex::new(false)),
        };
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(tx);
        let connection = Connection::new(
            "scorer-1".to_string(),
            Box::new(socket),
            rx,
            Arc::new(RecordingHandler {
                frames: Arc::new(Mutex::new(Vec::new())),
            }),
        );

        connection.run().await.unwrap();
    }
}
