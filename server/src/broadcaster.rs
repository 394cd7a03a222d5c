use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Mutex};

use common::{log, ConnectionId};

/// Sending half of a connection: a bounded frame queue plus a close signal
/// that does not need room in the queue.
#[derive(Clone)]
pub struct ClientHandle {
    frames: mpsc::Sender<String>,
    closed: Arc<watch::Sender<bool>>,
}

/// Receiving half, owned by the connection's writer task.
pub struct ClientEndpoint {
    frames: mpsc::Receiver<String>,
    closed: watch::Receiver<bool>,
}

pub fn client_channel(capacity: usize) -> (ClientHandle, ClientEndpoint) {
    let (frames_tx, frames_rx) = mpsc::channel(capacity);
    let (closed_tx, closed_rx) = watch::channel(false);
    let handle = ClientHandle {
        frames: frames_tx,
        closed: Arc::new(closed_tx),
    };
    let endpoint = ClientEndpoint {
        frames: frames_rx,
        closed: closed_rx,
    };
    (handle, endpoint)
}

impl ClientHandle {
    /// Enqueues without waiting; a full queue is treated like a dead connection.
    pub fn try_send(&self, text: String) -> Result<(), String> {
        if self.is_closed() {
            return Err("connection closed".to_string());
        }
        self.frames.try_send(text).map_err(|e| match e {
            TrySendError::Full(_) => "outbound queue full".to_string(),
            TrySendError::Closed(_) => "connection closed".to_string(),
        })
    }

    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called, immediately if it already was.
    pub async fn closed(&self) {
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }
}

impl ClientEndpoint {
    /// Next frame to write. `None` once the connection is closed, even with
    /// frames still queued, or when every handle is gone.
    pub async fn next_frame(&mut self) -> Option<String> {
        tokio::select! {
            biased;
            _ = wait_closed(&mut self.closed) => None,
            frame = self.frames.recv() => frame,
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    #[cfg(test)]
    pub fn try_next_frame(&mut self) -> Result<String, mpsc::error::TryRecvError> {
        self.frames.try_recv()
    }
}

/// With every handle dropped the signal can no longer fire, so this never
/// resolves and the queue drains until `recv` returns `None`.
async fn wait_closed(closed: &mut watch::Receiver<bool>) {
    if closed.wait_for(|closed| *closed).await.is_err() {
        std::future::pending::<()>().await;
    }
}

/// Outbound side of the session registry: one queue per open connection.
#[derive(Clone)]
pub struct Broadcaster {
    clients: Arc<Mutex<HashMap<ConnectionId, ClientHandle>>>,
}

impl std::fmt::Debug for Broadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broadcaster").finish()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl Broadcaster {
    pub fn new() -> Self {
        Self {
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn register(&self, connection_id: ConnectionId, client: ClientHandle) {
        self.clients.lock().await.insert(connection_id, client);
    }

    /// Removes the connection and signals its writer to close the socket.
    /// Returns false if it was already gone.
    pub async fn unregister(&self, connection_id: &ConnectionId) -> bool {
        let removed = self.clients.lock().await.remove(connection_id);
        match removed {
            Some(client) => {
                client.close();
                true
            }
            None => false,
        }
    }

    pub async fn is_registered(&self, connection_id: &ConnectionId) -> bool {
        self.clients.lock().await.contains_key(connection_id)
    }

    pub async fn connection_count(&self) -> usize {
        self.clients.lock().await.len()
    }

    pub async fn connection_ids(&self) -> Vec<ConnectionId> {
        self.clients.lock().await.keys().copied().collect()
    }

    /// Sends `text` to every connection and returns the ones that failed.
    pub async fn broadcast_to_all(&self, text: &str) -> Vec<ConnectionId> {
        let clients = self.clients.lock().await;
        let mut failed = Vec::new();
        for (connection_id, client) in clients.iter() {
            if let Err(e) = client.try_send(text.to_string()) {
                log!("Failed to broadcast to {}: {}", connection_id, e);
                failed.push(*connection_id);
            }
        }
        failed
    }
}
