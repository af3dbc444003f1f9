//! Connection handle and related types

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Payload pushed to a connection's writer task.
///
/// Framing on the wire is owned by the networking layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

impl Frame {
    pub fn len(&self) -> usize {
        match self {
            Frame::Text(text) => text.len(),
            Frame::Binary(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<String> for Frame {
    fn from(text: String) -> Self {
        Frame::Text(text)
    }
}

impl From<&str> for Frame {
    fn from(text: &str) -> Self {
        Frame::Text(text.to_string())
    }
}

impl From<Vec<u8>> for Frame {
    fn from(bytes: Vec<u8>) -> Self {
        Frame::Binary(bytes)
    }
}

/// Handle for a single live connection.
///
/// The registry stores and hands these out but never sends on them and never
/// closes them; the receiving half belongs to the connection's writer task.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub id: Uuid,
    pub connected_at: DateTime<Utc>,
    /// Peer address label, for diagnostics only
    pub peer: Option<String>,
    sender: mpsc::Sender<Frame>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<Frame>) -> Self {
        Self::with_id(Uuid::new_v4(), sender)
    }

    pub fn with_id(id: Uuid, sender: mpsc::Sender<Frame>) -> Self {
        Self {
            id,
            connected_at: Utc::now(),
            peer: None,
            sender,
        }
    }

    pub fn with_peer(mut self, peer: impl Into<String>) -> Self {
        self.peer = Some(peer.into());
        self
    }

    /// Queue a frame for the writer task
    pub async fn send(&self, frame: Frame) -> Result<(), mpsc::error::SendError<Frame>> {
        self.sender.send(frame).await
    }

    /// Whether the writer task has dropped its receiver
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_len() {
        assert_eq!(Frame::from("hello").len(), 5);
        assert_eq!(Frame::from(vec![1u8, 2, 3]).len(), 3);
        assert!(Frame::Text(String::new()).is_empty());
    }

    #[tokio::test]
    async fn test_handle_send_and_close() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx).with_peer("10.0.0.7:51234");

        handle.send(Frame::from("ping")).await.unwrap();
        assert_eq!(rx.recv().await, Some(Frame::Text("ping".to_string())));
        assert_eq!(handle.peer.as_deref(), Some("10.0.0.7:51234"));

        drop(rx);
        assert!(handle.is_closed());
        assert!(handle.send(Frame::from("late")).await.is_err());
    }
}
