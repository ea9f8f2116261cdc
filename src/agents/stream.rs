//! Streaming transport for orchestration progress events

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;

use super::domain::StreamEvent;

/// Receiver half of an orchestration event stream
pub struct EventStream {
    receiver: mpsc::Receiver<StreamEvent>,
}

impl EventStream {
    /// Create a channel pair for building an event stream
    pub fn channel(buffer: usize) -> (EventSender, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (EventSender { sender: tx }, Self { receiver: rx })
    }

    /// Drain all remaining events (test helper and non-streaming callers)
    pub async fn collect(mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = self.receiver.recv().await {
            events.push(event);
        }
        events
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

/// Sender half for producing orchestration events.
///
/// A dropped receiver means the caller aborted: sends become no-ops and
/// `is_closed` turns true so the producer can stop early. In-flight LLM
/// calls are not cancelled; their results are simply discarded.
#[derive(Clone)]
pub struct EventSender {
    sender: mpsc::Sender<StreamEvent>,
}

impl EventSender {
    pub async fn send(&self, event: StreamEvent) {
        let _ = self.sender.send(event).await;
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
