//! Event bus for list and application progress
//!
//! Lists and services publish what they are doing on a
//! `tokio::sync::broadcast` channel so any number of front ends can re-render
//! from it. Emitting never blocks; with no subscribers events are dropped,
//! and a lagging subscriber misses the oldest events.
//!
//! # Example
//!
//! ```
//! use libfundi::service::events::{Event, EventBus};
//!
//! # async fn example() {
//! let bus = EventBus::new(100);
//! let mut receiver = bus.subscribe();
//!
//! bus.emit(Event::ListLoading {
//!     list: "jobs".to_string(),
//!     page: 1,
//!     refresh: true,
//! });
//!
//! if let Ok(event) = receiver.recv().await {
//!     println!("Received: {:?}", event);
//! }
//! # }
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{ApplicationStatus, JobStatus, RecordId};

pub type EventReceiver = broadcast::Receiver<Event>;

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    /// `capacity` is the per-subscriber buffer before old events are dropped
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: Event) {
        // Err only means nobody is listening
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A list request was issued
    ListLoading {
        list: String,
        page: u32,
        refresh: bool,
    },

    /// A list request succeeded and the list was updated
    ListLoaded {
        list: String,
        page: u32,
        total_pages: u32,
        /// Records held by the list after the update
        items: usize,
    },

    /// A list request failed; `message` is user-facing
    ListFailed {
        list: String,
        page: u32,
        message: String,
    },

    ApplicationSubmitted {
        job_id: RecordId,
        application_id: RecordId,
    },

    ApplicationDecided {
        application_id: RecordId,
        status: ApplicationStatus,
    },

    JobStatusChanged {
        job_id: RecordId,
        status: JobStatus,
    },
}
