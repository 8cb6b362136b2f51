/*
 * Copyright 2024 ArpNetworking
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Item sinks for handing normalized items to the downstream consumer
//!
//! Enqueueing never waits for capacity: a sink that cannot take an item right
//! away hands it back to the caller, which decides whether to drop it.

use crate::error::CollectorError;
use crate::model::Item;
use std::fmt;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Trait for all item sinks
pub trait ItemSink: Send + Sync {
    /// Offer an item without blocking
    fn enqueue(&self, item: Item) -> Result<(), EnqueueError>;

    /// Get the name of this sink
    fn name(&self) -> &str;
}

/// Reason a sink refused an item; the item is returned untouched
#[derive(Debug, Clone, PartialEq)]
pub enum EnqueueError {
    /// The sink is at capacity
    Full(Item),
    /// The consumer has gone away
    Closed(Item),
}

impl EnqueueError {
    /// Take back the rejected item
    pub fn into_item(self) -> Item {
        match self {
            EnqueueError::Full(item) | EnqueueError::Closed(item) => item,
        }
    }
}

impl fmt::Display for EnqueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueError::Full(_) => f.write_str("sink is full"),
            EnqueueError::Closed(_) => f.write_str("sink is closed"),
        }
    }
}

impl std::error::Error for EnqueueError {}

impl From<EnqueueError> for CollectorError {
    fn from(err: EnqueueError) -> Self {
        let reason = err.to_string();
        CollectorError::EnqueueRejected {
            key: err.into_item().key,
            reason,
        }
    }
}

/// Receiving half of a [`ChannelSink`]
pub type ItemReceiver = mpsc::Receiver<Item>;

/// Sink backed by a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::Sender<Item>,
}

impl ChannelSink {
    /// Create a sink holding at most `capacity` undelivered items
    pub fn bounded(capacity: usize) -> (Self, ItemReceiver) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl ItemSink for ChannelSink {
    fn enqueue(&self, item: Item) -> Result<(), EnqueueError> {
        self.sender.try_send(item).map_err(|err| match err {
            TrySendError::Full(item) => EnqueueError::Full(item),
            TrySendError::Closed(item) => EnqueueError::Closed(item),
        })
    }

    fn name(&self) -> &str {
        "channel"
    }
}
