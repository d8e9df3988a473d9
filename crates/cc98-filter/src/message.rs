//! Change broadcast between the settings surface and running engines.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

use crate::entity::{BlockList, BlockedEntity};

const DEFAULT_CAPACITY: usize = 16;

/// A message sent to live filter engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Message {
    /// The block list was saved; carries both lists in full.
    UpdateBlockedData {
        /// All blocked users, enabled or not.
        users: Vec<BlockedEntity>,
        /// All blocked boards, enabled or not.
        boards: Vec<BlockedEntity>,
    },
}

impl Message {
    /// Build an update from a saved list.
    #[must_use]
    pub fn update(list: &BlockList) -> Self {
        Self::UpdateBlockedData {
            users: list.users.clone(),
            boards: list.boards.clone(),
        }
    }

    /// The block list this message carries.
    #[must_use]
    pub fn into_block_list(self) -> BlockList {
        match self {
            Self::UpdateBlockedData { users, boards } => BlockList::new(users, boards),
        }
    }
}

/// Fan-out of [`Message`]s to every subscribed engine.
#[derive(Debug, Clone)]
pub struct Broadcaster {
    sender: broadcast::Sender<Message>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster {
    /// Create a broadcaster that buffers up to `capacity` messages per receiver.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish a message (best effort). Returns the number of receivers reached.
    pub fn publish(&self, message: Message) -> usize {
        match self.sender.send(message) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!("No live engines to notify");
                0
            }
        }
    }

    /// Subscribe a new engine.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
