//! Authoritative record of the caller-intended subscription state.
//!
//! The tracker survives origin swaps: whatever the caller has cumulatively
//! asked for through subscribe/unsubscribe is what gets replayed onto every
//! newly connected transport client. The intent is owned by the supervisor
//! task, so all mutation and every snapshot-for-replay is serialized on its
//! command queue.

use std::collections::BTreeSet;

/// Cumulative subscription intent: the net channel set plus the presence flag.
#[derive(Clone, Debug, Default)]
pub struct SubscriptionIntent {
    channels: BTreeSet<String>,
    presence: bool,
}

/// Point-in-time copy of the intent, taken for replay onto a fresh client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntentSnapshot {
    /// Channels the caller currently wants, sorted and deduplicated.
    pub channels: Vec<String>,
    /// Whether presence events are wanted for those channels.
    pub presence: bool,
}

impl IntentSnapshot {
    /// True when there is nothing to replay.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }
}

impl SubscriptionIntent {
    /// Record the caller's wish to be subscribed to `channels`.
    ///
    /// Idempotent: channels already present are skipped. Returns the channels
    /// that were actually added, i.e. the delta to apply to a live client.
    /// Subscribing with `presence` turns the presence flag on.
    pub fn add_channels<I>(&mut self, channels: I, presence: bool) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut added = Vec::new();
        for channel in channels {
            if self.channels.insert(channel.clone()) {
                added.push(channel);
            }
        }
        if presence && !self.channels.is_empty() {
            self.presence = true;
        }
        added
    }

    /// Record the caller's wish to be unsubscribed from `channels`.
    ///
    /// Idempotent: channels that were never subscribed are skipped. Returns
    /// the channels actually removed. Presence interest ends when an
    /// unsubscribe carrying the presence flag empties the channel set.
    pub fn remove_channels<I>(&mut self, channels: I, presence: bool) -> Vec<String>
    where
        I: IntoIterator<Item = String>,
    {
        let mut removed = Vec::new();
        for channel in channels {
            if self.channels.remove(&channel) {
                removed.push(channel);
            }
        }
        if presence && self.channels.is_empty() {
            self.presence = false;
        }
        removed
    }

    /// The current presence flag.
    pub fn presence(&self) -> bool {
        self.presence
    }

    /// True when no channels are wanted.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Take an atomic copy of the intent for replay.
    pub fn snapshot(&self) -> IntentSnapshot {
        IntentSnapshot {
            channels: self.channels.iter().cloned().collect(),
            presence: self.presence,
        }
    }
}
