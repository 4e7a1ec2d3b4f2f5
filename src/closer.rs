// src/closer.rs
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serenity::all::ChannelId;
use tokio::task::JoinHandle;

struct Pending {
    token: u64,
    // None while the slot is claimed but the timer is not running yet
    handle: Option<JoinHandle<()>>,
}

/// Proof that a channel's close slot was claimed. Hand it back to `arm` or `release`.
#[derive(Debug, PartialEq, Eq)]
pub struct CloseClaim {
    channel: ChannelId,
    token: u64,
}

/// Delayed channel deletions, one per channel.
///
/// Nothing survives a restart: a pending close that never fired is simply gone.
pub struct CloseScheduler {
    delay: Duration,
    pending: Arc<DashMap<ChannelId, Pending>>,
    next_token: AtomicU64,
}

impl CloseScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(DashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reserves the channel. `None` when a close is already claimed or running.
    pub fn claim(&self, channel: ChannelId) -> Option<CloseClaim> {
        match self.pending.entry(channel) {
            Entry::Occupied(_) => None,
            Entry::Vacant(v) => {
                let token = self.next_token.fetch_add(1, Ordering::Relaxed);
                v.insert(Pending { token, handle: None });
                Some(CloseClaim { channel, token })
            }
        }
    }

    /// Gives a claimed slot back without deleting anything.
    pub fn release(&self, claim: CloseClaim) {
        self.pending
            .remove_if(&claim.channel, |_, p| p.token == claim.token);
    }

    /// Starts the timer for a claim. `false` (and `delete` dropped) when the
    /// claim was cancelled in the meantime.
    pub fn arm<F>(&self, claim: CloseClaim, delete: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let CloseClaim { channel, token } = claim;

        let Some(mut slot) = self.pending.get_mut(&channel) else {
            return false;
        };
        if slot.token != token {
            return false;
        }

        let delay = self.delay;
        let pending = self.pending.clone();

        // spawned while the shard guard is held; the task only touches the map after `delay`
        slot.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // out of the map first, so a failed delete can be retried with a new close
            pending.remove_if(&channel, |_, p| p.token == token);
            match delete.await {
                Ok(()) => tracing::info!(channel = channel.get(), "ticket channel deleted"),
                Err(e) => tracing::warn!(error=?e, channel = channel.get(), "ticket channel delete failed"),
            }
        }));
        true
    }

    /// Claims and arms in one go. Returns `false` (and drops `delete`) when
    /// this channel already has a close pending.
    pub fn schedule<F>(&self, channel: ChannelId, delete: F) -> bool
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        match self.claim(channel) {
            Some(claim) => self.arm(claim, delete),
            None => false,
        }
    }

    /// Aborts a pending close. `false` when nothing was scheduled.
    pub fn cancel(&self, channel: ChannelId) -> bool {
        match self.pending.remove(&channel) {
            Some((_, p)) => {
                if let Some(handle) = p.handle {
                    handle.abort();
                }
                tracing::info!(channel = channel.get(), "pending ticket close cancelled");
                true
            }
            None => false,
        }
    }

    /// Aborts everything still waiting; returns how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let channels: Vec<ChannelId> = self.pending.iter().map(|e| *e.key()).collect();
        channels.into_iter().filter(|c| self.cancel(*c)).count()
    }

    pub fn is_pending(&self, channel: ChannelId) -> bool {
        self.pending.contains_key(&channel)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
