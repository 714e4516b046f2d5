//! Slot tracking on a background task.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::{sync::watch, task::JoinHandle};
use tracing::warn;

use crate::error::Result;
use crate::rpc::Rpc;

/// Default polling interval, roughly one slot.
pub const DEFAULT_SLOT_POLL_INTERVAL: Duration = Duration::from_millis(400);

/// Something that knows the current slot.
#[async_trait]
pub trait SlotSource: Send + Sync {
    async fn current_slot(&self) -> Result<u64>;
}

#[async_trait]
impl SlotSource for Rpc {
    async fn current_slot(&self) -> Result<u64> {
        Ok(self.inner().get_slot().await?)
    }
}

/// Keeps the latest slot of a [`SlotSource`] up to date.
///
/// The slot never moves backwards: stale responses from a lagging node are
/// ignored.
pub struct SlotSubscriber {
    rx: watch::Receiver<u64>,
    handle: JoinHandle<()>,
}

impl SlotSubscriber {
    /// Fetches the first slot, then keeps polling every `interval`.
    pub async fn subscribe(source: Arc<dyn SlotSource>, interval: Duration) -> Result<Self> {
        let initial = source.current_slot().await?;
        let (tx, rx) = watch::channel(initial);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                match source.current_slot().await {
                    Ok(slot) => {
                        tx.send_if_modified(|current| {
                            if slot > *current {
                                *current = slot;
                                true
                            } else {
                                false
                            }
                        });
                    }
                    Err(e) => warn!(%e, "failed to fetch slot"),
                }
                if tx.is_closed() {
                    break;
                }
            }
        });

        Ok(Self { rx, handle })
    }

    pub fn get_slot(&self) -> u64 {
        *self.rx.borrow()
    }

    /// Receiver notified on every slot change.
    pub fn watch(&self) -> watch::Receiver<u64> {
        self.rx.clone()
    }
}

impl Drop for SlotSubscriber {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
