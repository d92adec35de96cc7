// Backpressure (spec §5 "Backpressure"): a bounded queue with a
// high-water mark. Above the mark, low-value event kinds are shed
// first; post/video and settlement events are never shed. Shedding is
// reported to callers as a rate-limit response.

use reward_common::{error::EngineError, model::ActivityKind, time::TimestampSeconds};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Kinds that may be shed once the queue is above its high-water mark.
/// Everything else (post, video, and — conceptually — settlement
/// events, which never flow through this ingestion queue at all) is
/// always accepted.
fn is_low_value(kind: ActivityKind) -> bool {
    matches!(kind, ActivityKind::Like | ActivityKind::Follow)
}

pub fn should_shed(kind: ActivityKind, queue_depth: usize, high_water: usize) -> bool {
    queue_depth >= high_water && is_low_value(kind)
}

pub struct IngestionQueue<T> {
    sender: mpsc::Sender<T>,
    depth: Arc<AtomicUsize>,
    high_water: usize,
}

pub struct IngestionReceiver<T> {
    receiver: mpsc::Receiver<T>,
    depth: Arc<AtomicUsize>,
}

impl<T> IngestionQueue<T> {
    pub fn bounded(capacity: usize, high_water: usize) -> (Self, IngestionReceiver<T>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let depth = Arc::new(AtomicUsize::new(0));
        (
            IngestionQueue {
                sender,
                depth: depth.clone(),
                high_water,
            },
            IngestionReceiver { receiver, depth },
        )
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    /// Attempt to enqueue `item` associated with `kind`. Returns
    /// `RateLimited` (shed) if the queue is saturated and the kind is
    /// low-value; otherwise pushes and returns `Ok(())`.
    pub async fn push(
        &self,
        kind: ActivityKind,
        item: T,
        now: TimestampSeconds,
    ) -> Result<(), EngineError> {
        if should_shed(kind, self.depth(), self.high_water) {
            return Err(EngineError::RateLimited { reset_at: now + 1 });
        }
        self.depth.fetch_add(1, Ordering::Relaxed);
        if self.sender.send(item).await.is_err() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
            return Err(EngineError::TransientFailure {
                reason: "ingestion queue closed".to_string(),
            });
        }
        Ok(())
    }
}

impl<T> IngestionReceiver<T> {
    pub async fn recv(&mut self) -> Option<T> {
        let item = self.receiver.recv().await;
        if item.is_some() {
            self.depth.fetch_sub(1, Ordering::Relaxed);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_value_kinds_are_shed_above_high_water() {
        assert!(should_shed(ActivityKind::Like, 10, 10));
        assert!(!should_shed(ActivityKind::Like, 9, 10));
    }

    #[test]
    fn post_and_video_are_never_shed() {
        assert!(!should_shed(ActivityKind::Post, 1_000_000, 1));
        assert!(!should_shed(ActivityKind::Video, 1_000_000, 1));
    }

    #[tokio::test]
    async fn push_and_recv_round_trip() {
        let (queue, mut rx) = IngestionQueue::bounded(8, 100);
        queue.push(ActivityKind::Post, 42, 0).await.unwrap();
        assert_eq!(queue.depth(), 1);
        let got = rx.recv().await;
        assert_eq!(got, Some(42));
        assert_eq!(queue.depth(), 0);
    }

    #[tokio::test]
    async fn sheds_low_value_when_saturated() {
        let (queue, _rx) = IngestionQueue::bounded(8, 1);
        queue.push(ActivityKind::Like, 1, 0).await.unwrap();
        let result = queue.push(ActivityKind::Like, 2, 0).await;
        assert!(matches!(result, Err(EngineError::RateLimited { .. })));
    }
}
