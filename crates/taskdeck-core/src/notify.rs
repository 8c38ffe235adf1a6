//! Transient user-facing notices.
//!
//! Notices are fire-and-forget: the center never reports failure back to
//! the caller, and losing one is a UX gap rather than a correctness bug.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    /// `None` keeps the notice until the view dismisses it.
    pub duration: Option<Duration>,
}

impl Notice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            duration: None,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeId(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveNotice {
    pub id: NoticeId,
    pub notice: Notice,
    pub posted_at: Instant,
    pub expires_at: Option<Instant>,
}

impl LiveNotice {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Sink the controllers report outcomes into.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

#[derive(Debug)]
struct Inner {
    next_id: u64,
    live: VecDeque<LiveNotice>,
    max_visible: usize,
}

#[derive(Debug)]
pub struct NotificationCenter {
    inner: Mutex<Inner>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(5)
    }
}

impl NotificationCenter {
    pub fn new(max_visible: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                live: VecDeque::new(),
                max_visible: max_visible.max(1),
            }),
        }
    }

    pub fn post(&self, notice: Notice) -> NoticeId {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let id = NoticeId(inner.next_id);
        inner.next_id += 1;

        debug!(id = id.0, kind = ?notice.kind, message = %notice.message, "notice posted");
        let expires_at = notice.duration.map(|d| now + d);
        inner.live.push_back(LiveNotice {
            id,
            notice,
            posted_at: now,
            expires_at,
        });

        if inner.live.len() > inner.max_visible {
            inner.live.retain(|n| !n.is_expired(now));
        }
        while inner.live.len() > inner.max_visible {
            // Sticky notices wait for a dismissal, and the one just posted
            // always shows, so only older timed notices can make room.
            let newest = inner.live.len() - 1;
            let Some(pos) = inner
                .live
                .iter()
                .take(newest)
                .position(|n| n.expires_at.is_some())
            else {
                break;
            };
            if let Some(dropped) = inner.live.remove(pos) {
                trace!(id = dropped.id.0, "dropping oldest timed notice over capacity");
            }
        }
        id
    }

    /// Manual dismissal. Returns whether the notice was still live.
    pub fn dismiss(&self, id: NoticeId) -> bool {
        let mut inner = self.inner.lock();
        let before = inner.live.len();
        inner.live.retain(|n| n.id != id);
        before != inner.live.len()
    }

    pub fn prune_expired(&self, now: Instant) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.live.len();
        inner.live.retain(|n| !n.is_expired(now));
        let removed = before - inner.live.len();
        if removed > 0 {
            trace!(removed, "expired notices pruned");
        }
        removed
    }

    /// Live notices in enqueue order, hiding any that have timed out.
    pub fn visible(&self, now: Instant) -> Vec<LiveNotice> {
        self.inner
            .lock()
            .live
            .iter()
            .filter(|n| !n.is_expired(now))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prunes on a fixed period until the handle is aborted.
    pub fn spawn_expiry(center: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                center.prune_expired(Instant::now());
            }
        })
    }
}

impl Notifier for NotificationCenter {
    fn notify(&self, notice: Notice) {
        self.post(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn timed_notice_expires_and_sticky_one_stays() {
        let center = NotificationCenter::new(5);
        center.post(Notice::success("saved").with_duration(Duration::from_millis(3000)));
        let sticky = center.post(Notice::error("boom"));

        tokio::time::advance(Duration::from_millis(2999)).await;
        assert_eq!(center.visible(Instant::now()).len(), 2);

        tokio::time::advance(Duration::from_millis(1)).await;
        let visible = center.visible(Instant::now());
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, sticky);

        assert_eq!(center.prune_expired(Instant::now()), 1);
        assert!(center.dismiss(sticky));
        assert!(!center.dismiss(sticky));
        assert!(center.is_empty());
    }

    fn timed(message: &str) -> Notice {
        Notice::success(message).with_duration(Duration::from_millis(3000))
    }

    #[test]
    fn capacity_drops_oldest_timed_and_keeps_order() {
        let center = NotificationCenter::new(2);
        center.post(timed("one"));
        center.post(timed("two"));
        center.post(timed("three"));

        let messages: Vec<String> = center
            .visible(Instant::now())
            .into_iter()
            .map(|n| n.notice.message)
            .collect();
        assert_eq!(messages, vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn capacity_never_evicts_undismissed_errors() {
        let center = NotificationCenter::new(5);
        let load_error = center.post(Notice::error("Failed to load tasks"));
        for i in 0..5 {
            center.post(timed(&format!("saved {i}")));
        }

        let visible = center.visible(Instant::now());
        assert_eq!(visible.len(), 5);
        assert_eq!(visible[0].id, load_error);
        assert_eq!(visible[1].notice.message, "saved 1");
        assert_eq!(visible[4].notice.message, "saved 4");
    }

    #[test]
    fn sticky_notices_may_exceed_capacity() {
        let center = NotificationCenter::new(2);
        let first = center.post(Notice::error("Failed to update task"));
        let second = center.post(Notice::error("Failed to delete task"));
        let latest = center.post(timed("Task created successfully!"));

        let ids: Vec<NoticeId> = center
            .visible(Instant::now())
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![first, second, latest]);

        center.dismiss(first);
        center.post(timed("Task updated successfully"));
        let messages: Vec<String> = center
            .visible(Instant::now())
            .into_iter()
            .map(|n| n.notice.message)
            .collect();
        assert_eq!(
            messages,
            vec![
                "Failed to delete task".to_string(),
                "Task updated successfully".to_string()
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn expired_notices_make_room_first() {
        let center = NotificationCenter::new(2);
        center.post(Notice::info("Task deleted").with_duration(Duration::from_millis(300)));
        let kept = center.post(timed("Task created successfully!"));
        tokio::time::advance(Duration::from_millis(300)).await;
        let newest = center.post(timed("Task updated successfully"));

        let ids: Vec<NoticeId> = center
            .visible(Instant::now())
            .into_iter()
            .map(|n| n.id)
            .collect();
        assert_eq!(ids, vec![kept, newest]);
    }

    #[test]
    fn duplicates_are_not_merged() {
        let center = NotificationCenter::default();
        let a = center.post(Notice::error("Failed to update task"));
        let b = center.post(Notice::error("Failed to update task"));
        assert_ne!(a, b);
        assert_eq!(center.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn expiry_task_prunes_in_background() {
        let center = Arc::new(NotificationCenter::default());
        center.post(Notice::info("Task deleted").with_duration(Duration::from_millis(300)));
        let handle = NotificationCenter::spawn_expiry(center.clone(), Duration::from_millis(100));

        tokio::time::sleep(Duration::from_millis(450)).await;
        assert!(center.is_empty());
        handle.abort();
    }
}
