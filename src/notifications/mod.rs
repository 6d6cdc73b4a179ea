//! In-app notification toasts
//!
//! Newest first, capped at [`MAX_NOTIFICATIONS`]. Each entry expires on its
//! own: errors and warnings after 10 seconds, everything else after 5.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const MAX_NOTIFICATIONS: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    /// How long a notification of this kind stays visible
    pub fn lifetime(self) -> Duration {
        match self {
            NotificationKind::Error | NotificationKind::Warning => Duration::from_secs(10),
            NotificationKind::Success | NotificationKind::Info => Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    created: Instant,
}

impl Notification {
    pub fn expires_at(&self) -> Instant {
        self.created + self.kind.lifetime()
    }
}

#[derive(Debug, Default)]
pub struct NotificationQueue {
    items: VecDeque<Notification>,
    next_id: u64,
}

impl NotificationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NotificationKind, title: impl Into<String>, message: impl Into<String>) -> u64 {
        self.push_at(kind, title, message, Instant::now())
    }

    pub fn push_at(
        &mut self,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        now: Instant,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        self.items.push_front(Notification {
            id,
            kind,
            title: title.into(),
            message: message.into(),
            timestamp: Utc::now(),
            created: now,
        });
        self.items.truncate(MAX_NOTIFICATIONS);
        id
    }

    pub fn remove(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Drop every notification whose lifetime has passed. Returns how many went.
    pub fn prune(&mut self, now: Instant) -> usize {
        let before = self.items.len();
        self.items.retain(|n| n.expires_at() > now);
        before - self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Mirror a notification to the desktop notification daemon
pub fn send_desktop(summary: &str, body: &str) -> Result<()> {
    notify_rust::Notification::new()
        .summary(summary)
        .body(body)
        .appname("sentinel-dash")
        .show()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_ten_newest_first() {
        let mut queue = NotificationQueue::new();
        let now = Instant::now();
        for i in 0..15 {
            queue.push_at(NotificationKind::Info, format!("n{}", i), "", now);
        }

        assert_eq!(queue.len(), MAX_NOTIFICATIONS);
        let titles: Vec<&str> = queue.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles.first(), Some(&"n14"));
        assert_eq!(titles.last(), Some(&"n5"));
    }

    #[test]
    fn test_lifetimes_by_kind() {
        let mut queue = NotificationQueue::new();
        let start = Instant::now();
        queue.push_at(NotificationKind::Error, "feed", "connection lost", start);
        queue.push_at(NotificationKind::Success, "saved", "export written", start);

        assert_eq!(queue.prune(start + Duration::from_millis(4_900)), 0);
        assert_eq!(queue.prune(start + Duration::from_secs(5)), 1);
        let remaining: Vec<NotificationKind> = queue.iter().map(|n| n.kind).collect();
        assert_eq!(remaining, vec![NotificationKind::Error]);

        assert_eq!(queue.prune(start + Duration::from_millis(9_900)), 0);
        assert_eq!(queue.prune(start + Duration::from_secs(10)), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_warning_and_info_lifetimes() {
        assert_eq!(NotificationKind::Warning.lifetime(), Duration::from_secs(10));
        assert_eq!(NotificationKind::Info.lifetime(), Duration::from_secs(5));
    }

    #[test]
    fn test_remove_and_clear() {
        let mut queue = NotificationQueue::new();
        let a = queue.push(NotificationKind::Info, "a", "");
        let b = queue.push(NotificationKind::Warning, "b", "");
        assert_ne!(a, b);

        assert!(queue.remove(a));
        assert!(!queue.remove(a));
        assert_eq!(queue.len(), 1);

        queue.clear();
        assert!(queue.is_empty());
    }
}
