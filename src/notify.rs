//! 사용자 알림 채널
//!
//! 알림을 보내는 쪽은 `Notifier` 를 주입받고, UI 는 `NotificationCenter` 로
//! 매 프레임 수신 및 만료 처리를 한다.

use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use tracing::debug;

/// 알림 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
    Info,
    /// 작업 진행 중. 다음 알림이 올 때까지 유지된다
    Processing,
}

/// 알림 하나
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// `None` 이면 자동으로 사라지지 않는다
    pub duration: Option<Duration>,
}

impl Notification {
    pub fn success(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Success, title, message, Some(Duration::from_secs(3)))
    }

    pub fn error(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Error, title, message, Some(Duration::from_secs(8)))
    }

    pub fn info(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Info, title, message, Some(Duration::from_secs(3)))
    }

    pub fn processing(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationKind::Processing, title, message, None)
    }

    fn new(
        kind: NotificationKind,
        title: &str,
        message: impl Into<String>,
        duration: Option<Duration>,
    ) -> Self {
        Self {
            kind,
            title: title.to_string(),
            message: message.into(),
            duration,
        }
    }
}

/// 알림 송신 핸들
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<Notification>,
}

impl Notifier {
    /// 수신 측이 사라졌으면 조용히 버린다
    pub fn notify(&self, notification: Notification) {
        if self.tx.send(notification).is_err() {
            debug!("notification dropped: receiver closed");
        }
    }
}

#[derive(Debug)]
struct ActiveNotification {
    id: u64,
    notification: Notification,
    shown_at: Instant,
}

/// 표시 중인 알림 목록
#[derive(Debug)]
pub struct NotificationCenter {
    rx: Receiver<Notification>,
    active: Vec<ActiveNotification>,
    next_id: u64,
}

impl NotificationCenter {
    pub fn new() -> (Self, Notifier) {
        let (tx, rx) = mpsc::channel();
        let center = Self {
            rx,
            active: Vec::new(),
            next_id: 0,
        };
        (center, Notifier { tx })
    }

    /// 새 알림을 받고 만료된 알림을 제거한다
    pub fn poll(&mut self, now: Instant) {
        while let Ok(notification) = self.rx.try_recv() {
            // 새 알림이 오면 진행 중 알림은 끝난 것으로 본다
            self.active
                .retain(|a| a.notification.kind != NotificationKind::Processing);
            self.active.push(ActiveNotification {
                id: self.next_id,
                notification,
                shown_at: now,
            });
            self.next_id += 1;
        }
        self.active.retain(|a| match a.notification.duration {
            Some(d) => now.duration_since(a.shown_at) < d,
            None => true,
        });
    }

    pub fn dismiss(&mut self, id: u64) {
        self.active.retain(|a| a.id != id);
    }

    /// (id, 알림) 목록. 오래된 것부터
    pub fn active(&self) -> impl Iterator<Item = (u64, &Notification)> {
        self.active.iter().map(|a| (a.id, &a.notification))
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notifications_expire_after_their_duration() {
        let (mut center, notifier) = NotificationCenter::new();
        let t0 = Instant::now();
        notifier.notify(Notification::success("Done", "Found 3 objects"));
        center.poll(t0);
        assert_eq!(center.active().count(), 1);

        center.poll(t0 + Duration::from_secs(2));
        assert_eq!(center.active().count(), 1);

        center.poll(t0 + Duration::from_secs(3));
        assert!(center.is_empty());
    }

    #[test]
    fn processing_is_replaced_by_the_next_notification() {
        let (mut center, notifier) = NotificationCenter::new();
        let t0 = Instant::now();
        notifier.notify(Notification::processing("Processing", "Analyzing image..."));
        center.poll(t0);
        center.poll(t0 + Duration::from_secs(600));
        assert_eq!(center.active().count(), 1);

        notifier.notify(Notification::error("Failed", "Server error"));
        center.poll(t0 + Duration::from_secs(601));
        let kinds: Vec<_> = center.active().map(|(_, n)| n.kind).collect();
        assert_eq!(kinds, vec![NotificationKind::Error]);
    }

    #[test]
    fn notifier_works_across_threads_and_dismiss() {
        let (mut center, notifier) = NotificationCenter::new();
        let worker = notifier.clone();
        std::thread::spawn(move || worker.notify(Notification::info("Info", "hello")))
            .join()
            .unwrap();
        center.poll(Instant::now());
        let (id, n) = center.active().next().map(|(id, n)| (id, n.clone())).unwrap();
        assert_eq!(n.title, "Info");
        center.dismiss(id);
        assert!(center.is_empty());
    }

    #[test]
    fn sending_after_center_is_dropped_does_not_panic() {
        let (center, notifier) = NotificationCenter::new();
        drop(center);
        notifier.notify(Notification::info("late", "ignored"));
    }
}
