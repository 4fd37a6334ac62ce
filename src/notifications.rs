// src/notifications.rs
//! Fire-and-forget progress events. Producers never wait on subscribers;
//! the SSE route filters the shared stream down to the caller's user id.

use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ParseStarted,
    ParseFinished,
    MatchFinished,
    BulkMatchProgress,
    BulkMatchFinished,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ParseStarted => "parse_started",
            EventKind::ParseFinished => "parse_finished",
            EventKind::MatchFinished => "match_finished",
            EventKind::BulkMatchProgress => "bulk_match_progress",
            EventKind::BulkMatchFinished => "bulk_match_finished",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Notification {
    pub user_id: i64,
    pub event: EventKind,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Best effort: with no subscriber the event is dropped.
    pub fn emit(&self, user_id: i64, event: EventKind, payload: Value) {
        let delivered = self
            .sender
            .send(Notification {
                user_id,
                event,
                payload,
            })
            .unwrap_or(0);
        debug!(
            "Emitted {} for user {} to {} subscriber(s)",
            event.as_str(),
            user_id,
            delivered
        );
    }

    pub fn parse_started(&self, user_id: i64, job_url: &str) {
        self.emit(
            user_id,
            EventKind::ParseStarted,
            json!({
                "user_id": user_id,
                "job_url": job_url,
                "status": "started",
                "message": "Starting to parse job posting...",
            }),
        );
    }

    pub fn parse_finished(&self, user_id: i64, outcome: Result<Value, String>) {
        let payload = match outcome {
            Ok(job_data) => json!({
                "user_id": user_id,
                "success": true,
                "message": "Job parsing completed successfully!",
                "job_data": job_data,
            }),
            Err(error) => json!({
                "user_id": user_id,
                "success": false,
                "message": format!("Job parsing failed: {}", error),
                "job_data": null,
            }),
        };
        self.emit(user_id, EventKind::ParseFinished, payload);
    }

    pub fn match_finished(&self, user_id: i64, outcome: Result<Value, String>) {
        let payload = match outcome {
            Ok(match_result) => json!({
                "user_id": user_id,
                "success": true,
                "message": "Resume matching completed successfully!",
                "match_result": match_result,
            }),
            Err(error) => json!({
                "user_id": user_id,
                "success": false,
                "message": format!("Resume matching failed: {}", error),
                "match_result": null,
            }),
        };
        self.emit(user_id, EventKind::MatchFinished, payload);
    }

    pub fn bulk_match_progress(&self, user_id: i64, current: usize, total: usize, resume_name: &str) {
        self.emit(
            user_id,
            EventKind::BulkMatchProgress,
            json!({
                "user_id": user_id,
                "current": current,
                "total": total,
                "resume_name": resume_name,
                "message": format!("Matching resume {} of {}...", current, total),
            }),
        );
    }

    pub fn bulk_match_finished(&self, user_id: i64, outcome: Result<Value, String>) {
        let payload = match outcome {
            Ok(results) => {
                let count = results.as_array().map(Vec::len).unwrap_or(0);
                json!({
                    "user_id": user_id,
                    "success": true,
                    "message": format!("Successfully matched {} resumes!", count),
                    "results": results,
                })
            }
            Err(error) => json!({
                "user_id": user_id,
                "success": false,
                "message": format!("Bulk matching failed: {}", error),
            }),
        };
        self.emit(user_id, EventKind::BulkMatchFinished, payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let notifier = Notifier::new(4);
        notifier.parse_started(1, "https://jobs.example.com/1");
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.parse_started(7, "https://jobs.example.com/1");
        notifier.parse_finished(7, Err("HTTP error: 404 Not Found".to_string()));

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event, EventKind::ParseStarted);
        assert_eq!(first.user_id, 7);
        assert_eq!(first.payload["status"], "started");
        assert_eq!(first.payload["job_url"], "https://jobs.example.com/1");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.event.as_str(), "parse_finished");
        assert_eq!(second.payload["success"], false);
        assert!(second.payload["job_data"].is_null());
        assert_eq!(
            second.payload["message"],
            "Job parsing failed: HTTP error: 404 Not Found"
        );
    }

    #[tokio::test]
    async fn test_bulk_payloads() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        notifier.bulk_match_progress(3, 2, 5, "cv.pdf");
        notifier.bulk_match_finished(3, Ok(json!([{"resume_id": 1}, {"resume_id": 2}])));

        let progress = rx.recv().await.unwrap();
        assert_eq!(progress.payload["current"], 2);
        assert_eq!(progress.payload["total"], 5);
        assert_eq!(progress.payload["message"], "Matching resume 2 of 5...");

        let finished = rx.recv().await.unwrap();
        assert_eq!(finished.event, EventKind::BulkMatchFinished);
        assert_eq!(finished.payload["message"], "Successfully matched 2 resumes!");
    }

    #[test]
    fn test_event_kind_serializes_as_name() {
        for kind in [
            EventKind::ParseStarted,
            EventKind::ParseFinished,
            EventKind::MatchFinished,
            EventKind::BulkMatchProgress,
            EventKind::BulkMatchFinished,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), kind.as_str());
        }
    }
}
