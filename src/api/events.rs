//! Domain events and the broadcast channel behind the SSE endpoint

use crate::access::Actor;
use crate::types::{CourseId, LessonId, Role, SubmissionId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::sync::broadcast;

/// Event type discriminant
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventType {
    /// User enrolled in a course
    EnrollmentCreated {
        user_id: UserId,
        course_id: CourseId,
        timestamp: DateTime<Utc>,
    },
    /// Lesson completed for the first time
    LessonCompleted {
        user_id: UserId,
        course_id: CourseId,
        lesson_id: LessonId,
        progress: u8,
        timestamp: DateTime<Utc>,
    },
    /// Enrollment reached 100%
    CourseCompleted {
        user_id: UserId,
        course_id: CourseId,
        timestamp: DateTime<Utc>,
    },
    /// Course opened for enrollment
    CoursePublished {
        course_id: CourseId,
        title: String,
        timestamp: DateTime<Utc>,
    },
    /// Assignment submission received
    SubmissionReceived {
        submission_id: SubmissionId,
        lesson_id: LessonId,
        course_id: CourseId,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },
    /// Submission graded or regraded
    SubmissionGraded {
        submission_id: SubmissionId,
        course_id: CourseId,
        user_id: UserId,
        score: u32,
        max_points: u32,
        timestamp: DateTime<Utc>,
    },
    /// Quiz attempt scored
    QuizAttempted {
        lesson_id: LessonId,
        course_id: CourseId,
        user_id: UserId,
        score: u8,
        passed: bool,
        timestamp: DateTime<Utc>,
    },
    /// Points added to the ledger
    PointsAwarded {
        user_id: UserId,
        course_id: CourseId,
        points: u32,
        reason: String,
        timestamp: DateTime<Utc>,
    },
    /// Session started
    SessionStarted {
        #[serde(default)]
        instance_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
    /// Heartbeat (published periodically)
    Heartbeat {
        #[serde(default)]
        instance_id: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

/// Event wrapper with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Event ID (for deduplication)
    pub id: String,
    /// Server instance that emitted the event
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub instance_id: Option<String>,
    /// Event payload
    #[serde(flatten)]
    pub event_type: EventType,
}

impl Event {
    /// Create new event
    pub fn new(event_type: EventType) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: None,
            event_type,
        }
    }

    pub fn enrollment_created(user_id: UserId, course_id: CourseId) -> Self {
        Self::new(EventType::EnrollmentCreated {
            user_id,
            course_id,
            timestamp: Utc::now(),
        })
    }

    pub fn lesson_completed(
        user_id: UserId,
        course_id: CourseId,
        lesson_id: LessonId,
        progress: u8,
    ) -> Self {
        Self::new(EventType::LessonCompleted {
            user_id,
            course_id,
            lesson_id,
            progress,
            timestamp: Utc::now(),
        })
    }

    pub fn course_completed(user_id: UserId, course_id: CourseId) -> Self {
        Self::new(EventType::CourseCompleted {
            user_id,
            course_id,
            timestamp: Utc::now(),
        })
    }

    pub fn course_published(course_id: CourseId, title: String) -> Self {
        Self::new(EventType::CoursePublished {
            course_id,
            title,
            timestamp: Utc::now(),
        })
    }

    pub fn submission_received(
        submission_id: SubmissionId,
        lesson_id: LessonId,
        course_id: CourseId,
        user_id: UserId,
    ) -> Self {
        Self::new(EventType::SubmissionReceived {
            submission_id,
            lesson_id,
            course_id,
            user_id,
            timestamp: Utc::now(),
        })
    }

    pub fn submission_graded(
        submission_id: SubmissionId,
        course_id: CourseId,
        user_id: UserId,
        score: u32,
        max_points: u32,
    ) -> Self {
        Self::new(EventType::SubmissionGraded {
            submission_id,
            course_id,
            user_id,
            score,
            max_points,
            timestamp: Utc::now(),
        })
    }

    pub fn quiz_attempted(
        lesson_id: LessonId,
        course_id: CourseId,
        user_id: UserId,
        score: u8,
        passed: bool,
    ) -> Self {
        Self::new(EventType::QuizAttempted {
            lesson_id,
            course_id,
            user_id,
            score,
            passed,
            timestamp: Utc::now(),
        })
    }

    pub fn points_awarded(user_id: UserId, course_id: CourseId, points: u32, reason: String) -> Self {
        Self::new(EventType::PointsAwarded {
            user_id,
            course_id,
            points,
            reason,
            timestamp: Utc::now(),
        })
    }

    /// Create session started event
    pub fn session_started(instance_id: String) -> Self {
        Self::new(EventType::SessionStarted {
            instance_id: Some(instance_id),
            timestamp: Utc::now(),
        })
    }

    /// Create heartbeat event
    pub fn heartbeat(instance_id: String) -> Self {
        Self::new(EventType::Heartbeat {
            instance_id: Some(instance_id),
            timestamp: Utc::now(),
        })
    }

    /// Learner and course the event is about, when it is about one
    pub fn subject(&self) -> (Option<UserId>, Option<CourseId>) {
        match &self.event_type {
            EventType::EnrollmentCreated {
                user_id, course_id, ..
            }
            | EventType::LessonCompleted {
                user_id, course_id, ..
            }
            | EventType::CourseCompleted {
                user_id, course_id, ..
            }
            | EventType::SubmissionReceived {
                user_id, course_id, ..
            }
            | EventType::SubmissionGraded {
                user_id, course_id, ..
            }
            | EventType::QuizAttempted {
                user_id, course_id, ..
            }
            | EventType::PointsAwarded {
                user_id, course_id, ..
            } => (Some(*user_id), Some(*course_id)),
            EventType::CoursePublished { course_id, .. } => (None, Some(*course_id)),
            EventType::SessionStarted { .. } | EventType::Heartbeat { .. } => (None, None),
        }
    }

    /// Whether `actor` may see this event on the stream.
    ///
    /// Learner activity goes to the learner, the managers of its course and
    /// admins. Publications and heartbeats go to everyone.
    pub fn is_visible_to(&self, actor: &Actor, managed: &HashSet<CourseId>) -> bool {
        if actor.role == Role::Admin {
            return true;
        }
        match self.subject() {
            (Some(user_id), course_id) => {
                user_id == actor.id || course_id.is_some_and(|c| managed.contains(&c))
            }
            (None, _) => true,
        }
    }

    /// Convert to SSE data format
    pub fn to_sse(&self) -> String {
        format!(
            "id: {}\ndata: {}\n\n",
            self.id,
            serde_json::to_string(&self).unwrap_or_else(|_| "{}".to_string())
        )
    }
}

/// Event broadcaster using tokio broadcast channel
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<Event>,
}

impl EventBroadcaster {
    /// Create new broadcaster with channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Broadcast event to all subscribers
    pub fn broadcast(
        &self,
        event: Event,
    ) -> Result<usize, Box<broadcast::error::SendError<Event>>> {
        self.tx.send(event).map_err(Box::new)
    }

    /// Fire-and-forget publish; having no subscribers is not an error
    pub fn publish(&self, event: Event) {
        if self.tx.send(event).is_err() {
            tracing::trace!("No event subscribers connected");
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Get subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let user = UserId::new();
        let course = CourseId::new();
        let event = Event::enrollment_created(user, course);
        match event.event_type {
            EventType::EnrollmentCreated {
                user_id, course_id, ..
            } => {
                assert_eq!(user_id, user);
                assert_eq!(course_id, course);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn test_sse_format() {
        let event = Event::course_published(CourseId::new(), "Rust 101".to_string());
        let sse = event.to_sse();
        assert!(sse.contains("id:"));
        assert!(sse.contains("data:"));
        assert!(sse.contains("course_published"));
    }

    #[test]
    fn test_event_json_is_flat() {
        let event = Event::quiz_attempted(LessonId::new(), CourseId::new(), UserId::new(), 80, true);
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "quiz_attempted");
        assert_eq!(value["score"], 80);
        assert!(value.get("instance_id").is_none());
    }

    #[test]
    fn test_learner_events_are_scoped() {
        let learner = Actor::new(UserId::new(), Role::Student);
        let classmate = Actor::new(UserId::new(), Role::Student);
        let instructor = Actor::new(UserId::new(), Role::Instructor);
        let admin = Actor::new(UserId::new(), Role::Admin);
        let course = CourseId::new();
        let managed: HashSet<CourseId> = [course].into_iter().collect();
        let none = HashSet::new();

        let graded = Event::submission_graded(SubmissionId::new(), course, learner.id, 7, 10);
        assert!(graded.is_visible_to(&learner, &none));
        assert!(!graded.is_visible_to(&classmate, &none));
        assert!(graded.is_visible_to(&instructor, &managed));
        assert!(!graded.is_visible_to(&instructor, &none));
        assert!(graded.is_visible_to(&admin, &none));

        let published = Event::course_published(course, "Rust 101".to_string());
        assert!(published.is_visible_to(&classmate, &none));
        assert!(Event::heartbeat("x".to_string()).is_visible_to(&classmate, &none));
    }

    #[tokio::test]
    async fn test_broadcaster() {
        let broadcaster = EventBroadcaster::new(10);
        let mut rx = broadcaster.subscribe();

        let event = Event::heartbeat("test".to_string());
        broadcaster.broadcast(event.clone()).unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received.id, event.id);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let broadcaster = EventBroadcaster::new(4);
        broadcaster.publish(Event::heartbeat("idle".to_string()));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }
}
