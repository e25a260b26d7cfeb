use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::submission::Submission;

/// Core event trait
pub trait Event: Send + Sync + Sized + Serialize + DeserializeOwned {
    /// Get the event topic (e.g., "submission_queued", "submission_finished")
    fn topic(&self) -> &str;

    /// Convert event to a generic event
    fn to_generic_event(&self) -> GenericEvent {
        GenericEvent {
            topic: self.topic().to_string(),
            payload: serde_json::to_value(self).unwrap_or_default(),
        }
    }

    /// Create an event from a generic event
    fn from_generic_event(e: &GenericEvent) -> Result<Self, anyhow::Error> {
        let payload: Self = serde_json::from_value(e.payload.clone())?;
        Ok(payload)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenericEvent {
    pub topic: String,
    pub payload: serde_json::Value,
}

impl Event for GenericEvent {
    fn topic(&self) -> &str {
        &self.topic
    }

    fn from_generic_event(e: &GenericEvent) -> Result<Self, anyhow::Error> {
        Ok(e.clone())
    }
}

pub mod topics {
    pub const SUBMISSION_QUEUED: &str = "submission_queued";
    pub const SUBMISSION_STARTED: &str = "submission_started";
    pub const SUBMISSION_FINISHED: &str = "submission_finished";
}

/// Submission lifecycle events delivered to hooks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SubmissionEvent {
    Queued {
        submission_id: Uuid,
        problem_id: String,
    },
    Started {
        submission_id: Uuid,
        worker: usize,
    },
    /// Terminal state reached. Carries the report and assessment when graded.
    Finished { submission: Submission },
}

impl SubmissionEvent {
    pub fn submission_id(&self) -> Uuid {
        match self {
            Self::Queued { submission_id, .. } | Self::Started { submission_id, .. } => {
                *submission_id
            }
            Self::Finished { submission } => submission.id,
        }
    }
}

impl Event for SubmissionEvent {
    fn topic(&self) -> &str {
        match self {
            Self::Queued { .. } => topics::SUBMISSION_QUEUED,
            Self::Started { .. } => topics::SUBMISSION_STARTED,
            Self::Finished { .. } => topics::SUBMISSION_FINISHED,
        }
    }
}
