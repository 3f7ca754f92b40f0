use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::identifiers::{WorkId, WorkRecordId};
use crate::legacy::parse_legacy_task_metadata;
use crate::rating::RatingSubject;
use crate::review::AutomatedReview;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    Low = 1,
    Medium = 2,
    High = 3,
    Urgent = 4,
}

impl TryFrom<u8> for Priority {
    type Error = DomainError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            4 => Ok(Priority::Urgent),
            other => Err(DomainError::InvalidPriority(other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value as u8
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    #[default]
    Code,
    Review,
}

impl WorkType {
    pub fn is_review(self) -> bool {
        matches!(self, WorkType::Review)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub base_branch: Option<String>,
    #[serde(default)]
    pub issue_url: Option<String>,
}

/// A task offered to a contributor. Replaced wholesale when another item loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: WorkId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub task: Option<TaskMetadata>,
    #[serde(default)]
    pub work_type: WorkType,
}

impl WorkItem {
    /// Repository of the underlying task, falling back to metadata embedded in
    /// the markdown description by older task templates.
    pub fn repository(&self) -> Option<String> {
        self.structured_field(|task| task.repository.as_deref())
            .or_else(|| parse_legacy_task_metadata(&self.description).repository)
    }

    pub fn branch(&self) -> Option<String> {
        self.structured_field(|task| task.branch.as_deref())
            .or_else(|| parse_legacy_task_metadata(&self.description).branch)
    }

    pub fn base_branch(&self) -> Option<String> {
        self.structured_field(|task| task.base_branch.as_deref())
            .or_else(|| parse_legacy_task_metadata(&self.description).base_branch)
    }

    fn structured_field<F>(&self, field: F) -> Option<String>
    where
        F: Fn(&TaskMetadata) -> Option<&str>,
    {
        self.task
            .as_ref()
            .and_then(field)
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned)
    }
}

/// The server's record of a contributor's attempt at a work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: WorkRecordId,
    pub work_id: WorkId,
    pub started_at_ms: i64,
    #[serde(default)]
    pub duration_ms: u64,
    #[serde(default)]
    pub rating_code: Option<String>,
    #[serde(default)]
    pub rating_subjects: Vec<RatingSubject>,
    #[serde(default)]
    pub review: Option<AutomatedReview>,
}
