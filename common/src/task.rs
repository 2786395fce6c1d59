use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::ModelId;

pub type TaskId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Running,
    Complete,
    /// El worker falló, no arrancó o superó el timeout.
    Failed,
}

impl TaskStatus {
    /// Una tarea sólo sale de Running; nunca vuelve a Running.
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        matches!(
            (self, next),
            (TaskStatus::Running, TaskStatus::Complete) | (TaskStatus::Running, TaskStatus::Failed)
        )
    }

    pub fn is_finished(self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub id_num: u32,
    pub model_id: ModelId,
    pub status: TaskStatus,

    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}
