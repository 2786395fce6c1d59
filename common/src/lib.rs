pub mod data;
pub mod entity;
pub mod ids;
pub mod job;
pub mod results;
pub mod session;
pub mod task;

pub use entity::{
    Dataset, DatasetId, EntityKind, InferenceResult, Model, ModelId, ModelMetrics, NewDataset,
    NewModel, NotFound,
};
pub use job::{
    InferenceRequest, InferenceResponse, JobDescriptor, ModelQuery, TaskKind, TrainingParams,
    TrainingRequest, TreeQuery,
};
pub use results::Parsed;
pub use session::{Session, SessionError};
pub use task::{Task, TaskId, TaskStatus};
