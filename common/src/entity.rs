use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub type DatasetId = String;
pub type ModelId = String;

/// Tipos de entidad que guarda la sesión. Cada uno tiene su propio prefijo de id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Dataset,
    Model,
    Task,
    Result,
}

impl EntityKind {
    pub fn prefix(self) -> &'static str {
        match self {
            EntityKind::Dataset => "d",
            EntityKind::Model => "m",
            EntityKind::Task => "t",
            EntityKind::Result => "r",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::Dataset => "dataset",
            EntityKind::Model => "model",
            EntityKind::Task => "task",
            EntityKind::Result => "result",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Búsqueda fallida de una entidad por id.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} not found, id: {id}")]
pub struct NotFound {
    pub kind: EntityKind,
    pub id: String,
}

impl NotFound {
    pub fn new(kind: EntityKind, id: impl Into<String>) -> Self {
        Self {
            kind,
            id: id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub id_num: u32,
    pub name: String,
    pub path: String,
    pub datapoints: usize,
}

/// Dataset todavía sin id; la sesión le asigna uno al insertarlo.
#[derive(Debug, Clone)]
pub struct NewDataset {
    pub name: String,
    pub path: String,
    pub datapoints: usize,
}

impl NewDataset {
    pub fn into_dataset(self, id_num: u32) -> Dataset {
        Dataset {
            id: crate::ids::format_id(EntityKind::Dataset, id_num),
            id_num,
            name: self.name,
            path: self.path,
            datapoints: self.datapoints,
        }
    }
}

/// Métricas que devuelve el worker al terminar un entrenamiento.
/// Los modelos subidos o encontrados al arrancar las tienen todas en 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub unoptimized_validation_accuracy: f64,
    pub unoptimized_validation_recall: f64,
    pub unoptimized_test_accuracy: f64,
    pub unoptimized_test_recall: f64,
    pub validation_accuracy: f64,
    pub validation_recall: f64,
    pub test_accuracy: f64,
    pub test_recall: f64,
}

impl ModelMetrics {
    /// Construye las métricas en el orden en que el worker las imprime.
    pub fn from_ordered(values: [f64; 8]) -> Self {
        Self {
            unoptimized_validation_accuracy: values[0],
            unoptimized_validation_recall: values[1],
            unoptimized_test_accuracy: values[2],
            unoptimized_test_recall: values[3],
            validation_accuracy: values[4],
            validation_recall: values[5],
            test_accuracy: values[6],
            test_recall: values[7],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub id_num: u32,
    pub name: String,
    /// Id del dataset de entrenamiento, o "unknown" si el modelo se subió ya entrenado.
    pub trained_dataset: String,
    pub path: String,
    pub infer_name: String,
    pub features: Vec<String>,
    pub metrics: ModelMetrics,
}

#[derive(Debug, Clone)]
pub struct NewModel {
    pub name: String,
    pub trained_dataset: String,
    pub path: String,
    pub infer_name: String,
    pub features: Vec<String>,
    pub metrics: ModelMetrics,
}

impl NewModel {
    pub fn into_model(self, id_num: u32) -> Model {
        Model {
            id: crate::ids::format_id(EntityKind::Model, id_num),
            id_num,
            name: self.name,
            trained_dataset: self.trained_dataset,
            path: self.path,
            infer_name: self.infer_name,
            features: self.features,
            metrics: self.metrics,
        }
    }
}

/// Resultado de una inferencia. Ningún flujo actual lo genera todavía.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub model_id: ModelId,
    pub dataset_id: DatasetId,
    pub tree: String,
    pub precision: String,
    pub recall: String,
}
