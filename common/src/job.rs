use serde::{Deserialize, Serialize};

use crate::entity::{DatasetId, ModelId};

/* --------- Requests que llegan por HTTP --------- */

/// Hiperparámetros del entrenamiento. Los que no vengan en el request
/// toman el valor por defecto.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    #[serde(default = "default_n_trees")]
    pub n_trees: u32,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: u32,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
    #[serde(default = "default_features_fraction")]
    pub x_features_fraction: f64,
    #[serde(default = "default_data_split")]
    pub data_split: f64,
    #[serde(default)]
    pub show_unoptimized: bool,
}

fn default_n_trees() -> u32 {
    10
}

fn default_min_samples_split() -> u32 {
    2
}

fn default_max_depth() -> u32 {
    5
}

fn default_features_fraction() -> f64 {
    1.0
}

fn default_data_split() -> f64 {
    0.2
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            n_trees: default_n_trees(),
            min_samples_split: default_min_samples_split(),
            max_depth: default_max_depth(),
            x_features_fraction: default_features_fraction(),
            data_split: default_data_split(),
            show_unoptimized: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    pub name: String,
    pub dataset_id: DatasetId,
    /// Columna objetivo que el modelo aprende a predecir.
    pub infer_name: String,
    pub features: Vec<String>,
    #[serde(flatten)]
    pub params: TrainingParams,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceRequest {
    #[serde(alias = "modelid")]
    pub model_id: ModelId,
    #[serde(alias = "datasetid")]
    pub dataset_id: DatasetId,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InferenceResponse {
    pub precision: f64,
    pub recall: f64,
}

/// Query de `GET /models`: con id descarga el archivo, sin id lista todo.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelQuery {
    #[serde(default, alias = "modelid")]
    pub model_id: Option<ModelId>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeQuery {
    #[serde(alias = "modelid")]
    pub model_id: ModelId,
}

/* --------- Descriptor que lee el worker --------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Train,
    Infer,
    ShowTrees,
}

impl TaskKind {
    /// Cada tipo de job escribe siempre en el mismo archivo.
    pub fn descriptor_file_name(self) -> &'static str {
        match self {
            TaskKind::Train => "train.toml",
            TaskKind::Infer => "infer.toml",
            TaskKind::ShowTrees => "trees.toml",
        }
    }
}

/// Configuración de un job para el worker. Los campos que no aplican al tipo
/// de job quedan en su valor cero; los nombres serializados son las claves
/// que espera el script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDescriptor {
    #[serde(rename = "task")]
    pub kind: TaskKind,
    #[serde(rename = "input_data", default)]
    pub input_data_path: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(rename = "y_axis", default)]
    pub target_name: String,
    #[serde(rename = "path", default)]
    pub model_path: String,
    #[serde(default)]
    pub n_trees: u32,
    #[serde(default)]
    pub min_samples_split: u32,
    #[serde(default)]
    pub max_depth: u32,
    #[serde(default)]
    pub x_features_fraction: f64,
    #[serde(default)]
    pub data_split: f64,
    #[serde(default)]
    pub show_unoptimized: bool,
}

impl JobDescriptor {
    fn empty(kind: TaskKind) -> Self {
        Self {
            kind,
            input_data_path: String::new(),
            features: Vec::new(),
            target_name: String::new(),
            model_path: String::new(),
            n_trees: 0,
            min_samples_split: 0,
            max_depth: 0,
            x_features_fraction: 0.0,
            data_split: 0.0,
            show_unoptimized: false,
        }
    }

    pub fn training(
        input_data_path: &str,
        model_path: &str,
        target_name: &str,
        features: &[String],
        params: &TrainingParams,
    ) -> Self {
        Self {
            input_data_path: input_data_path.to_string(),
            features: features.to_vec(),
            target_name: target_name.to_string(),
            model_path: model_path.to_string(),
            n_trees: params.n_trees,
            min_samples_split: params.min_samples_split,
            max_depth: params.max_depth,
            x_features_fraction: params.x_features_fraction,
            data_split: params.data_split,
            show_unoptimized: params.show_unoptimized,
            ..Self::empty(TaskKind::Train)
        }
    }

    pub fn inference(
        input_data_path: &str,
        model_path: &str,
        target_name: &str,
        features: &[String],
    ) -> Self {
        Self {
            input_data_path: input_data_path.to_string(),
            features: features.to_vec(),
            target_name: target_name.to_string(),
            model_path: model_path.to_string(),
            ..Self::empty(TaskKind::Infer)
        }
    }

    pub fn show_trees(model_path: &str) -> Self {
        Self {
            model_path: model_path.to_string(),
            ..Self::empty(TaskKind::ShowTrees)
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
