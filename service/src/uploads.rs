use std::{
    fs,
    path::{Path, PathBuf},
};

use common::{
    data::{count_datapoints, dataset_name},
    Dataset, Model, ModelMetrics, NewDataset, NewModel,
};
use tracing::{info, warn};

use crate::error::ServiceError;
use crate::state::AppState;

/// Guarda un CSV subido en `datasets/` y lo registra como dataset nuevo.
pub fn upload_dataset(state: &AppState, file_name: &str, bytes: &[u8]) -> Result<Dataset, ServiceError> {
    let file_name = base_name(file_name)?;
    let path = store_file(&state.config.datasets_dir(), &state.config.fallback_dir, &file_name, bytes)?;
    let datapoints = datapoints_or_zero(&path);

    let dataset = state.with_session(|s| {
        s.add_dataset(NewDataset {
            name: dataset_name(&file_name),
            path: path.to_string_lossy().to_string(),
            datapoints,
        })
    })?;

    info!("dataset {} registrado ({} registros)", dataset.id, dataset.datapoints);
    Ok(dataset)
}

/// Guarda un modelo ya entrenado en `models/`. No se conoce con qué dataset ni
/// con qué columnas se entrenó, así que las métricas quedan en 0.
pub fn upload_model(state: &AppState, file_name: &str, bytes: &[u8]) -> Result<Model, ServiceError> {
    let file_name = base_name(file_name)?;
    let path = store_file(&state.config.models_dir(), &state.config.fallback_dir, &file_name, bytes)?;

    let model = state.with_session(|s| s.add_model(placeholder_model(file_name, &path)))?;

    info!("modelo {} subido ({})", model.id, model.path);
    Ok(model)
}

/// Modelo del que sólo se conoce el archivo (subido o encontrado al arrancar).
pub fn placeholder_model(name: String, path: &Path) -> NewModel {
    NewModel {
        name,
        trained_dataset: "unknown".to_string(),
        path: path.to_string_lossy().to_string(),
        infer_name: "unknown".to_string(),
        features: vec!["Unknown".to_string()],
        metrics: ModelMetrics::default(),
    }
}

pub fn datapoints_or_zero(path: &Path) -> usize {
    match count_datapoints(path) {
        Ok(n) => n,
        Err(e) => {
            warn!("no se pudieron contar registros de {}: {}", path.display(), e);
            0
        }
    }
}

// Sólo el último componente: nada de "../" desde el cliente.
fn base_name(file_name: &str) -> Result<String, ServiceError> {
    Path::new(file_name)
        .file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Upload(format!("invalid file name: {file_name:?}")))
}

fn store_file(dir: &Path, fallback_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, ServiceError> {
    let path = dir.join(file_name);
    match fs::write(&path, bytes) {
        Ok(()) => Ok(path),
        Err(e) => {
            let fallback = fallback_dir.join(file_name);
            warn!(
                "volumen no disponible ({}), guardando {} en {}",
                e,
                file_name,
                fallback.display()
            );
            fs::write(&fallback, bytes)
                .map_err(|e| ServiceError::Upload(format!("could not save {file_name}: {e}")))?;
            Ok(fallback)
        }
    }
}
