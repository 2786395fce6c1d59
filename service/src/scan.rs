use std::{fs, path::Path, path::PathBuf};

use common::{data::dataset_name, NewDataset, Session};
use glob::{glob, Pattern};
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::uploads::{datapoints_or_zero, placeholder_model};

/// Registra lo que ya hay en `models/` y `datasets/` del volumen al arrancar.
/// Crea los directorios si no existen. Los ids siguen el orden alfabético.
pub fn scan_storage(config: &ServiceConfig) -> Session {
    let mut session = Session::new();

    for model_path in files_in(&config.models_dir()) {
        let name = file_name(&model_path);
        session.add_model(placeholder_model(name, &model_path));
    }

    for dataset_path in files_in(&config.datasets_dir()) {
        session.add_dataset(NewDataset {
            name: dataset_name(&file_name(&dataset_path)),
            datapoints: datapoints_or_zero(&dataset_path),
            path: dataset_path.to_string_lossy().to_string(),
        });
    }

    info!(
        "volumen {}: {} modelos, {} datasets",
        config.storage_root.display(),
        session.models.len(),
        session.datasets.len()
    );
    session
}

fn files_in(dir: &Path) -> Vec<PathBuf> {
    if let Err(e) = fs::create_dir_all(dir) {
        warn!("no se pudo crear {}: {}", dir.display(), e);
        return Vec::new();
    }

    let pattern = format!("{}/*", Pattern::escape(&dir.to_string_lossy()));
    match glob(&pattern) {
        Ok(entries) => entries.flatten().filter(|p| p.is_file()).collect(),
        Err(e) => {
            warn!("patrón inválido {}: {}", pattern, e);
            Vec::new()
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
