use std::{env, path::PathBuf, time::Duration};

use tracing::warn;

const DEFAULT_VOLUME_PATH: &str = "/storage";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9001";
const DEFAULT_WORKER_INTERPRETER: &str = "python";
const DEFAULT_WORKER_SCRIPT: &str = "../../random_forest/main.py";
const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 60 * 60;
const DEFAULT_FALLBACK_DIR: &str = ".";

/// Configuración del servicio. Todo sale de variables de entorno con defaults.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Raíz del volumen: `datasets/`, `models/` y los descriptores.
    pub storage_root: PathBuf,
    /// Directorio donde se escribe si el volumen no está disponible.
    pub fallback_dir: PathBuf,
    pub bind_addr: String,
    pub worker_interpreter: String,
    pub worker_script: PathBuf,
    pub worker_timeout: Duration,
    /// Directorio extra que se agrega al PATH del worker (ej. shims de pyenv).
    pub worker_extra_path: Option<String>,
}

impl ServiceConfig {
    pub fn from_env() -> Self {
        let timeout_secs = env::var("WORKER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| match s.parse::<u64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("WORKER_TIMEOUT_SECS inválido ({}), usando {}", s, DEFAULT_WORKER_TIMEOUT_SECS);
                    None
                }
            })
            .unwrap_or(DEFAULT_WORKER_TIMEOUT_SECS);

        Self {
            storage_root: env_or("VOLUMEPATH", DEFAULT_VOLUME_PATH).into(),
            fallback_dir: env_or("DESCRIPTOR_FALLBACK_DIR", DEFAULT_FALLBACK_DIR).into(),
            bind_addr: env_or("BIND_ADDR", DEFAULT_BIND_ADDR),
            worker_interpreter: env_or("WORKER_INTERPRETER", DEFAULT_WORKER_INTERPRETER),
            worker_script: env_or("WORKER_SCRIPT", DEFAULT_WORKER_SCRIPT).into(),
            worker_timeout: Duration::from_secs(timeout_secs),
            worker_extra_path: env::var("WORKER_EXTRA_PATH").ok().filter(|s| !s.is_empty()),
        }
    }

    pub fn datasets_dir(&self) -> PathBuf {
        self.storage_root.join("datasets")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.storage_root.join("models")
    }
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}
