//! Helpers compartidos por los tests del servicio.

use std::{fs, path::Path, path::PathBuf, time::Duration};

use crate::config::ServiceConfig;

pub fn temp_dir(sub: &str) -> PathBuf {
    let base = std::env::temp_dir().join("service_tests").join(sub);
    let _ = fs::remove_dir_all(&base);
    fs::create_dir_all(&base).unwrap();
    base
}

/// Config apuntando a `root`, con un worker `sh` en `root/worker.sh`.
pub fn test_config(root: &Path) -> ServiceConfig {
    ServiceConfig {
        storage_root: root.to_path_buf(),
        fallback_dir: root.to_path_buf(),
        bind_addr: "127.0.0.1:0".to_string(),
        worker_interpreter: "sh".to_string(),
        worker_script: root.join("worker.sh"),
        worker_timeout: Duration::from_secs(10),
        worker_extra_path: None,
    }
}

pub fn write_worker(config: &ServiceConfig, script: &str) {
    fs::write(&config.worker_script, script).unwrap();
}

/// Worker que imprime ruido y después las 8 métricas de entrenamiento.
pub const TRAINING_WORKER: &str = "\
echo \"reading $1\"
echo 'data binned'
for v in 0.1 0.2 0.3 0.4 0.5 0.6 0.7 0.8; do echo $v; done
";
