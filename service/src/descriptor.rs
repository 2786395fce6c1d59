use std::{fs, path::PathBuf};

use common::JobDescriptor;
use tracing::{debug, warn};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Serializa el descriptor a TOML y lo escribe en `<storage_root>/<tipo>.toml`.
/// Si el volumen no está, lo escribe en el directorio de fallback.
/// Devuelve la ruta que efectivamente se usó.
pub fn write_descriptor(
    config: &ServiceConfig,
    descriptor: &JobDescriptor,
) -> Result<PathBuf, ServiceError> {
    let text = descriptor.to_toml()?;
    let file_name = descriptor.kind.descriptor_file_name();

    let primary = config.storage_root.join(file_name);
    match fs::write(&primary, &text) {
        Ok(()) => {
            debug!("descriptor escrito en {}", primary.display());
            Ok(primary)
        }
        Err(e) => {
            let fallback = config.fallback_dir.join(file_name);
            warn!(
                "volumen no disponible ({}), escribiendo {} en {}",
                e,
                file_name,
                fallback.display()
            );
            fs::write(&fallback, &text).map_err(|source| ServiceError::DescriptorWriteFailed {
                primary,
                fallback: fallback.clone(),
                source,
            })?;
            Ok(fallback)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{temp_dir, test_config};
    use common::TrainingParams;
    use std::path::Path;

    fn config(storage_root: &Path, fallback_dir: &Path) -> ServiceConfig {
        ServiceConfig {
            storage_root: storage_root.to_path_buf(),
            fallback_dir: fallback_dir.to_path_buf(),
            ..test_config(storage_root)
        }
    }

    fn read_back(path: &Path) -> JobDescriptor {
        JobDescriptor::from_toml(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn all_kinds_survive_write_and_read_back() {
        let root = temp_dir("descriptor_roundtrip");
        let config = config(&root, &root);
        let features = vec!["x".to_string(), "y".to_string()];

        let params = TrainingParams {
            n_trees: 7,
            x_features_fraction: 0.75,
            data_split: 0.3,
            show_unoptimized: true,
            ..TrainingParams::default()
        };
        let descriptors = [
            JobDescriptor::training("/d/sales.csv", "/m/a.model", "y", &features, &params),
            JobDescriptor::inference("/d/sales.csv", "/m/a.model", "y", &features),
            JobDescriptor::show_trees("/m/a.model"),
        ];

        for built in descriptors {
            let path = write_descriptor(&config, &built).unwrap();
            assert_eq!(path, root.join(built.kind.descriptor_file_name()));
            assert_eq!(read_back(&path), built);
        }
    }

    #[test]
    fn falls_back_when_volume_is_missing() {
        let base = temp_dir("descriptor_fallback");
        let config = config(&base.join("no-such-volume"), &base);

        let built = JobDescriptor::show_trees("/m/a.model");
        let path = write_descriptor(&config, &built).unwrap();

        assert_eq!(path, base.join("trees.toml"));
        assert_eq!(read_back(&path), built);
    }

    #[test]
    fn both_locations_unwritable_is_an_error() {
        let base = temp_dir("descriptor_unwritable");
        let config = config(&base.join("missing-a"), &base.join("missing-b"));

        let err = write_descriptor(&config, &JobDescriptor::show_trees("/m/a.model")).unwrap_err();
        assert!(matches!(err, ServiceError::DescriptorWriteFailed { .. }));
    }

    #[test]
    fn next_job_of_same_kind_overwrites() {
        let root = temp_dir("descriptor_overwrite");
        let config = config(&root, &root);

        write_descriptor(&config, &JobDescriptor::show_trees("/m/first.model")).unwrap();
        let path = write_descriptor(&config, &JobDescriptor::show_trees("/m/second.model")).unwrap();

        assert_eq!(read_back(&path).model_path, "/m/second.model");
    }
}
