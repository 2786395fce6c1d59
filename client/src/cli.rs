use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{
    Dataset, InferenceRequest, InferenceResponse, InferenceResult, Model, Session, Task,
    TaskStatus, TrainingParams, TrainingRequest,
};
use reqwest::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use std::{env, fs, path::Path, path::PathBuf};

/// - En Docker: SERVICE_URL=http://oddforest:9001
/// - Local: default http://localhost:9001
fn service_base_url() -> String {
    env::var("SERVICE_URL").unwrap_or_else(|_| "http://localhost:9001".to_string())
}

#[derive(Parser)]
#[command(name = "client")]
#[command(about = "CLI para el servicio de modelos random forest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Tareas, datasets y modelos de la sesión
    Status,
    /// Estado de una tarea
    Task {
        #[arg(value_name = "TASK_ID")]
        task_id: String,
    },
    /// Lista los datasets subidos
    Datasets,
    /// Lista los modelos disponibles
    Models,
    /// Lista los resultados de inferencia
    Results,

    /// Sube un CSV como dataset nuevo
    UploadDataset {
        #[arg(value_name = "CSV")]
        file: PathBuf,
    },
    /// Sube un modelo ya entrenado
    UploadModel {
        #[arg(value_name = "MODELO")]
        file: PathBuf,
    },
    /// Descarga el archivo de un modelo
    Download {
        #[arg(value_name = "MODEL_ID")]
        model_id: String,
        #[arg(long, short)]
        output: PathBuf,
    },

    /// Entrena un modelo nuevo y espera a que termine
    Train {
        #[arg(value_name = "NOMBRE")]
        name: String,
        #[arg(long)]
        dataset: String,
        /// Columna objetivo
        #[arg(long)]
        target: String,
        /// Columnas de entrada, separadas por coma
        #[arg(long, value_delimiter = ',', required = true)]
        features: Vec<String>,
        #[arg(long, default_value_t = 10)]
        n_trees: u32,
        #[arg(long, default_value_t = 2)]
        min_samples_split: u32,
        #[arg(long, default_value_t = 5)]
        max_depth: u32,
        #[arg(long, default_value_t = 1.0)]
        features_fraction: f64,
        #[arg(long, default_value_t = 0.2)]
        data_split: f64,
        #[arg(long)]
        show_unoptimized: bool,
    },
    /// Corre inferencia de un modelo sobre un dataset
    Infer {
        #[arg(value_name = "MODEL_ID")]
        model_id: String,
        #[arg(value_name = "DATASET_ID")]
        dataset_id: String,
    },
    /// Muestra los árboles de un modelo
    Tree {
        #[arg(value_name = "MODEL_ID")]
        model_id: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = service_base_url();

    match cli.command {
        Commands::Status => {
            let session: Session = get_json(&client, &format!("{}/status", base_url)).await?;

            println!("Tareas:");
            if session.tasks.is_empty() {
                println!("  (sin tareas)");
            }
            for t in &session.tasks {
                print_task(t);
            }
            println!("Datasets: {}", session.datasets.len());
            for d in &session.datasets {
                print_dataset(d);
            }
            println!("Modelos: {}", session.models.len());
            for m in &session.models {
                print_model(m);
            }
        }

        Commands::Task { task_id } => {
            let task: Task = get_json(&client, &format!("{}/tasks/{}", base_url, task_id)).await?;
            print_task(&task);
        }

        Commands::Datasets => {
            let datasets: Vec<Dataset> = get_json(&client, &format!("{}/datasets", base_url)).await?;
            if datasets.is_empty() {
                println!("No hay datasets.");
            }
            for d in &datasets {
                print_dataset(d);
            }
        }

        Commands::Models => {
            let models: Vec<Model> = get_json(&client, &format!("{}/models", base_url)).await?;
            if models.is_empty() {
                println!("No hay modelos.");
            }
            for m in &models {
                print_model(m);
            }
        }

        Commands::Results => {
            let results: Vec<InferenceResult> =
                get_json(&client, &format!("{}/results", base_url)).await?;
            if results.is_empty() {
                println!("No hay resultados.");
            }
            for r in results {
                println!(
                    "  modelo={} dataset={} precision={} recall={}",
                    r.model_id, r.dataset_id, r.precision, r.recall
                );
            }
        }

        Commands::UploadDataset { file } => {
            let form = file_form(&file)?;
            let resp = client
                .post(format!("{}/data/upload", base_url))
                .multipart(form)
                .send()
                .await?;
            let dataset: Dataset = json_or_error(resp).await?;
            println!("Dataset subido:");
            print_dataset(&dataset);
        }

        Commands::UploadModel { file } => {
            let form = file_form(&file)?;
            let resp = client
                .post(format!("{}/model/upload", base_url))
                .multipart(form)
                .send()
                .await?;
            let model: Model = json_or_error(resp).await?;
            println!("Modelo subido:");
            print_model(&model);
        }

        Commands::Download { model_id, output } => {
            let resp = client
                .get(format!("{}/models", base_url))
                .query(&[("modelid", &model_id)])
                .send()
                .await?;
            let is_file = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .is_some_and(|v| v == "application/octet-stream");
            if !resp.status().is_success() || !is_file {
                bail!("no se encontró el modelo {model_id}");
            }
            let bytes = resp.bytes().await?;
            fs::write(&output, &bytes)
                .with_context(|| format!("no se pudo escribir {}", output.display()))?;
            println!("Modelo {} guardado en {} ({} bytes)", model_id, output.display(), bytes.len());
        }

        Commands::Train {
            name,
            dataset,
            target,
            features,
            n_trees,
            min_samples_split,
            max_depth,
            features_fraction,
            data_split,
            show_unoptimized,
        } => {
            let req = TrainingRequest {
                name,
                dataset_id: dataset,
                infer_name: target,
                features,
                params: TrainingParams {
                    n_trees,
                    min_samples_split,
                    max_depth,
                    x_features_fraction: features_fraction,
                    data_split,
                    show_unoptimized,
                },
            };

            println!("Entrenando (puede tardar)...");
            let resp = client.post(format!("{}/train", base_url)).json(&req).send().await?;
            let model: Model = json_or_error(resp).await?;
            println!("Modelo creado:");
            print_model(&model);
            let m = &model.metrics;
            println!("  validación: accuracy={:.4} recall={:.4}", m.validation_accuracy, m.validation_recall);
            println!("  test      : accuracy={:.4} recall={:.4}", m.test_accuracy, m.test_recall);
            if show_unoptimized {
                println!(
                    "  sin optimizar: val={:.4}/{:.4} test={:.4}/{:.4}",
                    m.unoptimized_validation_accuracy,
                    m.unoptimized_validation_recall,
                    m.unoptimized_test_accuracy,
                    m.unoptimized_test_recall
                );
            }
        }

        Commands::Infer { model_id, dataset_id } => {
            let req = InferenceRequest { model_id, dataset_id };
            let resp = client.post(format!("{}/infer", base_url)).json(&req).send().await?;
            let result: InferenceResponse = json_or_error(resp).await?;
            println!("precision: {:.4}", result.precision);
            println!("recall   : {:.4}", result.recall);
        }

        Commands::Tree { model_id } => {
            let resp = client
                .get(format!("{}/models/tree", base_url))
                .query(&[("modelid", &model_id)])
                .send()
                .await?;
            let lines: Vec<String> = json_or_error(resp).await?;
            for line in lines {
                println!("{line}");
            }
        }
    }

    Ok(())
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let resp = client.get(url).send().await?;
    json_or_error(resp).await
}

/// Decodifica el cuerpo si el status es 2xx; si no, muestra el error del servicio.
async fn json_or_error<T: DeserializeOwned>(resp: Response) -> Result<T> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }

    let body: serde_json::Value = resp.json().await.unwrap_or_default();
    let message = body["message"].as_str().unwrap_or("sin detalle");
    bail!("error del servicio (status {}): {}", status, message)
}

fn file_form(path: &Path) -> Result<multipart::Form> {
    let bytes = fs::read(path).with_context(|| format!("no se pudo leer {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .context("ruta sin nombre de archivo")?;
    let part = multipart::Part::bytes(bytes).file_name(file_name);
    Ok(multipart::Form::new().part("file", part))
}

fn print_task(t: &Task) {
    let estado = match t.status {
        TaskStatus::Running => "corriendo",
        TaskStatus::Complete => "completa",
        TaskStatus::Failed => "fallida",
    };
    println!("  {} modelo={} estado={} creada={}", t.id, t.model_id, estado, t.created_at);
}

fn print_dataset(d: &Dataset) {
    println!("  {} {} ({} registros) {}", d.id, d.name, d.datapoints, d.path);
}

fn print_model(m: &Model) {
    println!(
        "  {} {} dataset={} objetivo={} features=[{}]",
        m.id,
        m.name,
        m.trained_dataset,
        m.infer_name,
        m.features.join(", ")
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_parses_feature_list() {
        let cli = Cli::try_parse_from([
            "client", "train", "m1", "--dataset", "d1", "--target", "y", "--features", "x,z",
        ])
        .unwrap();

        match cli.command {
            Commands::Train { features, n_trees, .. } => {
                assert_eq!(features, vec!["x", "z"]);
                assert_eq!(n_trees, 10);
            }
            _ => panic!("subcomando inesperado"),
        }
    }

    #[test]
    fn task_takes_an_id() {
        let cli = Cli::try_parse_from(["client", "task", "t3"]).unwrap();
        assert!(matches!(cli.command, Commands::Task { ref task_id } if task_id == "t3"));
    }

    #[test]
    fn train_requires_features() {
        assert!(Cli::try_parse_from(["client", "train", "m1", "--dataset", "d1", "--target", "y"]).is_err());
    }
}
