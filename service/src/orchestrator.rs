//! Flujos de entrenamiento, inferencia y listado de árboles.
//!
//! Cada request resuelve sus entidades y crea su Task con el lock tomado,
//! después lanza el worker en una tarea de tokio aparte y espera el único
//! resultado por un canal `oneshot` creado para ese request. La tarea
//! lanzada termina el trabajo (store + estado de la Task) aunque el cliente
//! HTTP se desconecte.

use std::path::Path;

use common::{
    ids::format_id,
    results::{parse_inference_metrics, parse_training_metrics, split_lines, Parsed},
    EntityKind, InferenceResponse, JobDescriptor, Model, ModelMetrics, NewModel, NotFound,
    InferenceRequest, TaskId, TaskStatus, TrainingRequest,
};
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::descriptor::write_descriptor;
use crate::error::ServiceError;
use crate::invoker::{invoke, OutputCapture};
use crate::state::AppState;

/// Lo que el worker dejó en su salida, ya partido en líneas.
type WorkerLines = Result<Vec<String>, ServiceError>;

pub async fn start_training(state: &AppState, req: TrainingRequest) -> Result<Model, ServiceError> {
    info!("construyendo modelo {} con dataset {}", req.name, req.dataset_id);
    let file_name = model_file_name(&req.name)?;

    // resolver dataset, reservar id de modelo y crear la Task en una sola sección crítica
    let (dataset_path, model_num, task_id) = state.with_session(|s| {
        let dataset_path = s.find_dataset(&req.dataset_id)?.path.clone();
        let model_num = s.reserve_model_id();
        let task = s.add_task(&format_id(EntityKind::Model, model_num));
        Ok::<_, NotFound>((dataset_path, model_num, task.id))
    })??;

    let model_path = state
        .config
        .models_dir()
        .join(file_name)
        .to_string_lossy()
        .to_string();

    let descriptor = JobDescriptor::training(
        &dataset_path,
        &model_path,
        &req.infer_name,
        &req.features,
        &req.params,
    );

    let draft = NewModel {
        name: req.name,
        trained_dataset: req.dataset_id,
        path: model_path,
        infer_name: req.infer_name,
        features: req.features,
        metrics: ModelMetrics::default(),
    };

    let log_task = task_id.clone();
    run_job(state, task_id, descriptor, move |state, lines| {
        let lines = match lines {
            Ok(lines) => lines,
            Err(e) => {
                state.with_session(|s| s.release_model_id(model_num))?;
                return Err(e);
            }
        };

        let parsed = parse_training_metrics(&lines);
        log_degraded(&log_task, &parsed);

        let model = NewModel {
            metrics: parsed.value,
            ..draft
        }
        .into_model(model_num);

        let model = state.with_session(|s| s.insert_model(model))?;
        info!("modelo {} creado ({})", model.id, model.path);
        Ok(model)
    })
    .await
}

pub async fn run_inference(
    state: &AppState,
    req: InferenceRequest,
) -> Result<InferenceResponse, ServiceError> {
    info!("inferencia con modelo {} sobre dataset {}", req.model_id, req.dataset_id);

    let (dataset_path, model, task_id) = state.with_session(|s| {
        let dataset_path = s.find_dataset(&req.dataset_id)?.path.clone();
        let model = s.find_model(&req.model_id)?.clone();
        let task = s.add_task(&model.id);
        Ok::<_, NotFound>((dataset_path, model, task.id))
    })??;

    let descriptor = JobDescriptor::inference(
        &dataset_path,
        &model.path,
        &model.infer_name,
        &model.features,
    );

    let log_task = task_id.clone();
    run_job(state, task_id, descriptor, move |_, lines| {
        let parsed = parse_inference_metrics(&lines?);
        log_degraded(&log_task, &parsed);
        Ok(parsed.value)
    })
    .await
}

pub async fn list_model_tree(state: &AppState, model_id: &str) -> Result<Vec<String>, ServiceError> {
    info!("listando árboles del modelo {}", model_id);

    let (model_path, task_id) = state.with_session(|s| {
        let model_path = s.find_model(model_id)?.path.clone();
        let task = s.add_task(model_id);
        Ok::<_, NotFound>((model_path, task.id))
    })??;

    run_job(state, task_id, JobDescriptor::show_trees(&model_path), |_, lines| lines).await
}

/// Escribe el descriptor, ejecuta el worker y llama a `complete` con sus
/// líneas (o con el error), todo dentro de una tarea de tokio propia. Al
/// final deja la Task en Complete o Failed según lo que devuelva `complete`.
async fn run_job<T, F>(
    state: &AppState,
    task_id: TaskId,
    descriptor: JobDescriptor,
    complete: F,
) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&AppState, WorkerLines) -> Result<T, ServiceError> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let state = state.clone();

    tokio::spawn(async move {
        let lines = async {
            let path = write_descriptor(&state.config, &descriptor)?;
            let output = invoke(&state.config, &path, OutputCapture::for_kind(descriptor.kind)).await?;
            Ok::<_, ServiceError>(split_lines(&output))
        }
        .await;

        if let Err(ref e) = lines {
            warn!("tarea {} falló: {}", task_id, e);
        }

        let result = complete(&state, lines);
        let status = if result.is_ok() {
            TaskStatus::Complete
        } else {
            TaskStatus::Failed
        };

        match finish_task(&state, &task_id, status) {
            Ok(()) => info!("tarea {} -> {:?}", task_id, status),
            Err(e) => warn!("no se pudo actualizar la tarea {}: {}", task_id, e),
        }

        // si el request ya no espera, el resultado queda sólo en el store
        let _ = tx.send(result);
    });

    rx.await
        .map_err(|_| ServiceError::Internal("job task ended without a result".to_string()))?
}

fn finish_task(state: &AppState, task_id: &str, status: TaskStatus) -> Result<(), ServiceError> {
    state.with_session(|s| s.set_task_status(task_id, status))??;
    Ok(())
}

/// Nombre de archivo del modelo dentro de `models/`. El nombre lo elige el
/// cliente, así que no puede traer separadores ni componentes como `..`.
fn model_file_name(name: &str) -> Result<String, ServiceError> {
    match Path::new(name).file_name().and_then(|n| n.to_str()) {
        Some(base) if base == name => Ok(format!("{name}.model")),
        _ => Err(ServiceError::InvalidRequest(format!("invalid model name: {name:?}"))),
    }
}

fn log_degraded<T>(task_id: &str, parsed: &Parsed<T>) {
    if !parsed.is_degraded() {
        return;
    }
    for metric in &parsed.degraded {
        warn!("tarea {}: métrica {} no legible, se usa 0", task_id, metric);
    }
}
