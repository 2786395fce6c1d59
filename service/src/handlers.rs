use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use common::{
    Dataset, InferenceRequest, InferenceResponse, InferenceResult, Model, ModelQuery, Session,
    Task, TrainingRequest, TreeQuery,
};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::ServiceError;
use crate::orchestrator;
use crate::state::AppState;
use crate::uploads;

/// Tamaño máximo de un archivo subido (datasets y modelos).
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(get_status))
        .route("/tasks/:id", get(get_task))
        .route("/datasets", get(list_datasets))
        .route("/models", get(get_models))
        .route("/models/tree", get(get_model_tree))
        .route("/results", get(list_results))
        .route("/train", post(start_training))
        .route("/infer", post(infer))
        .route("/data/upload", post(upload_data))
        .route("/model/upload", post(upload_model))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Tareas, datasets, modelos y resultados de la sesión completa
async fn get_status(State(state): State<AppState>) -> Result<Json<Session>, ServiceError> {
    Ok(Json(state.snapshot()?))
}

// Estado de una sola tarea, para quien espera un entrenamiento largo
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, ServiceError> {
    let task = state.with_session(|s| s.find_task(&id).cloned())??;
    Ok(Json(task))
}

async fn list_datasets(State(state): State<AppState>) -> Result<Json<Vec<Dataset>>, ServiceError> {
    Ok(Json(state.with_session(|s| s.datasets.clone())?))
}

async fn list_results(
    State(state): State<AppState>,
) -> Result<Json<Vec<InferenceResult>>, ServiceError> {
    Ok(Json(state.with_session(|s| s.results.clone())?))
}

// Con `modelid` descarga el archivo del modelo; sin él (o si no existe) lista los modelos
async fn get_models(
    State(state): State<AppState>,
    Query(query): Query<ModelQuery>,
) -> Result<Response, ServiceError> {
    let (found, models) = state.with_session(|s| {
        let found = query
            .model_id
            .as_deref()
            .and_then(|id| s.find_model(id).ok().cloned());
        (found, s.models.clone())
    })?;

    match (found, query.model_id) {
        (Some(model), _) => {
            info!("descargando modelo {}...", model.id);
            let bytes = tokio::fs::read(&model.path).await.map_err(|e| {
                ServiceError::Internal(format!("could not read {}: {e}", model.path))
            })?;
            Ok(([(header::CONTENT_TYPE, "application/octet-stream")], bytes).into_response())
        }
        (None, Some(id)) => {
            info!("modelo {} no encontrado, devolviendo lista de modelos", id);
            Ok(Json(models).into_response())
        }
        (None, None) => Ok(Json(models).into_response()),
    }
}

async fn get_model_tree(
    State(state): State<AppState>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<Vec<String>>, ServiceError> {
    let lines = orchestrator::list_model_tree(&state, &query.model_id).await?;
    Ok(Json(lines))
}

// Entrena un modelo nuevo; responde cuando el worker termina
async fn start_training(
    State(state): State<AppState>,
    Json(req): Json<TrainingRequest>,
) -> Result<Json<Model>, ServiceError> {
    let model = orchestrator::start_training(&state, req).await?;
    Ok(Json(model))
}

async fn infer(
    State(state): State<AppState>,
    Json(req): Json<InferenceRequest>,
) -> Result<Json<InferenceResponse>, ServiceError> {
    let resp = orchestrator::run_inference(&state, req).await?;
    Ok(Json(resp))
}

async fn upload_data(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Dataset>, ServiceError> {
    let (file_name, bytes) = read_file_field(multipart).await?;
    let dataset = run_blocking(move || uploads::upload_dataset(&state, &file_name, &bytes)).await?;
    Ok(Json(dataset))
}

async fn upload_model(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Model>, ServiceError> {
    info!("subiendo modelo...");
    let (file_name, bytes) = read_file_field(multipart).await?;
    let model = run_blocking(move || uploads::upload_model(&state, &file_name, &bytes)).await?;
    Ok(Json(model))
}

/// Escritura a disco y conteo del CSV fuera del runtime async: un archivo
/// grande no frena al resto de los requests.
async fn run_blocking<T, F>(work: F) -> Result<T, ServiceError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Internal(format!("upload task failed: {e}")))?
}

/// Busca el campo `file` del formulario y devuelve su nombre y contenido.
async fn read_file_field(mut multipart: Multipart) -> Result<(String, Vec<u8>), ServiceError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::Upload(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ServiceError::Upload("field 'file' has no file name".to_string()))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ServiceError::Upload(e.to_string()))?;
        return Ok((file_name, bytes.to_vec()));
    }

    Err(ServiceError::Upload("missing multipart field 'file'".to_string()))
}
