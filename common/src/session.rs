use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{Dataset, EntityKind, InferenceResult, Model, NewDataset, NewModel, NotFound};
use crate::ids::{format_id, next_id};
use crate::task::{Task, TaskStatus};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error("task {task_id} cannot go from {from:?} to {to:?}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Catálogo en memoria de datasets, modelos, tareas y resultados.
///
/// No hace locking: quien lo comparte entre requests lo guarda detrás de un
/// mutex y hace cada "leer máximo + insertar" con el lock tomado.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub models: Vec<Model>,
    pub datasets: Vec<Dataset>,
    pub results: Vec<InferenceResult>,
    pub tasks: Vec<Task>,

    /// Ids de modelos reservados por entrenamientos en curso.
    #[serde(skip)]
    reserved_models: Vec<u32>,

    /// Mayor id de modelo entregado hasta ahora, aunque la reserva se haya
    /// devuelto. Un entrenamiento fallido no cede su id a otro modelo.
    #[serde(skip)]
    model_high_water: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /* ---------------- datasets ---------------- */

    pub fn add_dataset(&mut self, new: NewDataset) -> Dataset {
        let id_num = next_id(self.datasets.iter().map(|d| d.id_num));
        let dataset = new.into_dataset(id_num);
        self.datasets.push(dataset.clone());
        dataset
    }

    // Recorre todo el catálogo; NotFound sólo después de agotar candidatos.
    pub fn find_dataset(&self, id: &str) -> Result<&Dataset, NotFound> {
        self.datasets
            .iter()
            .find(|d| d.id == id)
            .ok_or_else(|| NotFound::new(EntityKind::Dataset, id))
    }

    /* ---------------- modelos ---------------- */

    /// Reserva el próximo id de modelo para un entrenamiento que todavía no
    /// terminó. Nunca devuelve un número ya entregado, ni siquiera uno cuya
    /// reserva se liberó.
    pub fn reserve_model_id(&mut self) -> u32 {
        let id_num = next_id(
            self.models
                .iter()
                .map(|m| m.id_num)
                .chain(self.reserved_models.iter().copied())
                .chain(std::iter::once(self.model_high_water)),
        );
        self.reserved_models.push(id_num);
        self.model_high_water = id_num;
        id_num
    }

    /// Devuelve una reserva que no llegó a convertirse en modelo. El número
    /// queda sin usar.
    pub fn release_model_id(&mut self, id_num: u32) {
        self.reserved_models.retain(|n| *n != id_num);
    }

    /// Inserta un modelo cuyo id ya fue reservado con `reserve_model_id`.
    pub fn insert_model(&mut self, model: Model) -> Model {
        self.release_model_id(model.id_num);
        self.models.push(model.clone());
        model
    }

    pub fn add_model(&mut self, new: NewModel) -> Model {
        let id_num = self.reserve_model_id();
        self.insert_model(new.into_model(id_num))
    }

    pub fn find_model(&self, id: &str) -> Result<&Model, NotFound> {
        self.models
            .iter()
            .find(|m| m.id == id)
            .ok_or_else(|| NotFound::new(EntityKind::Model, id))
    }

    /* ---------------- tareas ---------------- */

    pub fn add_task(&mut self, model_id: &str) -> Task {
        let id_num = next_id(self.tasks.iter().map(|t| t.id_num));
        let task = Task {
            id: format_id(EntityKind::Task, id_num),
            id_num,
            model_id: model_id.to_string(),
            status: TaskStatus::Running,
            created_at: Utc::now(),
            finished_at: None,
        };
        self.tasks.push(task.clone());
        task
    }

    pub fn find_task(&self, id: &str) -> Result<&Task, NotFound> {
        self.tasks
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| NotFound::new(EntityKind::Task, id))
    }

    /// Actualiza el estado de la tarea con ese id (nunca "la última de la lista").
    pub fn set_task_status(&mut self, task_id: &str, status: TaskStatus) -> Result<Task, SessionError> {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == task_id)
            .ok_or_else(|| NotFound::new(EntityKind::Task, task_id))?;

        if !task.status.can_transition_to(status) {
            return Err(SessionError::InvalidTransition {
                task_id: task_id.to_string(),
                from: task.status,
                to: status,
            });
        }

        task.status = status;
        if status.is_finished() {
            task.finished_at = Some(Utc::now());
        }
        Ok(task.clone())
    }

    /* ---------------- resultados ---------------- */

    pub fn add_result(&mut self, result: InferenceResult) {
        self.results.push(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ModelMetrics;

    fn new_dataset(name: &str) -> NewDataset {
        NewDataset {
            name: name.to_string(),
            path: format!("/storage/datasets/{name}.csv"),
            datapoints: 10,
        }
    }

    fn new_model(name: &str) -> NewModel {
        NewModel {
            name: name.to_string(),
            trained_dataset: "d1".to_string(),
            path: format!("/storage/models/{name}.model"),
            infer_name: "y".to_string(),
            features: vec!["x".to_string()],
            metrics: ModelMetrics::default(),
        }
    }

    #[test]
    fn added_dataset_can_be_found() {
        let mut session = Session::new();
        let d = session.add_dataset(new_dataset("sales"));

        assert_eq!(d.id, "d1");
        assert_eq!(session.find_dataset("d1").unwrap(), &d);
    }

    #[test]
    fn dataset_ids_ignore_model_ids() {
        let mut session = Session::new();
        session.add_model(new_model("a"));
        session.add_model(new_model("b"));

        let d = session.add_dataset(new_dataset("sales"));
        assert_eq!(d.id, "d1");
    }

    #[test]
    fn missing_lookups_report_kind_and_id() {
        let mut session = Session::new();
        session.add_dataset(new_dataset("a"));
        session.add_dataset(new_dataset("b"));

        assert_eq!(
            session.find_dataset("d99").unwrap_err(),
            NotFound::new(EntityKind::Dataset, "d99")
        );
        assert_eq!(
            session.find_model("m1").unwrap_err(),
            NotFound::new(EntityKind::Model, "m1")
        );
        // el primero no coincide pero el segundo sí
        assert_eq!(session.find_dataset("d2").unwrap().name, "b");
    }

    #[test]
    fn reserved_ids_are_not_handed_out_twice() {
        let mut session = Session::new();
        let a = session.reserve_model_id();
        let b = session.reserve_model_id();
        assert_eq!((a, b), (1, 2));

        // una subida mientras hay entrenamientos en curso salta las reservas
        let uploaded = session.add_model(new_model("uploaded"));
        assert_eq!(uploaded.id, "m3");

        session.insert_model(new_model("a").into_model(a));
        session.release_model_id(b);
        assert_eq!(session.reserve_model_id(), 4);
    }

    #[test]
    fn released_reservation_is_not_reused() {
        let mut session = Session::new();
        let a = session.reserve_model_id();
        session.release_model_id(a);
        assert_eq!(session.reserve_model_id(), a + 1);

        // tampoco por una subida
        let uploaded = session.add_model(new_model("uploaded"));
        assert_eq!(uploaded.id, "m3");
    }

    #[test]
    fn task_status_is_addressed_by_id() {
        let mut session = Session::new();
        let t1 = session.add_task("m1");
        let t2 = session.add_task("m2");
        assert_eq!((t1.id.as_str(), t2.id.as_str()), ("t1", "t2"));

        let done = session.set_task_status("t1", TaskStatus::Complete).unwrap();
        assert_eq!(done.status, TaskStatus::Complete);
        assert!(done.finished_at.is_some());

        // t2, la última de la lista, sigue corriendo
        assert_eq!(session.find_task("t2").unwrap().status, TaskStatus::Running);
    }

    #[test]
    fn finished_task_cannot_restart() {
        let mut session = Session::new();
        session.add_task("m1");
        session.set_task_status("t1", TaskStatus::Failed).unwrap();

        let err = session.set_task_status("t1", TaskStatus::Running).unwrap_err();
        assert!(matches!(err, SessionError::InvalidTransition { .. }));
    }

    #[test]
    fn unknown_task_is_not_found() {
        let mut session = Session::new();
        let err = session.set_task_status("t5", TaskStatus::Complete).unwrap_err();
        assert_eq!(err, SessionError::NotFound(NotFound::new(EntityKind::Task, "t5")));
    }

    #[test]
    fn results_are_appended() {
        let mut session = Session::new();
        session.add_result(InferenceResult {
            model_id: "m1".to_string(),
            dataset_id: "d1".to_string(),
            tree: String::new(),
            precision: "0.9".to_string(),
            recall: "0.8".to_string(),
        });
        assert_eq!(session.results.len(), 1);
    }

    #[test]
    fn snapshot_serializes_without_reservations() {
        let mut session = Session::new();
        session.reserve_model_id();
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("reserved_models").is_none());
        assert!(json.get("model_high_water").is_none());
        assert!(json["models"].as_array().unwrap().is_empty());
    }
}
