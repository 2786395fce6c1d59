// service/src/state.rs

use common::Session;
use std::sync::{Arc, Mutex};

use crate::config::ServiceConfig;
use crate::error::ServiceError;

/// Estado compartido entre requests. La sesión es la única fuente de verdad
/// y toda lectura/escritura pasa por el mutex.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<Mutex<Session>>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(config: ServiceConfig, session: Session) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            config: Arc::new(config),
        }
    }

    /// Ejecuta `f` con el lock tomado. El lock nunca cruza un `.await`.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut Session) -> R) -> Result<R, ServiceError> {
        let mut session = self
            .session
            .lock()
            .map_err(|_| ServiceError::StoreUnavailable)?;
        Ok(f(&mut session))
    }

    pub fn snapshot(&self) -> Result<Session, ServiceError> {
        self.with_session(|s| s.clone())
    }
}
