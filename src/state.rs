use std::sync::Arc;

use crate::{config::AppConfig, services::workflow::Workflow};

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub workflow: Arc<Workflow>,
}

impl AppState {
    pub fn new(config: AppConfig, workflow: Workflow) -> Self {
        Self {
            config,
            workflow: Arc::new(workflow),
        }
    }
}
