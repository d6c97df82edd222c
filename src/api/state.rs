use std::sync::Arc;
use std::time::Duration;

use crate::report::ReportEngine;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ReportEngine>,
    pub report_timeout: Duration,
    pub cors_origin: String,
}

impl AppState {
    pub fn new(engine: ReportEngine, report_timeout: Duration) -> Self {
        Self {
            engine: Arc::new(engine),
            report_timeout,
            cors_origin: "*".to_string(),
        }
    }

    pub fn with_cors_origin(mut self, origin: impl Into<String>) -> Self {
        self.cors_origin = origin.into();
        self
    }
}
