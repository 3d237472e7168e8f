use std::pin::Pin;
use std::sync::Arc;

use futures::task::{Context, Poll};
use futures::Future;
use tower::Service;

use super::engine::AssessmentEngine;
use super::types::AssessmentResult;
use crate::error::EngineError;

/// Tower front for request-serving hosts. Takes encoded image bytes and runs the
/// blocking assessment on tokio's blocking pool.
#[derive(Clone)]
pub struct AssessmentService {
    engine: Arc<AssessmentEngine>,
}

impl AssessmentService {
    pub fn new(engine: Arc<AssessmentEngine>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &Arc<AssessmentEngine> {
        &self.engine
    }
}

impl Service<Vec<u8>> for AssessmentService {
    type Response = AssessmentResult;
    type Error = EngineError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), EngineError>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, bytes: Vec<u8>) -> Self::Future {
        let engine = self.engine.clone();

        Box::pin(async move {
            tokio::task::spawn_blocking(move || engine.assess_bytes(&bytes))
                .await
                .map_err(|e| EngineError::Task(e.to_string()))?
        })
    }
}
