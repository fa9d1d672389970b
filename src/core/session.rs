use crate::common::{Config, FaceMatchError, Result};
use ort::{Environment, GraphOptimizationLevel, Session, SessionBuilder};
use std::path::Path;
use std::sync::Arc;

/// Builds an ONNX Runtime session for `model_path` with the configured optimization level.
pub(crate) fn build_session(
    config: &Config,
    name: &str,
    model_path: &Path,
) -> Result<(Arc<Environment>, Session)> {
    let environment = Arc::new(
        Environment::builder()
            .with_name(name)
            .build()
            .map_err(|e| FaceMatchError::Model(format!("Failed to create environment: {}", e)))?,
    );

    let model_path = config.resolve_model_path(model_path);
    if !model_path.exists() {
        return Err(FaceMatchError::Model(format!(
            "{} model not found at: {:?}",
            name, model_path
        )));
    }

    let opt_level = match config.performance.optimization_level {
        0 => GraphOptimizationLevel::Disable,
        1 => GraphOptimizationLevel::Level1,
        2 => GraphOptimizationLevel::Level2,
        _ => GraphOptimizationLevel::Level3,
    };

    let session = SessionBuilder::new(&environment)?
        .with_optimization_level(opt_level)?
        .with_model_from_file(&model_path)?;

    tracing::debug!("Loaded {} model from {:?}", name, model_path);
    Ok((environment, session))
}
