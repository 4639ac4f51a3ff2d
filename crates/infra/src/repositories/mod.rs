mod survey;

use std::sync::Arc;

use anyhow::bail;
use survey_domain::ports::surveys::SurveyRepository;

use crate::config::AppConfig;
use crate::db::DbConfig;

pub use survey::{InMemorySurveyRepository, SurrealSurveyRepository};

/// Opens the store selected by `data_backend`.
pub async fn open_survey_repository(
    config: &AppConfig,
) -> anyhow::Result<Arc<dyn SurveyRepository>> {
    match config.data_backend.as_str() {
        "memory" => {
            tracing::info!("using in-memory survey store");
            Ok(Arc::new(InMemorySurveyRepository::new()))
        }
        "surreal" => {
            let repository =
                SurrealSurveyRepository::new(&DbConfig::from_app_config(config)).await?;
            Ok(Arc::new(repository))
        }
        other => bail!("unknown data_backend '{other}', expected 'memory' or 'surreal'"),
    }
}
