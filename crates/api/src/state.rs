use std::sync::Arc;

use survey_domain::ports::surveys::SurveyRepository;
use survey_domain::surveys::SurveyService;
use survey_infra::config::AppConfig;
use survey_infra::repositories::open_survey_repository;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub surveys: SurveyService,
}

impl AppState {
    pub async fn new(config: AppConfig) -> anyhow::Result<Self> {
        let repository = open_survey_repository(&config).await?;
        Ok(Self::with_survey_repository(config, repository))
    }

    pub fn with_survey_repository(
        config: AppConfig,
        repository: Arc<dyn SurveyRepository>,
    ) -> Self {
        let surveys = SurveyService::new(repository, config.survey_service_config());
        Self { config, surveys }
    }
}
