mod surveys;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::{
    Json, Router,
    http::{StatusCode, header},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;
use survey_domain::error::DomainError;
use survey_domain::token::SurveyToken;

use crate::{error::ApiError, middleware as app_middleware, observability, state::AppState};

pub fn router(state: AppState) -> Router {
    let surveys = Router::new()
        .route("/surveys", post(surveys::create_survey))
        .route(
            "/surveys/:token",
            get(surveys::get_survey)
                .put(surveys::replace_survey)
                .delete(surveys::delete_survey),
        )
        .route(
            "/surveys/:token/responses",
            post(surveys::submit_response).get(surveys::list_responses),
        )
        .route(
            "/surveys/:token/:number",
            put(surveys::edit_question).delete(surveys::delete_question),
        );

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .merge(surveys)
        .layer(middleware::from_fn(app_middleware::metrics_layer))
        .layer(app_middleware::timeout_layer(state.config.request_timeout()))
        .layer(app_middleware::trace_layer())
        .layer(app_middleware::propagate_request_id_layer())
        .layer(app_middleware::set_request_id_layer())
        .layer(middleware::from_fn(
            app_middleware::correlation_id_middleware,
        ));

    if !state.config.is_test() {
        app = app.layer(app_middleware::rate_limit_layer());
    }

    app.with_state(state)
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    environment: String,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        environment: state.config.app_env.clone(),
    })
}

async fn metrics() -> Response {
    match observability::render_metrics() {
        Some(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        None => ApiError::Internal.into_response(),
    }
}

fn map_domain_error(err: DomainError) -> ApiError {
    match err {
        DomainError::Validation(err) => {
            observability::register_validation_failure(err.reason_code());
            ApiError::Validation(err.to_string())
        }
        DomainError::BadToken => ApiError::InvalidToken,
        DomainError::NotFound => ApiError::NotFound,
        DomainError::EmptyResult => ApiError::NoResponses,
        DomainError::Conflict => ApiError::Conflict,
        DomainError::Store(message) => {
            tracing::error!(error = %message, "survey store failure");
            ApiError::Internal
        }
    }
}

/// Malformed or mistyped JSON bodies are reported as 400, like every other
/// input problem.
fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => {
            observability::register_validation_failure("malformed_body");
            Err(ApiError::Validation(rejection.body_text()))
        }
    }
}

fn parse_token(raw: &str) -> Result<SurveyToken, ApiError> {
    SurveyToken::parse(raw).map_err(map_domain_error)
}
