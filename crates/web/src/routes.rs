//! Route handlers.

use crate::error::AppError;
use crate::page::{self, FormState};
use crate::state::AppState;
use axum::extract::{Form, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::Router;
use estudo_core::{Error, RenderedArtifact, Selection};
use serde::Deserialize;
use std::sync::Arc;

/// Values submitted by the selection form.
#[derive(Debug, Default, Deserialize)]
pub struct SelectionQuery {
    #[serde(default)]
    pub entity: String,

    #[serde(default)]
    pub cargo: String,

    /// Client shown when the form was last rendered.
    #[serde(default)]
    pub prev_entity: Option<String>,
}

/// Body of `POST /generate`.
#[derive(Debug, Deserialize)]
pub struct GenerateForm {
    #[serde(default)]
    pub entity: String,

    #[serde(default)]
    pub cargo: String,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/generate", post(generate))
        .route("/reload", post(reload))
        .route("/health", get(health))
        .with_state(state)
}

async fn index(
    State(state): State<AppState>,
    Query(query): Query<SelectionQuery>,
) -> Result<Html<String>, AppError> {
    let table = state.tables.get()?;
    let form = FormState::from_query(
        &table,
        &query.entity,
        &query.cargo,
        query.prev_entity.as_deref(),
    );
    Ok(Html(page::render_form(&table, &form)))
}

async fn generate(
    State(state): State<AppState>,
    Form(form): Form<GenerateForm>,
) -> Result<Response, AppError> {
    let table = state.tables.get()?;
    let selection = Selection::new(form.entity, form.cargo);

    if !selection.is_complete() || table.find(&selection.entity_name, &selection.cargo_name).is_none() {
        log::warn!(
            "Rejected selection '{}' / '{}'",
            selection.entity_name,
            selection.cargo_name
        );
        let failed = FormState::Failed {
            message: "Selecione um cliente e uma carga presentes na tabela.".to_string(),
            selection,
        };
        return Ok((
            StatusCode::UNPROCESSABLE_ENTITY,
            Html(page::render_form(&table, &failed)),
        )
            .into_response());
    }

    let generator = Arc::clone(&state.generator);
    let request = selection.clone();
    let result = tokio::task::spawn_blocking(move || generator.generate(&request))
        .await
        .map_err(|e| AppError::Internal(format!("generation task failed: {}", e)))?;

    match result {
        Ok(artifact) => Ok(download(artifact)),
        Err(e) => {
            log::error!(
                "Generation failed for '{}' / '{}': {}",
                selection.entity_name,
                selection.cargo_name,
                e
            );
            let status = match &e {
                Error::InvalidSelection(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            let failed = FormState::Failed {
                message: e.to_string(),
                selection,
            };
            Ok((status, Html(page::render_form(&table, &failed))).into_response())
        }
    }
}

async fn reload(State(state): State<AppState>) -> Redirect {
    state.tables.invalidate();
    Redirect::to("/")
}

async fn health() -> &'static str {
    "ok"
}

/// Offer the generated study as an attachment.
fn download(artifact: RenderedArtifact) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        ascii_fallback(&artifact.filename),
        urlencoding::encode(&artifact.filename)
    );
    (
        [
            (header::CONTENT_TYPE, artifact.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        artifact.bytes,
    )
        .into_response()
}

/// Filename safe for the quoted `filename` parameter.
fn ascii_fallback(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect()
}
