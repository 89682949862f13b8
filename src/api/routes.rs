//! REST endpoints for the collaborator stores and the campaign state machine.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use uuid::Uuid;

use crate::attachments::{NewAttachment, guess_media_type};
use crate::campaign::{CampaignState, CancelHandle, Orchestrator, StartRequest};
use crate::contacts::ContactImporter;
use crate::dispatch::RelayCredentials;
use crate::error::{CampaignError, Error, StoreError};
use crate::generation::DraftEdit;
use crate::store::{AttachmentStore, ContactStore, TemplateStore};
use crate::templates::NewTemplate;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    pub owner_id: String,
    pub contacts: Arc<dyn ContactStore>,
    pub templates: Arc<dyn TemplateStore>,
    pub attachments: Arc<dyn AttachmentStore>,
    pub importer: Arc<ContactImporter>,
    pub orchestrator: Arc<Mutex<Orchestrator>>,
    /// Cloned out of the orchestrator so cancel works while a step holds the lock.
    pub cancel: CancelHandle,
}

impl ApiState {
    pub fn new(
        owner_id: impl Into<String>,
        contacts: Arc<dyn ContactStore>,
        templates: Arc<dyn TemplateStore>,
        attachments: Arc<dyn AttachmentStore>,
        orchestrator: Orchestrator,
    ) -> Self {
        let cancel = orchestrator.cancel_handle();
        Self {
            owner_id: owner_id.into(),
            importer: Arc::new(ContactImporter::new(Arc::clone(&contacts))),
            contacts,
            templates,
            attachments,
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            cancel,
        }
    }
}

/// Build the Axum router.
pub fn api_routes(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/contacts", get(list_contacts))
        .route("/api/contacts/import", post(import_contacts))
        .route("/api/templates", get(list_templates).post(create_template))
        .route("/api/attachments", get(list_attachments).post(upload_attachment))
        .route("/api/campaign", get(campaign_status))
        .route("/api/campaign/report", get(campaign_report))
        .route("/api/campaign/start", post(start_campaign))
        .route("/api/campaign/approve", post(approve_draft))
        .route("/api/campaign/edit", post(edit_draft))
        .route("/api/campaign/regenerate", post(regenerate_draft))
        .route("/api/campaign/skip", post(skip_draft))
        .route("/api/campaign/cancel", post(cancel_campaign))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn error_json(status: StatusCode, message: impl std::fmt::Display) -> Response {
    (
        status,
        Json(serde_json::json!({"error": message.to_string()})),
    )
        .into_response()
}

fn store_error(e: StoreError) -> Response {
    match e {
        StoreError::NotFound { .. } => error_json(StatusCode::NOT_FOUND, e),
        StoreError::Constraint(_) => error_json(StatusCode::UNPROCESSABLE_ENTITY, e),
        StoreError::Io(_) => error_json(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

fn campaign_error(e: CampaignError) -> Response {
    match e {
        CampaignError::Validation(_) => error_json(StatusCode::UNPROCESSABLE_ENTITY, e),
        CampaignError::InvalidTransition { .. } => error_json(StatusCode::CONFLICT, e),
        CampaignError::Dispatch(_) => error_json(StatusCode::BAD_GATEWAY, e),
        CampaignError::Store(e) => store_error(e),
    }
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

// ── Contacts ────────────────────────────────────────────────────────────

async fn list_contacts(State(state): State<ApiState>) -> Response {
    match state.contacts.list(&state.owner_id).await {
        Ok(contacts) => Json(contacts).into_response(),
        Err(e) => store_error(e),
    }
}

/// POST /api/contacts/import — body is the raw CSV payload.
async fn import_contacts(State(state): State<ApiState>, body: Bytes) -> Response {
    match state.importer.import(&state.owner_id, &body).await {
        Ok(report) => Json(report).into_response(),
        Err(Error::Parse(e)) => error_json(StatusCode::BAD_REQUEST, e),
        Err(Error::Store(e)) => store_error(e),
        Err(e) => error_json(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

// ── Templates ───────────────────────────────────────────────────────────

async fn list_templates(State(state): State<ApiState>) -> Response {
    match state.templates.list(&state.owner_id).await {
        Ok(templates) => Json(templates).into_response(),
        Err(e) => store_error(e),
    }
}

async fn create_template(
    State(state): State<ApiState>,
    Json(template): Json<NewTemplate>,
) -> Response {
    match state.templates.create(&state.owner_id, template).await {
        Ok(created) => {
            info!(template = %created.id, name = %created.name, "Template created");
            (StatusCode::CREATED, Json(created)).into_response()
        }
        Err(e) => store_error(e),
    }
}

// ── Attachments ─────────────────────────────────────────────────────────

async fn list_attachments(State(state): State<ApiState>) -> Response {
    match state.attachments.list(&state.owner_id).await {
        Ok(attachments) => Json(attachments).into_response(),
        Err(e) => store_error(e),
    }
}

#[derive(Deserialize)]
struct UploadQuery {
    filename: String,
    file_type: Option<String>,
}

/// POST /api/attachments?filename=cv.pdf[&file_type=application/pdf] — body is the file.
async fn upload_attachment(
    State(state): State<ApiState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Response {
    if query.filename.trim().is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "filename is required");
    }
    let file_type = query
        .file_type
        .unwrap_or_else(|| guess_media_type(&query.filename).to_string());
    let meta = NewAttachment::new(query.filename, file_type);

    match state
        .attachments
        .create(&state.owner_id, body.to_vec(), meta)
        .await
    {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => store_error(e),
    }
}

// ── Campaign ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CredentialsBody {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct StartBody {
    #[serde(default)]
    contact_ids: Vec<Uuid>,
    template_id: Option<Uuid>,
    #[serde(default)]
    attachment_ids: Vec<Uuid>,
    inline_image_id: Option<Uuid>,
    credentials: Option<CredentialsBody>,
}

async fn campaign_status(State(state): State<ApiState>) -> Response {
    Json(state.orchestrator.lock().await.status()).into_response()
}

async fn campaign_report(State(state): State<ApiState>) -> Response {
    match state.orchestrator.lock().await.last_report() {
        Some(report) => Json(report).into_response(),
        None => error_json(StatusCode::NOT_FOUND, "No campaign has finished yet"),
    }
}

async fn start_campaign(State(state): State<ApiState>, Json(body): Json<StartBody>) -> Response {
    let request = StartRequest {
        contact_ids: body.contact_ids,
        template_id: body.template_id,
        attachment_ids: body.attachment_ids,
        inline_image_id: body.inline_image_id,
        credentials: body
            .credentials
            .map(|c| RelayCredentials::new(c.username, c.password)),
    };
    let mut orchestrator = state.orchestrator.lock().await;
    match orchestrator.start(request).await {
        Ok(status) => Json(status).into_response(),
        Err(e) => campaign_error(e),
    }
}

async fn approve_draft(State(state): State<ApiState>) -> Response {
    let mut orchestrator = state.orchestrator.lock().await;
    match orchestrator.approve().await {
        Ok(status) => Json(status).into_response(),
        Err(CampaignError::Dispatch(e)) => {
            warn!(error = %e, "Send failed from API approve");
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({
                    "error": e.to_string(),
                    "status": orchestrator.status(),
                })),
            )
                .into_response()
        }
        Err(e) => campaign_error(e),
    }
}

async fn edit_draft(State(state): State<ApiState>, Json(edit): Json<DraftEdit>) -> Response {
    if edit.is_empty() {
        return error_json(StatusCode::BAD_REQUEST, "edit needs a subject or body");
    }
    let mut orchestrator = state.orchestrator.lock().await;
    match orchestrator.edit(edit) {
        Ok(status) => Json(status).into_response(),
        Err(e) => campaign_error(e),
    }
}

async fn regenerate_draft(State(state): State<ApiState>) -> Response {
    let mut orchestrator = state.orchestrator.lock().await;
    match orchestrator.regenerate().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => campaign_error(e),
    }
}

async fn skip_draft(State(state): State<ApiState>) -> Response {
    let mut orchestrator = state.orchestrator.lock().await;
    match orchestrator.skip().await {
        Ok(status) => Json(status).into_response(),
        Err(e) => campaign_error(e),
    }
}

/// Trips the cancel flag before taking the lock, so a step in progress
/// stops as soon as its external call returns. Cancelling an already
/// cancelled run returns its status.
async fn cancel_campaign(State(state): State<ApiState>) -> Response {
    let mut orchestrator = {
        let active = state.orchestrator.try_lock().map(|o| o.state().is_active());
        if !matches!(active, Ok(false)) {
            state.cancel.cancel();
        }
        state.orchestrator.lock().await
    };

    if orchestrator.state().is_active() {
        match orchestrator.cancel() {
            Ok(status) => Json(status).into_response(),
            Err(e) => campaign_error(e),
        }
    } else if orchestrator.state() == CampaignState::Cancelled {
        Json(orchestrator.status()).into_response()
    } else {
        campaign_error(CampaignError::InvalidTransition {
            state: orchestrator.state().to_string(),
            action: "cancel".to_string(),
        })
    }
}
