//! HTTP handlers.

use crate::error::ServerError;
use crate::source::SourceError;
use crate::state::AppState;
use axum::Json;
use axum::body::Body;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use handoff_token::TokenError;
use handoff_vault::handle::log_prefix;
use handoff_vault::seal;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub async fn healthz() -> Json<serde_json::Value> {
    Json(json!({ "ok": true, "service": "handoff-server" }))
}

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    /// The identity token.
    pub id: Option<String>,
}

/// What the viewer needs to fetch and decrypt one artifact.
#[derive(Debug, Serialize, Deserialize)]
pub struct ViewResponse {
    pub handle: String,
    /// Base64 AES-128 key.
    pub key: String,
    /// Base64 CBC IV.
    pub iv: String,
    pub content_type: String,
    pub expires_in_ms: u64,
    pub artifact_url: String,
}

/// `GET /view?id=<token>`
///
/// Validates the token, seals the subject's artifact under a fresh key and
/// parks the ciphertext in the vault. A missing `id` or an unparseable query
/// string is treated like an empty, malformed token.
pub async fn view(
    State(state): State<AppState>,
    query: Result<Query<ViewQuery>, QueryRejection>,
) -> Result<Response, ServerError> {
    let token = match query {
        Ok(Query(query)) => query.id.unwrap_or_default(),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "Unparseable view query");
            String::new()
        }
    };

    let subject = match state.validator().decode(&token) {
        Ok(subject) => subject,
        Err(e) => return Err(reject_token(&state, e).await),
    };
    state.audit().token_accepted(&subject).await;

    let artifact = match state.source().fetch(&subject).await {
        Ok(artifact) => artifact,
        Err(SourceError::NotFound) | Err(SourceError::InvalidSubject) => {
            tracing::info!(subject = %subject, "No artifact for subject");
            state.audit().artifact_missing(&subject).await;
            return Err(ServerError::NotFound);
        }
        Err(e) => {
            state
                .audit()
                .internal_failure("artifact_source", Some(&subject))
                .await;
            return Err(ServerError::Internal(e.to_string()));
        }
    };

    let sealed = seal(&artifact.bytes);
    let key = STANDARD.encode(sealed.key);
    let iv = STANDARD.encode(sealed.iv);
    let ciphertext_len = sealed.ciphertext.len();

    let vault = state.vault();
    let handle = vault.store_sealed(sealed);
    state
        .audit()
        .artifact_stored(&subject, handle.log_prefix(), ciphertext_len)
        .await;
    tracing::info!(
        subject = %subject,
        handle = %handle.log_prefix(),
        bytes = ciphertext_len,
        "Artifact sealed for delivery"
    );

    let body = ViewResponse {
        artifact_url: format!("{}/artifact/{}", state.base_url(), handle),
        handle: handle.into_string(),
        key,
        iv,
        content_type: artifact.content_type,
        expires_in_ms: u64::try_from(vault.default_ttl().as_millis()).unwrap_or(u64::MAX),
    };

    let mut response = Json(body).into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}

async fn reject_token(state: &AppState, err: TokenError) -> ServerError {
    let kind = err.kind();
    if kind.is_unauthorized() {
        tracing::info!(kind = %kind, "Identity token rejected");
        state.audit().token_rejected(kind.as_str()).await;
    } else {
        state.audit().internal_failure("token_validation", None).await;
    }
    ServerError::from(err)
}

/// `GET /artifact/{handle}`
///
/// Releases the ciphertext exactly once.
pub async fn artifact(
    State(state): State<AppState>,
    Path(handle): Path<String>,
) -> Result<Response, ServerError> {
    let entry = match state.vault().consume(&handle) {
        Ok(entry) => entry,
        Err(_) => {
            tracing::info!(handle = %log_prefix(&handle), "Vault miss");
            state.audit().vault_miss(log_prefix(&handle)).await;
            return Err(ServerError::NotFound);
        }
    };

    let ciphertext = entry.into_ciphertext();
    state
        .audit()
        .artifact_delivered(log_prefix(&handle), ciphertext.len())
        .await;

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CACHE_CONTROL, "no-store, no-cache")
        .header(header::PRAGMA, "no-cache")
        .body(Body::from(ciphertext))
        .map_err(|e| ServerError::Internal(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct GenerateLinkQuery {
    pub subject: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateLinkResponse {
    pub subject: String,
    pub token: String,
    pub viewer_url: String,
}

/// `GET /generate-link?subject=...`
///
/// Development helper that mints a fresh token for any subject.
pub async fn generate_link(
    State(state): State<AppState>,
    Query(query): Query<GenerateLinkQuery>,
) -> Result<Json<GenerateLinkResponse>, ServerError> {
    let issuer = state.issuer().ok_or(ServerError::NotFound)?;
    let subject = query
        .subject
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ServerError::BadRequest("Missing 'subject' parameter".to_string()))?;

    let token = match issuer.encode(&subject) {
        Ok(token) => token,
        Err(TokenError::InvalidSubject(reason)) => {
            return Err(ServerError::BadRequest(format!("Invalid subject: {reason}")));
        }
        Err(e) => return Err(ServerError::Internal(e.to_string())),
    };
    state.audit().token_issued(&subject).await;

    Ok(Json(GenerateLinkResponse {
        viewer_url: format!("{}/view?id={}", state.base_url(), token),
        subject,
        token,
    }))
}
