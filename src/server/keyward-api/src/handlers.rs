//! Request handlers.
//!
//! Handlers only translate between JSON/base64 and the envelope service.
//! Handlers that decode a payload ask the service to authorize the caller
//! first, so a denied caller gets 403 whatever the body holds.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use keyward_auth::Action;
use keyward_envelope::DeleteOutcome;

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use crate::types::{
    DecryptRequest, DecryptResponse, DeleteDataKeyResponse, EncryptRequest, EncryptResponse,
    GenerateDataKeyResponse, HealthResponse, RotateMasterKeyResponse,
};

fn decode_field(field: &str, value: &str) -> Result<Vec<u8>, ApiError> {
    BASE64
        .decode(value)
        .map_err(|_| ApiError::bad_request(format!("invalid base64 in {field}")))
}

/// `GET /v1/sys/health`
pub async fn health(State(state): State<AppState>) -> ApiResult<HealthResponse> {
    let status = state.service.status()?;

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_master_key_id: status.active_master_key_id,
        master_key_count: status.master_key_count,
    }))
}

/// `POST /v1/data-keys`
pub async fn generate_data_key(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> ApiResult<GenerateDataKeyResponse> {
    let generated = state.service.generate_data_key(&identity).await?;

    Ok(Json(GenerateDataKeyResponse {
        dek_record_id: generated.record_id,
        master_key_id: generated.master_key_id,
    }))
}

/// `POST /v1/encrypt`
pub async fn encrypt(
    State(state): State<AppState>,
    Caller(identity): Caller,
    payload: Result<Json<EncryptRequest>, JsonRejection>,
) -> ApiResult<EncryptResponse> {
    let Json(request) = payload?;
    state
        .service
        .authorize(&identity, Action::Encrypt, Some(request.dek_record_id.as_str()))?;
    let plaintext = decode_field("plaintext", &request.plaintext)?;

    let ciphertext = state
        .service
        .encrypt(&identity, &request.dek_record_id, &plaintext)
        .await?;

    Ok(Json(EncryptResponse {
        ciphertext: BASE64.encode(ciphertext),
    }))
}

/// `POST /v1/decrypt`
pub async fn decrypt(
    State(state): State<AppState>,
    Caller(identity): Caller,
    payload: Result<Json<DecryptRequest>, JsonRejection>,
) -> ApiResult<DecryptResponse> {
    let Json(request) = payload?;
    state
        .service
        .authorize(&identity, Action::Decrypt, Some(request.dek_record_id.as_str()))?;
    let ciphertext = decode_field("ciphertext", &request.ciphertext)?;

    let plaintext = state
        .service
        .decrypt(&identity, &request.dek_record_id, &ciphertext)
        .await?;

    Ok(Json(DecryptResponse {
        plaintext: BASE64.encode(plaintext.as_slice()),
    }))
}

/// `POST /v1/master-keys/rotate`
pub async fn rotate_master_key(
    State(state): State<AppState>,
    Caller(identity): Caller,
) -> ApiResult<RotateMasterKeyResponse> {
    let new_master_key_id = state.service.rotate_master_key(&identity)?;

    Ok(Json(RotateMasterKeyResponse { new_master_key_id }))
}

/// `DELETE /v1/data-keys/{record_id}`
pub async fn delete_data_key(
    State(state): State<AppState>,
    Caller(identity): Caller,
    Path(record_id): Path<String>,
) -> ApiResult<DeleteDataKeyResponse> {
    match state.service.delete_data_key(&identity, &record_id).await? {
        DeleteOutcome::Deleted => Ok(Json(DeleteDataKeyResponse { deleted: true })),
        DeleteOutcome::NotFound => Err(ApiError::not_found(format!(
            "data key not found: {record_id}"
        ))),
    }
}
