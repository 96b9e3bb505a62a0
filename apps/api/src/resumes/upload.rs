//! Per-file upload pipeline: dedup, parse, store.

use bytes::Bytes;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::parsing::ParsedResume;
use crate::resumes::store::{self, NewResume, UpsertOutcome};
use crate::state::AppState;
use crate::storage;

pub const DUPLICATE_MESSAGE: &str = "You have already parsed this resume.";
pub const SUCCESS_MESSAGE: &str = "Parsed successfully";
pub const STORAGE_FAILED_MESSAGE: &str = "Failed to store resume";
const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// One file taken from the multipart body.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadResult {
    pub filename: String,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_duplicate: bool,
}

impl UploadResult {
    fn ok(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            success: true,
            message: SUCCESS_MESSAGE.to_string(),
            is_duplicate: false,
        }
    }

    fn duplicate(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            success: false,
            message: DUPLICATE_MESSAGE.to_string(),
            is_duplicate: true,
        }
    }

    fn failed(filename: &str, message: impl Into<String>) -> Self {
        Self {
            filename: filename.to_string(),
            success: false,
            message: message.into(),
            is_duplicate: false,
        }
    }
}

/// SHA-256 of the raw file, lower-case hex.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Runs one file through the pipeline. Failures are reported in the result, never raised;
/// storage failures are logged in full and reported generically.
pub async fn ingest_file(state: &AppState, user_id: Uuid, file: UploadedFile) -> UploadResult {
    let filename = file.filename.clone();
    match try_ingest(state, user_id, file).await {
        Ok(result) => result,
        Err(e) => {
            error!("Error processing {filename}: {e}");
            UploadResult::failed(&filename, STORAGE_FAILED_MESSAGE)
        }
    }
}

async fn try_ingest(
    state: &AppState,
    user_id: Uuid,
    file: UploadedFile,
) -> Result<UploadResult, AppError> {
    let UploadedFile {
        filename,
        content_type,
        bytes,
    } = file;

    let hash = content_hash(&bytes);
    if store::find_duplicate(&state.db, user_id, &hash).await?.is_some() {
        info!("Duplicate upload of {filename} by user {user_id}");
        return Ok(UploadResult::duplicate(&filename));
    }

    let outcome = state.parser.process(bytes.clone(), &filename).await;
    if !outcome.success {
        let reason = outcome
            .error
            .unwrap_or_else(|| "Failed to parse".to_string());
        return Ok(UploadResult::failed(&filename, reason));
    }
    let data: ParsedResume = outcome.data.unwrap_or_default();

    let mime_type = content_type
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
    let s3_key = storage::object_key(user_id, &hash);
    let size_bytes = i64::try_from(bytes.len()).unwrap_or(i64::MAX);

    storage::put_file(&state.s3, &state.config.s3_bucket, &s3_key, bytes, &mime_type).await?;

    let outcome = store::upsert_resume(
        &state.db,
        NewResume {
            filename: &filename,
            data: &data,
            s3_key: &s3_key,
            mime_type: &mime_type,
            size_bytes,
            uploaded_by: user_id,
            content_hash: &hash,
        },
    )
    .await?;

    match outcome {
        UpsertOutcome::DuplicateContent => return Ok(UploadResult::duplicate(&filename)),
        UpsertOutcome::Stored {
            replaced_key: Some(old_key),
            ..
        } => remove_replaced_object(state, &old_key).await,
        UpsertOutcome::Stored { .. } => {}
    }

    Ok(UploadResult::ok(&filename))
}

/// Drops the object a same-filename upload replaced. Failures only cost storage.
async fn remove_replaced_object(state: &AppState, key: &str) {
    match store::s3_key_in_use(&state.db, key).await {
        Ok(false) => {
            if let Err(e) = storage::delete_file(&state.s3, &state.config.s3_bucket, key).await {
                warn!("Could not delete replaced object {key}: {e}");
            }
        }
        Ok(true) => {}
        Err(e) => warn!("Could not check replaced object {key}: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(content_hash(b"").len(), 64);
    }

    #[test]
    fn test_duplicate_flag_only_serialized_when_set() {
        let ok = serde_json::to_value(UploadResult::ok("a.pdf")).unwrap();
        assert_eq!(
            ok,
            serde_json::json!({"filename": "a.pdf", "success": true, "message": "Parsed successfully"})
        );

        let dup = serde_json::to_value(UploadResult::duplicate("a.pdf")).unwrap();
        assert_eq!(dup["is_duplicate"], true);
        assert_eq!(dup["message"], DUPLICATE_MESSAGE);
    }
}
