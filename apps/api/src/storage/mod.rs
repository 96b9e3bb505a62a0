//! Raw resume files in S3-compatible object storage.

use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;

/// Object key for a user's file. Identical bytes from the same user map to the same key.
pub fn object_key(user_id: Uuid, content_hash: &str) -> String {
    format!("resumes/{user_id}/{content_hash}")
}

pub async fn put_file(
    s3: &aws_sdk_s3::Client,
    bucket: &str,
    key: &str,
    bytes: Bytes,
    content_type: &str,
) -> Result<(), AppError> {
    let size = bytes.len();
    s3.put_object()
        .bucket(bucket)
        .key(key)
        .body(ByteStream::from(bytes))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("upload of {key} failed: {e}")))?;

    info!("Uploaded {size} bytes to s3://{bucket}/{key}");
    Ok(())
}

pub async fn get_file(s3: &aws_sdk_s3::Client, bucket: &str, key: &str) -> Result<Bytes, AppError> {
    let object = s3
        .get_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("download of {key} failed: {e}")))?;

    let data = object
        .body
        .collect()
        .await
        .map_err(|e| AppError::S3(format!("reading {key} failed: {e}")))?;
    Ok(data.into_bytes())
}

pub async fn delete_file(s3: &aws_sdk_s3::Client, bucket: &str, key: &str) -> Result<(), AppError> {
    s3.delete_object()
        .bucket(bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| AppError::S3(format!("delete of {key} failed: {e}")))?;

    info!("Deleted s3://{bucket}/{key}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let user = Uuid::nil();
        assert_eq!(
            object_key(user, "ab12"),
            "resumes/00000000-0000-0000-0000-000000000000/ab12"
        );
    }
}
