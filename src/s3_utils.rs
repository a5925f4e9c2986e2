// Helpers for object-store keys, uploads and signed download URLs.

use std::time::Duration;

use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use uuid::Uuid;

pub fn build_public_url(base: &str, bucket: &str, key: &str) -> String {
    let trimmed = base.trim_end_matches('/');

    // Allow simple templating: https://host/{bucket}/{key} or https://bucket.host/{key}
    if trimmed.contains("{bucket}") || trimmed.contains("{key}") {
        return trimmed.replace("{bucket}", bucket).replace("{key}", key);
    }

    // If the base already includes the bucket, append only the key.
    if trimmed.contains(bucket) {
        format!("{}/{}", trimmed, key)
    } else {
        format!("{}/{}/{}", trimmed, bucket, key)
    }
}

pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '.' || *c == '_' || *c == '-')
        .collect()
}

/// Random object key under a prefix, keeping the original extension.
pub fn object_key(prefix: &str, original_filename: &str) -> String {
    let sanitized = sanitize_filename(original_filename);
    match sanitized.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!("{prefix}/{}.{ext}", Uuid::new_v4()),
        _ => format!("{prefix}/{}", Uuid::new_v4()),
    }
}

pub fn content_type_for(filename: &str) -> &'static str {
    match filename.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "png" => "image/png",
        Some(ext) if ext == "jpg" || ext == "jpeg" => "image/jpeg",
        Some(ext) if ext == "gif" => "image/gif",
        Some(ext) if ext == "webp" => "image/webp",
        Some(ext) if ext == "pdf" => "application/pdf",
        Some(ext) if ext == "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

pub async fn upload_object(
    client: &S3Client,
    bucket: &str,
    key: &str,
    bytes: Vec<u8>,
    content_type: &str,
) -> Result<(), String> {
    client
        .put_object()
        .bucket(bucket)
        .key(key)
        .content_type(content_type)
        .body(ByteStream::from(bytes))
        .send()
        .await
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Time-limited signed GET URL; the filename lands in Content-Disposition so
/// browsers save the product under its title instead of the random key.
pub async fn presign_download(
    client: &S3Client,
    bucket: &str,
    key: &str,
    filename: &str,
    ttl_secs: u64,
) -> Result<String, String> {
    let config =
        PresigningConfig::expires_in(Duration::from_secs(ttl_secs)).map_err(|e| e.to_string())?;
    let presigned = client
        .get_object()
        .bucket(bucket)
        .key(key)
        .response_content_disposition(format!(
            "attachment; filename=\"{}\"",
            sanitize_filename(filename)
        ))
        .presigned(config)
        .await
        .map_err(|e| e.to_string())?;
    Ok(presigned.uri().to_string())
}

#[cfg(test)]
mod tests {
    use super::{build_public_url, content_type_for, object_key, sanitize_filename};

    #[test]
    fn keys_keep_the_extension_and_randomize_the_name() {
        let key = object_key("product-files", "My Pack (final).zip");
        assert!(key.starts_with("product-files/"));
        assert!(key.ends_with(".zip"));
        assert!(!key.contains("My"));
    }

    #[test]
    fn sanitizing_strips_path_and_quote_characters() {
        assert_eq!(sanitize_filename("../etc/pass wd\"x\""), "..etcpasswdx");
    }

    #[test]
    fn public_url_handles_templates_and_plain_bases() {
        assert_eq!(
            build_public_url("https://cdn.example.com/{bucket}/{key}", "b", "k/1.png"),
            "https://cdn.example.com/b/k/1.png"
        );
        assert_eq!(
            build_public_url("https://s3.example.com/", "b", "k/1.png"),
            "https://s3.example.com/b/k/1.png"
        );
        assert_eq!(
            build_public_url("https://b.s3.amazonaws.com", "b", "k/1.png"),
            "https://b.s3.amazonaws.com/k/1.png"
        );
    }

    #[test]
    fn content_types_fall_back_to_octet_stream() {
        assert_eq!(content_type_for("shot.PNG"), "image/png");
        assert_eq!(content_type_for("bundle.zip"), "application/zip");
        assert_eq!(content_type_for("mystery"), "application/octet-stream");
    }
}
