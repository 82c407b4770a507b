use crate::entities::{posts, prelude::*};
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use std::path::Path;
use thiserror::Error;

/// Maximum media file size: 50 MB
pub const MAX_MEDIA_SIZE: usize = 50 * 1024 * 1024;

/// Rejected outright, before the allow-list is consulted.
const DANGEROUS_EXTENSIONS: &[&str] = &["exe", "bat", "cmd", "sh", "php", "js", "html"];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "webm"];

#[derive(Debug, Error)]
pub enum MediaRejected {
    #[error("file size {size} bytes exceeds the maximum of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },
    #[error("file extension '.{0}' is blocked")]
    DangerousExtension(String),
    #[error("file extension '.{0}' is not an allowed image or video type")]
    UnsupportedExtension(String),
    #[error("declared content type '{0}' is not image/* or video/*")]
    MimeMismatch(String),
    #[error("filename has no extension")]
    MissingExtension,
}

/// A file that passed validation. `extension` is lower-cased, without the
/// leading dot.
#[derive(Debug, Clone)]
pub struct ValidatedMedia {
    pub extension: String,
    pub content_type: Option<String>,
    pub size: i64,
}

/// Checks a candidate upload against the size limit, the extension
/// block/allow lists, and the declared content type. Check order matters:
/// a dangerous extension must never fall through to the generic
/// "unsupported" rejection.
pub fn validate(
    declared_name: &str,
    declared_content_type: Option<&str>,
    size: usize,
) -> Result<ValidatedMedia, MediaRejected> {
    if size > MAX_MEDIA_SIZE {
        return Err(MediaRejected::FileTooLarge {
            size,
            limit: MAX_MEDIA_SIZE,
        });
    }

    let extension = Path::new(declared_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .ok_or(MediaRejected::MissingExtension)?;

    if DANGEROUS_EXTENSIONS.contains(&extension.as_str()) {
        return Err(MediaRejected::DangerousExtension(extension));
    }

    if !IMAGE_EXTENSIONS.contains(&extension.as_str())
        && !VIDEO_EXTENSIONS.contains(&extension.as_str())
    {
        return Err(MediaRejected::UnsupportedExtension(extension));
    }

    if let Some(content_type) = declared_content_type {
        if !content_type.starts_with("image/") && !content_type.starts_with("video/") {
            return Err(MediaRejected::MimeMismatch(content_type.to_string()));
        }
    }

    Ok(ValidatedMedia {
        extension,
        content_type: declared_content_type.map(|s| s.to_string()),
        size: size as i64,
    })
}

/// Storage key for the `sequence`-th file of a post.
pub fn storage_key(post_id: &str, sequence: i32, extension: &str) -> String {
    format!("{post_id}/post-{post_id}-{sequence:03}.{extension}")
}

/// Allocates the next media sequence number for a post with a single
/// UPDATE on the post row, so two concurrent uploads cannot observe the
/// same value. Runs on the caller's transaction.
pub async fn allocate_sequence<C: ConnectionTrait>(conn: &C, post_id: &str) -> Result<i32, DbErr> {
    Posts::update_many()
        .col_expr(
            posts::Column::MediaCounter,
            Expr::col(posts::Column::MediaCounter).add(1),
        )
        .filter(posts::Column::Id.eq(post_id))
        .exec(conn)
        .await?;

    let post = Posts::find_by_id(post_id)
        .one(conn)
        .await?
        .ok_or_else(|| DbErr::RecordNotFound(format!("post {post_id}")))?;

    Ok(post.media_counter)
}
