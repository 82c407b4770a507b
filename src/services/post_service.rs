use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::services::media;
use crate::services::storage::StorageService;
use crate::utils::slug::slugify;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

/// One file lifted out of a multipart request.
pub struct UploadedFile {
    pub name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

pub struct NewPost {
    pub title: String,
    pub content: String,
    pub price: i64,
    pub post_type: posts::PostType,
    pub category_id: String,
}

/// Field set of the edit form; absent fields are left untouched. The slug
/// is fixed at creation and never re-derived from a changed title.
#[derive(Default)]
pub struct PostUpdate {
    pub title: Option<String>,
    pub content: Option<String>,
    pub price: Option<i64>,
    pub category_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Default)]
pub struct PostFilters {
    pub category_id: Option<String>,
    pub post_type: Option<posts::PostType>,
    pub price_min: Option<i64>,
    pub price_max: Option<i64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

pub struct PostPage {
    pub posts: Vec<posts::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

const DEFAULT_PAGE_SIZE: u64 = 12;
const OWN_POSTS_PAGE_SIZE: u64 = 10;
const MAX_TITLE_LEN: usize = 255;

/// Owns the post/media lifecycle: creation with best-effort media attach,
/// ownership-gated mutation, and cascading deletion with blob cleanup.
pub struct PostService {
    db: DatabaseConnection,
    storage: Arc<dyn StorageService>,
}

impl PostService {
    pub fn new(db: DatabaseConnection, storage: Arc<dyn StorageService>) -> Self {
        Self { db, storage }
    }

    /// Creates a post, then attaches each uploaded file independently.
    /// A rejected or failed file never aborts the post itself; it is
    /// logged and counted.
    pub async fn create_post(
        &self,
        author_id: &str,
        new: NewPost,
        files: Vec<UploadedFile>,
    ) -> Result<(posts::Model, Vec<post_media::Model>, usize), AppError> {
        validate_title(&new.title)?;
        validate_price(new.price)?;
        if new.content.trim().is_empty() {
            return Err(AppError::Validation("content must not be empty".into()));
        }

        Categories::find_by_id(new.category_id.as_str())
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::BadRequest("category does not exist".into()))?;

        let slug = self.unique_slug(&new.title).await?;
        let now = Utc::now();

        let post = posts::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            author_id: Set(author_id.to_string()),
            category_id: Set(new.category_id),
            title: Set(new.title),
            content: Set(new.content),
            price: Set(new.price),
            post_type: Set(new.post_type),
            is_active: Set(true),
            slug: Set(slug),
            media_counter: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        let (stored, rejected) = self.attach_media(&post.id, files).await;

        Ok((post, stored, rejected))
    }

    /// Author-only edit. New files are appended under the same per-file
    /// tolerance as creation.
    pub async fn edit_post(
        &self,
        slug: &str,
        requester_id: &str,
        update: PostUpdate,
        files: Vec<UploadedFile>,
    ) -> Result<(posts::Model, Vec<post_media::Model>, usize), AppError> {
        let post = self.find_by_slug(slug).await?;
        if post.author_id != requester_id {
            return Err(AppError::PermissionDenied);
        }

        if let Some(title) = &update.title {
            validate_title(title)?;
        }
        if let Some(price) = update.price {
            validate_price(price)?;
        }
        if let Some(category_id) = &update.category_id {
            Categories::find_by_id(category_id.as_str())
                .one(&self.db)
                .await?
                .ok_or_else(|| AppError::BadRequest("category does not exist".into()))?;
        }

        let post_id = post.id.clone();
        let mut active = post.into_active_model();
        if let Some(title) = update.title {
            active.title = Set(title);
        }
        if let Some(content) = update.content {
            active.content = Set(content);
        }
        if let Some(price) = update.price {
            active.price = Set(price);
        }
        if let Some(category_id) = update.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(is_active) = update.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Utc::now());

        let post = active.update(&self.db).await?;

        let (stored, rejected) = self.attach_media(&post_id, files).await;

        Ok((post, stored, rejected))
    }

    /// Author-only delete. The relational cascade (media rows, response
    /// rows, the post) commits first; blob deletion is attempted afterwards
    /// and each failure is logged, never raised.
    pub async fn delete_post(&self, slug: &str, requester_id: &str) -> Result<(), AppError> {
        let post = self.find_by_slug(slug).await?;
        if post.author_id != requester_id {
            return Err(AppError::PermissionDenied);
        }

        let media_rows = PostMedia::find()
            .filter(post_media::Column::PostId.eq(&post.id))
            .all(&self.db)
            .await?;
        let storage_keys: Vec<String> = media_rows.into_iter().map(|m| m.storage_key).collect();

        let txn = self.db.begin().await?;
        Responses::delete_many()
            .filter(responses::Column::PostId.eq(&post.id))
            .exec(&txn)
            .await?;
        PostMedia::delete_many()
            .filter(post_media::Column::PostId.eq(&post.id))
            .exec(&txn)
            .await?;
        Posts::delete_by_id(post.id.as_str()).exec(&txn).await?;
        txn.commit().await?;

        for key in storage_keys {
            if let Err(e) = self.storage.delete(&key).await {
                warn!("blob cleanup failed for '{}': {}", key, e);
            }
        }

        Ok(())
    }

    /// Deletes a single media row (post-owner only), then attempts to
    /// remove the underlying blob. The sequence number is not reused.
    pub async fn delete_media(&self, media_id: &str, requester_id: &str) -> Result<(), AppError> {
        let (media, post) = PostMedia::find_by_id(media_id)
            .find_also_related(Posts)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("media not found".into()))?;
        let post = post.ok_or_else(|| AppError::Internal("media without parent post".into()))?;

        if post.author_id != requester_id {
            return Err(AppError::PermissionDenied);
        }

        PostMedia::delete_by_id(media.id.as_str()).exec(&self.db).await?;

        if let Err(e) = self.storage.delete(&media.storage_key).await {
            warn!("blob cleanup failed for '{}': {}", media.storage_key, e);
        }

        Ok(())
    }

    /// Active listings, optionally narrowed by category, type, and an
    /// inclusive price range; most-recently-updated first.
    pub async fn list_active(&self, filters: PostFilters) -> Result<PostPage, AppError> {
        let mut cond = Condition::all().add(posts::Column::IsActive.eq(true));

        if let Some(category_id) = filters.category_id {
            cond = cond.add(posts::Column::CategoryId.eq(category_id));
        }
        if let Some(post_type) = filters.post_type {
            cond = cond.add(posts::Column::PostType.eq(post_type));
        }
        if let Some(min) = filters.price_min {
            cond = cond.add(posts::Column::Price.gte(min));
        }
        if let Some(max) = filters.price_max {
            cond = cond.add(posts::Column::Price.lte(max));
        }

        let page = filters.page.unwrap_or(1).max(1);
        let per_page = filters.per_page.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, 100);

        let paginator = Posts::find()
            .filter(cond)
            .order_by_desc(posts::Column::UpdatedAt)
            .paginate(&self.db, per_page);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page - 1).await?;

        Ok(PostPage {
            posts,
            total,
            page,
            per_page,
        })
    }

    /// Everything the author owns, active or not, most-recently-updated
    /// first.
    pub async fn list_by_author(
        &self,
        author_id: &str,
        page: Option<u64>,
    ) -> Result<PostPage, AppError> {
        let page = page.unwrap_or(1).max(1);

        let paginator = Posts::find()
            .filter(posts::Column::AuthorId.eq(author_id))
            .order_by_desc(posts::Column::UpdatedAt)
            .paginate(&self.db, OWN_POSTS_PAGE_SIZE);

        let total = paginator.num_items().await?;
        let posts = paginator.fetch_page(page - 1).await?;

        Ok(PostPage {
            posts,
            total,
            page,
            per_page: OWN_POSTS_PAGE_SIZE,
        })
    }

    pub async fn find_by_slug(&self, slug: &str) -> Result<posts::Model, AppError> {
        Posts::find()
            .filter(posts::Column::Slug.eq(slug))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("post not found".into()))
    }

    pub async fn media_for_post(&self, post_id: &str) -> Result<Vec<post_media::Model>, AppError> {
        let media = PostMedia::find()
            .filter(post_media::Column::PostId.eq(post_id))
            .order_by_asc(post_media::Column::Sequence)
            .all(&self.db)
            .await?;
        Ok(media)
    }

    /// Validates and stores each file in submission order. Failures are
    /// logged and counted; they never abort the batch or the post
    /// operation that triggered it.
    async fn attach_media(
        &self,
        post_id: &str,
        files: Vec<UploadedFile>,
    ) -> (Vec<post_media::Model>, usize) {
        let mut stored = Vec::new();
        let mut rejected = 0usize;

        for file in files {
            match self.attach_one(post_id, file).await {
                Ok(row) => stored.push(row),
                Err(e) => {
                    warn!("media skipped for post {}: {}", post_id, e);
                    rejected += 1;
                }
            }
        }

        (stored, rejected)
    }

    async fn attach_one(
        &self,
        post_id: &str,
        file: UploadedFile,
    ) -> anyhow::Result<post_media::Model> {
        let validated = media::validate(&file.name, file.content_type.as_deref(), file.data.len())?;

        let txn = self.db.begin().await?;
        let sequence = media::allocate_sequence(&txn, post_id).await?;
        let key = media::storage_key(post_id, sequence, &validated.extension);

        let row = post_media::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            post_id: Set(post_id.to_string()),
            storage_key: Set(key.clone()),
            sequence: Set(sequence),
            content_type: Set(validated.content_type),
            size: Set(validated.size),
            uploaded_at: Set(Utc::now()),
        }
        .insert(&txn)
        .await?;

        // Blob write happens before commit so a storage failure rolls the
        // row (and the counter bump) back with it.
        self.storage.store(&key, file.data).await?;
        txn.commit().await?;

        Ok(row)
    }

    /// Slug from the title, suffixed `-2`, `-3`, ... on collision. Titles
    /// that slugify to nothing fall back to a random fragment.
    async fn unique_slug(&self, title: &str) -> Result<String, AppError> {
        let mut base = slugify(title);
        if base.is_empty() {
            base = Uuid::new_v4().to_string()[..8].to_string();
        }

        let mut candidate = base.clone();
        let mut n = 2u32;
        loop {
            let taken = Posts::find()
                .filter(posts::Column::Slug.eq(&candidate))
                .one(&self.db)
                .await?
                .is_some();
            if !taken {
                return Ok(candidate);
            }
            candidate = format!("{base}-{n}");
            n += 1;
        }
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::Validation("title must not be empty".into()));
    }
    if title.chars().count() > MAX_TITLE_LEN {
        return Err(AppError::Validation(format!(
            "title must be at most {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: i64) -> Result<(), AppError> {
    if price < 0 {
        return Err(AppError::Validation("price must not be negative".into()));
    }
    Ok(())
}
