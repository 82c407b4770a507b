use crate::api::error::AppError;
use crate::entities::{prelude::*, *};
use crate::services::notify::{NotificationKind, Notifier, templates};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const MAX_RESPONSE_LEN: usize = 255;

/// Moderation workflow for buyer responses. A response is either pending
/// (`is_accepted = false`, which also covers "rejected") or accepted;
/// every transition is gated on the post's author. Notifications are
/// dispatched best-effort after the state change is committed.
pub struct ResponseService {
    db: DatabaseConnection,
    notifier: Arc<dyn Notifier>,
}

impl ResponseService {
    pub fn new(db: DatabaseConnection, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// One response per (author, post) pair, enforced by the unique
    /// index. The post's author is notified by email if they have one.
    pub async fn create_response(
        &self,
        author: &users::Model,
        post_slug: &str,
        content: &str,
    ) -> Result<responses::Model, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("response must not be empty".into()));
        }
        if content.chars().count() > MAX_RESPONSE_LEN {
            return Err(AppError::Validation(format!(
                "response must be at most {MAX_RESPONSE_LEN} characters"
            )));
        }

        let post = Posts::find()
            .filter(posts::Column::Slug.eq(post_slug))
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("post not found".into()))?;

        // The (post_id, author_id) unique index is the source of truth for
        // the one-response-per-pair rule; a pre-check would race with
        // concurrent inserts.
        let insert = responses::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            post_id: Set(post.id.clone()),
            author_id: Set(author.id.clone()),
            content: Set(content.to_string()),
            is_accepted: Set(false),
            created_at: Set(Utc::now()),
        }
        .insert(&self.db)
        .await;

        let response = match insert {
            Ok(row) => row,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AppError::Conflict(
                    "you have already responded to this post".into(),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        let post_author = Users::find_by_id(post.author_id.as_str()).one(&self.db).await?;
        match post_author.and_then(|u| u.email) {
            Some(email) => {
                let (subject, text, html) =
                    templates::new_response(&post.title, &author.username, &response.content);
                if let Err(e) = self
                    .notifier
                    .send(NotificationKind::NewResponse, &email, &subject, &text, &html)
                    .await
                {
                    warn!("new-response notification failed for '{}': {}", email, e);
                }
            }
            None => debug!(
                "post author of '{}' has no email; skipping notification",
                post.slug
            ),
        }

        Ok(response)
    }

    /// Marks the response accepted and notifies its author, if they have
    /// a registered email address.
    pub async fn accept(
        &self,
        response_id: &str,
        requester_id: &str,
    ) -> Result<responses::Model, AppError> {
        let (response, post) = self.find_moderated(response_id, requester_id).await?;

        let mut active = response.into_active_model();
        active.is_accepted = Set(true);
        let response = active.update(&self.db).await?;

        let responder = Users::find_by_id(response.author_id.as_str()).one(&self.db).await?;
        match responder.and_then(|u| u.email) {
            Some(email) => {
                let (subject, text, html) = templates::response_accepted(&post.title);
                if let Err(e) = self
                    .notifier
                    .send(
                        NotificationKind::ResponseAccepted,
                        &email,
                        &subject,
                        &text,
                        &html,
                    )
                    .await
                {
                    warn!("acceptance notification failed for '{}': {}", email, e);
                }
            }
            None => debug!(
                "responder on '{}' has no email; skipping acceptance notification",
                post.slug
            ),
        }

        Ok(response)
    }

    /// Clears the accepted flag. Indistinguishable from "never reviewed"
    /// in stored state; no notification is sent.
    pub async fn reject(
        &self,
        response_id: &str,
        requester_id: &str,
    ) -> Result<responses::Model, AppError> {
        let (response, _post) = self.find_moderated(response_id, requester_id).await?;

        let mut active = response.into_active_model();
        active.is_accepted = Set(false);
        let response = active.update(&self.db).await?;

        Ok(response)
    }

    /// Removes a response entirely (post-owner moderation).
    pub async fn delete(&self, response_id: &str, requester_id: &str) -> Result<(), AppError> {
        let (response, _post) = self.find_moderated(response_id, requester_id).await?;
        Responses::delete_by_id(response.id.as_str()).exec(&self.db).await?;
        Ok(())
    }

    /// All responses across the owner's posts, newest first, optionally
    /// narrowed to a single post by slug.
    pub async fn list_for_owner(
        &self,
        owner_id: &str,
        post_slug: Option<&str>,
    ) -> Result<Vec<responses::Model>, AppError> {
        let mut post_query = Posts::find().filter(posts::Column::AuthorId.eq(owner_id));
        if let Some(slug) = post_slug {
            post_query = post_query.filter(posts::Column::Slug.eq(slug));
        }

        let post_ids: Vec<String> = post_query
            .select_only()
            .column(posts::Column::Id)
            .into_tuple()
            .all(&self.db)
            .await?;

        if post_ids.is_empty() {
            return Ok(Vec::new());
        }

        let responses = Responses::find()
            .filter(responses::Column::PostId.is_in(post_ids))
            .order_by_desc(responses::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(responses)
    }

    /// Accepted responses on a post, newest first. This is the
    /// public-facing view shown on the post detail page.
    pub async fn list_accepted(&self, post_id: &str) -> Result<Vec<responses::Model>, AppError> {
        let responses = Responses::find()
            .filter(responses::Column::PostId.eq(post_id))
            .filter(responses::Column::IsAccepted.eq(true))
            .order_by_desc(responses::Column::CreatedAt)
            .all(&self.db)
            .await?;

        Ok(responses)
    }

    /// Loads a response together with its post and checks that the
    /// requester owns the post.
    async fn find_moderated(
        &self,
        response_id: &str,
        requester_id: &str,
    ) -> Result<(responses::Model, posts::Model), AppError> {
        let (response, post) = Responses::find_by_id(response_id)
            .find_also_related(Posts)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("response not found".into()))?;
        let post = post.ok_or_else(|| AppError::Internal("response without parent post".into()))?;

        if post.author_id != requester_id {
            return Err(AppError::PermissionDenied);
        }

        Ok((response, post))
    }
}
