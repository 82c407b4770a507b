use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A file attached to a post. `storage_key` is the blob path
/// `{post_id}/post-{post_id}-{sequence:03}.{ext}`; `(post_id, sequence)`
/// carries a unique index (created in infrastructure::database).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "post_media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub post_id: String,
    pub storage_key: String,
    pub sequence: i32,
    pub content_type: Option<String>,
    pub size: i64,
    pub uploaded_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::posts::Entity",
        from = "Column::PostId",
        to = "super::posts::Column::Id",
        on_delete = "Cascade"
    )]
    Post,
}

impl Related<super::posts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Post.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
