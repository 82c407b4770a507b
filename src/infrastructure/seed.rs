use crate::entities::{categories, prelude::*};
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Set};
use tracing::info;
use uuid::Uuid;

/// Default marketplace categories, inserted once on an empty database.
/// Administrators manage the set afterwards through the API.
const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Weapons", "weapons"),
    ("Armor", "armor"),
    ("Potions", "potions"),
    ("Artifacts", "artifacts"),
    ("Miscellaneous", "miscellaneous"),
];

pub async fn seed_initial_data(db: &DatabaseConnection) -> anyhow::Result<()> {
    let existing = Categories::find().count(db).await?;
    if existing > 0 {
        return Ok(());
    }

    let models = DEFAULT_CATEGORIES
        .iter()
        .map(|(name, slug)| categories::ActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            name: Set(name.to_string()),
            slug: Set(slug.to_string()),
        });

    Categories::insert_many(models).exec(db).await?;
    info!("🌱 Seeded {} default categories", DEFAULT_CATEGORIES.len());

    Ok(())
}
