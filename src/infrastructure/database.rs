use crate::entities::{categories, post_media, posts, responses, users};
use sea_orm::sea_query::Index;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::env;
use std::time::Duration;
use tracing::info;

pub async fn setup_database() -> anyhow::Result<DatabaseConnection> {
    let db_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    info!("📂 Database: {}", db_url);

    let mut opt = ConnectOptions::new(&db_url);
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(30))
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug);

    let db = Database::connect(opt).await?;

    info!("✅ Database connected successfully");

    run_migrations(&db).await?;

    crate::infrastructure::seed::seed_initial_data(&db).await?;

    Ok(db)
}

/// Creates the schema from the entity definitions, plus the two composite
/// unique indexes the entities cannot express: one response per
/// (post, author) and one sequence number per (post, sequence).
pub async fn run_migrations(db: &DatabaseConnection) -> anyhow::Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let stmts = vec![
        schema
            .create_table_from_entity(users::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(categories::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(posts::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(post_media::Entity)
            .if_not_exists()
            .to_owned(),
        schema
            .create_table_from_entity(responses::Entity)
            .if_not_exists()
            .to_owned(),
    ];

    for stmt in stmts {
        db.execute(builder.build(&stmt)).await?;
    }

    let indexes = vec![
        Index::create()
            .name("idx_responses_post_author")
            .table(responses::Entity)
            .col(responses::Column::PostId)
            .col(responses::Column::AuthorId)
            .unique()
            .if_not_exists()
            .to_owned(),
        Index::create()
            .name("idx_post_media_post_sequence")
            .table(post_media::Entity)
            .col(post_media::Column::PostId)
            .col(post_media::Column::Sequence)
            .unique()
            .if_not_exists()
            .to_owned(),
    ];

    for stmt in indexes {
        db.execute(builder.build(&stmt)).await?;
    }

    Ok(())
}
