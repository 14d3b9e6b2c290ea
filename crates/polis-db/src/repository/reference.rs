//! Reference data repository — categories, responsibilities, names, descriptions.

use polis_common::models::{Category, CommunityDescription, CommunityName, Responsibility};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    is_system: bool,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Category {
            id: row.id,
            name: row.name,
            is_system: row.is_system,
        }
    }
}

/// Find the system category.
pub async fn find_system_category(
    conn: &mut PgConnection,
) -> Result<Option<Category>, sqlx::Error> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, is_system FROM categories WHERE is_system = true ORDER BY id LIMIT 1",
    )
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Category::from))
}

/// Find a category by ID.
pub async fn find_category(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Category>, sqlx::Error> {
    let row = sqlx::query_as::<_, CategoryRow>(
        "SELECT id, name, is_system FROM categories WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Category::from))
}

/// Find a responsibility by ID.
pub async fn find_responsibility(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Responsibility>, sqlx::Error> {
    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM responsibilities WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|(id, name)| Responsibility { id, name }))
}

/// Find a community name by ID.
pub async fn find_community_name(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<CommunityName>, sqlx::Error> {
    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, name FROM community_names WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|(id, name)| CommunityName { id, name }))
}

/// Find a community description by ID.
pub async fn find_community_description(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<CommunityDescription>, sqlx::Error> {
    let row: Option<(Uuid, String)> =
        sqlx::query_as("SELECT id, text FROM community_descriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;
    Ok(row.map(|(id, text)| CommunityDescription { id, text }))
}
