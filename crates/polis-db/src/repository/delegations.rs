//! Delegation repository.

use polis_common::models::DelegateSettings;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct DelegationRow {
    id: Uuid,
    delegate_id: Uuid,
    community_id: Uuid,
    category_id: Uuid,
    principals: Vec<Uuid>,
}

impl From<DelegationRow> for DelegateSettings {
    fn from(row: DelegationRow) -> Self {
        DelegateSettings {
            id: row.id,
            delegate_id: row.delegate_id,
            community_id: row.community_id,
            category_id: row.category_id,
            principals: row.principals,
        }
    }
}

/// List the delegations a member holds within one (community, category) scope.
pub async fn list_by_delegate(
    conn: &mut PgConnection,
    delegate_id: Uuid,
    community_id: Uuid,
    category_id: Uuid,
) -> Result<Vec<DelegateSettings>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DelegationRow>(
        r#"
        SELECT id, delegate_id, community_id, category_id, principals
        FROM delegate_settings
        WHERE delegate_id = $1 AND community_id = $2 AND category_id = $3
        ORDER BY id
        "#,
    )
    .bind(delegate_id)
    .bind(community_id)
    .bind(category_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(DelegateSettings::from).collect())
}

/// Find the delegation that covers a principal within one scope.
pub async fn find_for_principal(
    conn: &mut PgConnection,
    principal_id: Uuid,
    community_id: Uuid,
    category_id: Uuid,
) -> Result<Option<DelegateSettings>, sqlx::Error> {
    let row = sqlx::query_as::<_, DelegationRow>(
        r#"
        SELECT id, delegate_id, community_id, category_id, principals
        FROM delegate_settings
        WHERE $1 = ANY(principals) AND community_id = $2 AND category_id = $3
        ORDER BY id
        LIMIT 1
        "#,
    )
    .bind(principal_id)
    .bind(community_id)
    .bind(category_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(DelegateSettings::from))
}
