//! Resource repository — rules, initiatives and their voting results.
//!
//! Rules and initiatives share the `resources` table, discriminated by `kind`.

use polis_common::models::{
    ExtraOptions, Initiative, Resource, ResourceKind, Rule, Status, Votable, VotingResult,
};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct ResourceRow {
    id: Uuid,
    kind: ResourceKind,
    community_id: Uuid,
    category_id: Uuid,
    prior_category_id: Option<Uuid>,
    status: Status,
    extra_options: ExtraOptions,
    is_multi_select: bool,
    noncompliance: Vec<Uuid>,
}

impl From<ResourceRow> for Resource {
    fn from(row: ResourceRow) -> Self {
        match row.kind {
            ResourceKind::Rule => Resource::Rule(Rule {
                id: row.id,
                community_id: row.community_id,
                category_id: row.category_id,
                prior_category_id: row.prior_category_id,
                status: row.status,
                extra_options: row.extra_options,
                is_multi_select: row.is_multi_select,
                noncompliance: row.noncompliance,
            }),
            ResourceKind::Initiative => Resource::Initiative(Initiative {
                id: row.id,
                community_id: row.community_id,
                category_id: row.category_id,
                prior_category_id: row.prior_category_id,
                status: row.status,
                extra_options: row.extra_options,
                is_multi_select: row.is_multi_select,
            }),
        }
    }
}

const RESOURCE_COLUMNS: &str = "id, kind, community_id, category_id, prior_category_id, \
     status, extra_options, is_multi_select, noncompliance";

/// List the rules and initiatives of a community, oldest first.
pub async fn list_by_community(
    conn: &mut PgConnection,
    community_id: Uuid,
) -> Result<Vec<Resource>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {RESOURCE_COLUMNS} FROM resources WHERE community_id = $1 ORDER BY created_at, id"
    ))
    .bind(community_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Resource::from).collect())
}

/// Find a resource by ID.
pub async fn find_by_id(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Resource>, sqlx::Error> {
    let row = sqlx::query_as::<_, ResourceRow>(&format!(
        "SELECT {RESOURCE_COLUMNS} FROM resources WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Resource::from))
}

/// Persist the engine-owned fields of a resource: status and category.
pub async fn update_resource(
    conn: &mut PgConnection,
    resource: &Resource,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE resources SET
            status = $2,
            category_id = $3,
            prior_category_id = $4,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(resource.id())
    .bind(resource.status())
    .bind(resource.category_id())
    .bind(resource.prior_category_id())
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(Debug, sqlx::FromRow)]
struct VotingResultRow {
    id: Uuid,
    resource_id: Uuid,
    vote: Option<bool>,
    is_significant_minority: bool,
    is_noncompliance_minority: bool,
    selected_options: Vec<Uuid>,
    minority_options: Vec<Uuid>,
    selected_noncompliance: Vec<Uuid>,
    minority_noncompliance: Vec<Uuid>,
}

impl From<VotingResultRow> for VotingResult {
    fn from(row: VotingResultRow) -> Self {
        VotingResult {
            id: row.id,
            resource_id: row.resource_id,
            vote: row.vote,
            is_significant_minority: row.is_significant_minority,
            is_noncompliance_minority: row.is_noncompliance_minority,
            selected_options: row.selected_options,
            minority_options: row.minority_options,
            selected_noncompliance: row.selected_noncompliance,
            minority_noncompliance: row.minority_noncompliance,
        }
    }
}

/// Find the voting result of a resource.
pub async fn find_voting_result(
    conn: &mut PgConnection,
    resource_id: Uuid,
) -> Result<Option<VotingResult>, sqlx::Error> {
    let row = sqlx::query_as::<_, VotingResultRow>(
        "SELECT * FROM voting_results WHERE resource_id = $1",
    )
    .bind(resource_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(VotingResult::from))
}

/// Create the voting result of a resource. A resource has at most one.
pub async fn create_voting_result(
    conn: &mut PgConnection,
    result: &VotingResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO voting_results (
            id, resource_id, vote, is_significant_minority, is_noncompliance_minority,
            selected_options, minority_options, selected_noncompliance, minority_noncompliance
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (resource_id) DO NOTHING
        "#,
    )
    .bind(result.id)
    .bind(result.resource_id)
    .bind(result.vote)
    .bind(result.is_significant_minority)
    .bind(result.is_noncompliance_minority)
    .bind(&result.selected_options)
    .bind(&result.minority_options)
    .bind(&result.selected_noncompliance)
    .bind(&result.minority_noncompliance)
    .execute(conn)
    .await?;
    Ok(())
}

/// Overwrite a voting result with freshly derived values.
pub async fn update_voting_result(
    conn: &mut PgConnection,
    result: &VotingResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE voting_results SET
            vote = $2,
            is_significant_minority = $3,
            is_noncompliance_minority = $4,
            selected_options = $5,
            minority_options = $6,
            selected_noncompliance = $7,
            minority_noncompliance = $8
        WHERE id = $1
        "#,
    )
    .bind(result.id)
    .bind(result.vote)
    .bind(result.is_significant_minority)
    .bind(result.is_noncompliance_minority)
    .bind(&result.selected_options)
    .bind(&result.minority_options)
    .bind(&result.selected_noncompliance)
    .bind(&result.minority_noncompliance)
    .execute(conn)
    .await?;
    Ok(())
}
