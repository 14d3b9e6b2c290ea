//! Membership request repository (`request_members`).

use chrono::{DateTime, Utc};
use polis_common::models::{RequestKind, RequestMember, Status};
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: Uuid,
    community_id: Uuid,
    parent_id: Option<Uuid>,
    kind: RequestKind,
    member_id: Uuid,
    voter_id: Option<Uuid>,
    vote: Option<bool>,
    is_blocked: bool,
    status: Status,
    created_at: DateTime<Utc>,
}

impl From<RequestRow> for RequestMember {
    fn from(row: RequestRow) -> Self {
        RequestMember {
            id: row.id,
            community_id: row.community_id,
            parent_id: row.parent_id,
            kind: row.kind,
            member_id: row.member_id,
            voter_id: row.voter_id,
            vote: row.vote,
            is_blocked: row.is_blocked,
            status: row.status,
            created_at: row.created_at,
        }
    }
}

/// Find a request by ID.
pub async fn find_by_id(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<RequestMember>, sqlx::Error> {
    let row = sqlx::query_as::<_, RequestRow>("SELECT * FROM request_members WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(RequestMember::from))
}

/// List the direct children of a request, oldest first.
pub async fn list_children(
    conn: &mut PgConnection,
    parent_id: Uuid,
) -> Result<Vec<RequestMember>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(
        "SELECT * FROM request_members WHERE parent_id = $1 ORDER BY created_at, id",
    )
    .bind(parent_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(RequestMember::from).collect())
}

/// List the root requests of a community, oldest first.
pub async fn list_roots(
    conn: &mut PgConnection,
    community_id: Uuid,
) -> Result<Vec<RequestMember>, sqlx::Error> {
    let rows = sqlx::query_as::<_, RequestRow>(
        r#"
        SELECT * FROM request_members
        WHERE community_id = $1 AND parent_id IS NULL
        ORDER BY created_at, id
        "#,
    )
    .bind(community_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(RequestMember::from).collect())
}

/// Create a request.
pub async fn create_request(
    conn: &mut PgConnection,
    request: &RequestMember,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO request_members (
            id, community_id, parent_id, kind, member_id, voter_id, vote,
            is_blocked, status, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(request.id)
    .bind(request.community_id)
    .bind(request.parent_id)
    .bind(request.kind)
    .bind(request.member_id)
    .bind(request.voter_id)
    .bind(request.vote)
    .bind(request.is_blocked)
    .bind(request.status)
    .bind(request.created_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Persist a request's vote, block flag and status.
pub async fn update_request(
    conn: &mut PgConnection,
    request: &RequestMember,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE request_members SET vote = $2, is_blocked = $3, status = $4 WHERE id = $1",
    )
    .bind(request.id)
    .bind(request.vote)
    .bind(request.is_blocked)
    .bind(request.status)
    .execute(conn)
    .await?;
    Ok(())
}

/// Block or unblock every child request carrying a member's vote in a community.
pub async fn set_voter_blocked(
    conn: &mut PgConnection,
    voter_id: Uuid,
    community_id: Uuid,
    is_blocked: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE request_members SET is_blocked = $3
        WHERE voter_id = $1 AND member_id <> $1 AND community_id = $2 AND is_blocked <> $3
        "#,
    )
    .bind(voter_id)
    .bind(community_id)
    .bind(is_blocked)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
