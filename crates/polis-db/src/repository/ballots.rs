//! Ballot repository — per-member votes (`user_voting_results`).

use chrono::{DateTime, Utc};
use polis_common::models::UserVotingResult;
use sqlx::PgConnection;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
struct BallotRow {
    id: Uuid,
    user_id: Uuid,
    resource_id: Uuid,
    community_id: Uuid,
    vote: Option<bool>,
    options: Vec<Uuid>,
    noncompliance: Vec<Uuid>,
    is_blocked: bool,
    is_voted_myself: bool,
    updated_at: DateTime<Utc>,
}

impl From<BallotRow> for UserVotingResult {
    fn from(row: BallotRow) -> Self {
        UserVotingResult {
            id: row.id,
            user_id: row.user_id,
            resource_id: row.resource_id,
            community_id: row.community_id,
            vote: row.vote,
            options: row.options,
            noncompliance: row.noncompliance,
            is_blocked: row.is_blocked,
            is_voted_myself: row.is_voted_myself,
            updated_at: row.updated_at,
        }
    }
}

/// List every ballot on a resource, oldest first.
pub async fn list_by_resource(
    conn: &mut PgConnection,
    resource_id: Uuid,
) -> Result<Vec<UserVotingResult>, sqlx::Error> {
    let rows = sqlx::query_as::<_, BallotRow>(
        "SELECT * FROM user_voting_results WHERE resource_id = $1 ORDER BY id",
    )
    .bind(resource_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(UserVotingResult::from).collect())
}

/// Find a ballot by ID.
pub async fn find_by_id(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<UserVotingResult>, sqlx::Error> {
    let row = sqlx::query_as::<_, BallotRow>("SELECT * FROM user_voting_results WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(UserVotingResult::from))
}

/// Find a member's ballot on a resource.
pub async fn find_member_ballot(
    conn: &mut PgConnection,
    user_id: Uuid,
    resource_id: Uuid,
) -> Result<Option<UserVotingResult>, sqlx::Error> {
    let row = sqlx::query_as::<_, BallotRow>(
        "SELECT * FROM user_voting_results WHERE user_id = $1 AND resource_id = $2",
    )
    .bind(user_id)
    .bind(resource_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(UserVotingResult::from))
}

/// Create a ballot. Ballots are unique per (user, resource); an existing one wins.
pub async fn create_ballot(
    conn: &mut PgConnection,
    ballot: &UserVotingResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_voting_results (
            id, user_id, resource_id, community_id, vote, options, noncompliance,
            is_blocked, is_voted_myself, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        ON CONFLICT (user_id, resource_id) DO NOTHING
        "#,
    )
    .bind(ballot.id)
    .bind(ballot.user_id)
    .bind(ballot.resource_id)
    .bind(ballot.community_id)
    .bind(ballot.vote)
    .bind(&ballot.options)
    .bind(&ballot.noncompliance)
    .bind(ballot.is_blocked)
    .bind(ballot.is_voted_myself)
    .bind(ballot.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Overwrite a ballot's vote, selections and flags.
pub async fn update_ballot(
    conn: &mut PgConnection,
    ballot: &UserVotingResult,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE user_voting_results SET
            vote = $2,
            options = $3,
            noncompliance = $4,
            is_blocked = $5,
            is_voted_myself = $6,
            updated_at = $7
        WHERE id = $1
        "#,
    )
    .bind(ballot.id)
    .bind(ballot.vote)
    .bind(&ballot.options)
    .bind(&ballot.noncompliance)
    .bind(ballot.is_blocked)
    .bind(ballot.is_voted_myself)
    .bind(ballot.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Block or unblock all of a member's ballots in a community.
pub async fn set_member_blocked(
    conn: &mut PgConnection,
    user_id: Uuid,
    community_id: Uuid,
    is_blocked: bool,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE user_voting_results SET is_blocked = $3, updated_at = NOW()
        WHERE user_id = $1 AND community_id = $2 AND is_blocked <> $3
        "#,
    )
    .bind(user_id)
    .bind(community_id)
    .bind(is_blocked)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}
