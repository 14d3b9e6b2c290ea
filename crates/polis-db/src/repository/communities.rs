//! Community repository — consolidated community settings and per-member
//! preference rows.

use chrono::{DateTime, Utc};
use polis_common::models::{CommunitySettings, UserCommunitySettings, VotingParams};
use sqlx::PgConnection;
use sqlx::types::Json;
use uuid::Uuid;

/// Community settings row.
#[derive(Debug, sqlx::FromRow)]
struct CommunitySettingsRow {
    id: Uuid,
    community_id: Uuid,
    quorum: i32,
    vote: i32,
    significant_minority: i32,
    decision_delay: i32,
    dispute_time_limit: i32,
    is_secret_ballot: bool,
    is_can_offer: bool,
    is_minority_not_participate: bool,
    is_workgroup: bool,
    workgroup: i32,
    name_id: Option<Uuid>,
    description_id: Option<Uuid>,
    categories: Vec<Uuid>,
    sub_communities: Vec<Uuid>,
    responsibilities: Vec<Uuid>,
    last_voting_params: Option<Json<VotingParams>>,
    updated_at: DateTime<Utc>,
}

impl From<CommunitySettingsRow> for CommunitySettings {
    fn from(row: CommunitySettingsRow) -> Self {
        CommunitySettings {
            id: row.id,
            community_id: row.community_id,
            quorum: row.quorum,
            vote: row.vote,
            significant_minority: row.significant_minority,
            decision_delay: row.decision_delay,
            dispute_time_limit: row.dispute_time_limit,
            is_secret_ballot: row.is_secret_ballot,
            is_can_offer: row.is_can_offer,
            is_minority_not_participate: row.is_minority_not_participate,
            is_workgroup: row.is_workgroup,
            workgroup: row.workgroup,
            name_id: row.name_id,
            description_id: row.description_id,
            categories: row.categories,
            sub_communities: row.sub_communities,
            responsibilities: row.responsibilities,
            last_voting_params: row.last_voting_params.map(|Json(params)| params),
            updated_at: row.updated_at,
        }
    }
}

/// Member preference row.
#[derive(Debug, sqlx::FromRow)]
struct MemberSettingsRow {
    id: Uuid,
    user_id: Uuid,
    community_id: Uuid,
    quorum: i32,
    vote: i32,
    significant_minority: i32,
    decision_delay: i32,
    dispute_time_limit: i32,
    is_secret_ballot: bool,
    is_can_offer: bool,
    is_minority_not_participate: bool,
    is_workgroup: bool,
    workgroup: i32,
    name_id: Option<Uuid>,
    description_id: Option<Uuid>,
    categories: Vec<Uuid>,
    sub_communities: Vec<Uuid>,
    responsibilities: Vec<Uuid>,
    is_blocked: bool,
    is_not_delegate: bool,
    is_default_add_member: bool,
    created_at: DateTime<Utc>,
}

impl From<MemberSettingsRow> for UserCommunitySettings {
    fn from(row: MemberSettingsRow) -> Self {
        UserCommunitySettings {
            id: row.id,
            user_id: row.user_id,
            community_id: row.community_id,
            quorum: row.quorum,
            vote: row.vote,
            significant_minority: row.significant_minority,
            decision_delay: row.decision_delay,
            dispute_time_limit: row.dispute_time_limit,
            is_secret_ballot: row.is_secret_ballot,
            is_can_offer: row.is_can_offer,
            is_minority_not_participate: row.is_minority_not_participate,
            is_workgroup: row.is_workgroup,
            workgroup: row.workgroup,
            name_id: row.name_id,
            description_id: row.description_id,
            categories: row.categories,
            sub_communities: row.sub_communities,
            responsibilities: row.responsibilities,
            is_blocked: row.is_blocked,
            is_not_delegate: row.is_not_delegate,
            is_default_add_member: row.is_default_add_member,
            created_at: row.created_at,
        }
    }
}

/// Find the consolidated settings of a community.
pub async fn find_settings(
    conn: &mut PgConnection,
    community_id: Uuid,
) -> Result<Option<CommunitySettings>, sqlx::Error> {
    let row = sqlx::query_as::<_, CommunitySettingsRow>(
        "SELECT * FROM community_settings WHERE community_id = $1",
    )
    .bind(community_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(CommunitySettings::from))
}

/// Persist the consolidated settings of a community.
pub async fn update_settings(
    conn: &mut PgConnection,
    settings: &CommunitySettings,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE community_settings SET
            quorum = $2,
            vote = $3,
            significant_minority = $4,
            decision_delay = $5,
            dispute_time_limit = $6,
            is_secret_ballot = $7,
            is_can_offer = $8,
            is_minority_not_participate = $9,
            is_workgroup = $10,
            workgroup = $11,
            name_id = $12,
            description_id = $13,
            categories = $14,
            sub_communities = $15,
            responsibilities = $16,
            last_voting_params = $17,
            updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(settings.id)
    .bind(settings.quorum)
    .bind(settings.vote)
    .bind(settings.significant_minority)
    .bind(settings.decision_delay)
    .bind(settings.dispute_time_limit)
    .bind(settings.is_secret_ballot)
    .bind(settings.is_can_offer)
    .bind(settings.is_minority_not_participate)
    .bind(settings.is_workgroup)
    .bind(settings.workgroup)
    .bind(settings.name_id)
    .bind(settings.description_id)
    .bind(&settings.categories)
    .bind(&settings.sub_communities)
    .bind(&settings.responsibilities)
    .bind(settings.last_voting_params.map(Json))
    .execute(conn)
    .await?;
    Ok(())
}

/// List every member row of a community, blocked ones included, oldest first.
pub async fn list_member_settings(
    conn: &mut PgConnection,
    community_id: Uuid,
) -> Result<Vec<UserCommunitySettings>, sqlx::Error> {
    let rows = sqlx::query_as::<_, MemberSettingsRow>(
        r#"
        SELECT * FROM user_community_settings
        WHERE community_id = $1
        ORDER BY created_at, id
        "#,
    )
    .bind(community_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(UserCommunitySettings::from).collect())
}

/// Find a member's row in a community.
pub async fn find_member_settings(
    conn: &mut PgConnection,
    user_id: Uuid,
    community_id: Uuid,
) -> Result<Option<UserCommunitySettings>, sqlx::Error> {
    let row = sqlx::query_as::<_, MemberSettingsRow>(
        "SELECT * FROM user_community_settings WHERE user_id = $1 AND community_id = $2",
    )
    .bind(user_id)
    .bind(community_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(UserCommunitySettings::from))
}

/// Insert or overwrite a member's row. Rows are unique per (user, community).
pub async fn upsert_member_settings(
    conn: &mut PgConnection,
    settings: &UserCommunitySettings,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO user_community_settings (
            id, user_id, community_id, quorum, vote, significant_minority,
            decision_delay, dispute_time_limit, is_secret_ballot, is_can_offer,
            is_minority_not_participate, is_workgroup, workgroup, name_id,
            description_id, categories, sub_communities, responsibilities,
            is_blocked, is_not_delegate, is_default_add_member, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                $15, $16, $17, $18, $19, $20, $21, $22)
        ON CONFLICT (user_id, community_id) DO UPDATE SET
            quorum = EXCLUDED.quorum,
            vote = EXCLUDED.vote,
            significant_minority = EXCLUDED.significant_minority,
            decision_delay = EXCLUDED.decision_delay,
            dispute_time_limit = EXCLUDED.dispute_time_limit,
            is_secret_ballot = EXCLUDED.is_secret_ballot,
            is_can_offer = EXCLUDED.is_can_offer,
            is_minority_not_participate = EXCLUDED.is_minority_not_participate,
            is_workgroup = EXCLUDED.is_workgroup,
            workgroup = EXCLUDED.workgroup,
            name_id = EXCLUDED.name_id,
            description_id = EXCLUDED.description_id,
            categories = EXCLUDED.categories,
            sub_communities = EXCLUDED.sub_communities,
            responsibilities = EXCLUDED.responsibilities,
            is_blocked = EXCLUDED.is_blocked,
            is_not_delegate = EXCLUDED.is_not_delegate,
            is_default_add_member = EXCLUDED.is_default_add_member
        "#,
    )
    .bind(settings.id)
    .bind(settings.user_id)
    .bind(settings.community_id)
    .bind(settings.quorum)
    .bind(settings.vote)
    .bind(settings.significant_minority)
    .bind(settings.decision_delay)
    .bind(settings.dispute_time_limit)
    .bind(settings.is_secret_ballot)
    .bind(settings.is_can_offer)
    .bind(settings.is_minority_not_participate)
    .bind(settings.is_workgroup)
    .bind(settings.workgroup)
    .bind(settings.name_id)
    .bind(settings.description_id)
    .bind(&settings.categories)
    .bind(&settings.sub_communities)
    .bind(&settings.responsibilities)
    .bind(settings.is_blocked)
    .bind(settings.is_not_delegate)
    .bind(settings.is_default_add_member)
    .bind(settings.created_at)
    .execute(conn)
    .await?;
    Ok(())
}
