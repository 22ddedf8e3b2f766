//! System activity feed

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::AuthUser;
use shared::{ActivityKind, ActivityUpdate, Event, RECENT_ACTIVITY_LIMIT};

#[derive(Clone)]
pub struct ActivityService {
    db: PgPool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct SystemActivity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
    pub activity_type: ActivityKind,
    pub description: String,
    pub icon_class: String,
    pub created_at: DateTime<Utc>,
}

/// The user an activity is attributed to
#[derive(Debug, Clone, Copy)]
pub struct Actor<'a> {
    pub user_id: Uuid,
    pub username: &'a str,
}

impl<'a> From<&'a AuthUser> for Actor<'a> {
    fn from(user: &'a AuthUser) -> Self {
        Self {
            user_id: user.user_id,
            username: &user.username,
        }
    }
}

impl ActivityService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Latest entries, newest first
    pub async fn recent(&self) -> AppResult<Vec<SystemActivity>> {
        let activities = sqlx::query_as::<_, SystemActivity>(
            r#"
            SELECT a.id, a.user_id, u.username, a.activity_type, a.description, a.icon_class, a.created_at
            FROM system_activities a
            LEFT JOIN users u ON u.id = a.user_id
            ORDER BY a.created_at DESC
            LIMIT $1
            "#,
        )
        .bind(RECENT_ACTIVITY_LIMIT)
        .fetch_all(&self.db)
        .await?;

        Ok(activities)
    }
}

/// Inserts an activity entry inside the caller's transaction and returns the
/// `activity_update` event to publish once it commits.
pub async fn record(
    conn: &mut PgConnection,
    kind: ActivityKind,
    description: String,
    actor: Option<Actor<'_>>,
) -> AppResult<Event> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO system_activities (user_id, activity_type, description, icon_class)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(actor.map(|a| a.user_id))
    .bind(kind)
    .bind(&description)
    .bind(kind.icon_class())
    .fetch_one(&mut *conn)
    .await?;

    Ok(Event::ActivityUpdate(ActivityUpdate::new(
        id,
        kind,
        description,
        actor.map(|a| a.username),
    )))
}
