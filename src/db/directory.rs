//! Team and user queries.
//!
//! Every function takes a plain connection so callers decide the transaction
//! boundary: pass `&mut tx` inside a transaction or a pooled connection outside.

use crate::models::{Team, TeamMember, User};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

pub async fn team_exists(conn: &mut SqliteConnection, team_name: &str) -> Result<bool, sqlx::Error> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT 1 FROM teams WHERE team_name = ?")
        .bind(team_name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.is_some())
}

pub async fn insert_team(
    conn: &mut SqliteConnection,
    team_name: &str,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO teams (team_name, created_at, updated_at) VALUES (?, ?, ?)")
        .bind(team_name)
        .bind(now / 1000)
        .bind(now / 1000)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Insert a member or update an existing user in place, moving them to `team_name`.
pub async fn upsert_member(
    conn: &mut SqliteConnection,
    team_name: &str,
    member: &TeamMember,
    now: i64,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (user_id, username, team_name, is_active, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            username = excluded.username,
            team_name = excluded.team_name,
            is_active = excluded.is_active,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&member.user_id)
    .bind(&member.username)
    .bind(team_name)
    .bind(member.is_active)
    .bind(now / 1000)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Get a team with its members ordered by user id.
pub async fn get_team(
    conn: &mut SqliteConnection,
    team_name: &str,
) -> Result<Option<Team>, sqlx::Error> {
    if !team_exists(&mut *conn, team_name).await? {
        return Ok(None);
    }

    let members: Vec<TeamMember> = sqlx::query_as(
        r#"
        SELECT user_id, username, is_active
        FROM users
        WHERE team_name = ?
        ORDER BY user_id
        "#,
    )
    .bind(team_name)
    .fetch_all(&mut *conn)
    .await?;

    Ok(Some(Team {
        team_name: team_name.to_string(),
        members,
    }))
}

/// Take the write lock through a no-op write on a team row.
///
/// Used as the first statement of a cascade transaction so the transaction
/// holds SQLite's write lock before it reads anything. The row is left
/// unchanged. Returns `false` if the team does not exist.
pub async fn lock_team(conn: &mut SqliteConnection, team_name: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE teams SET updated_at = updated_at WHERE team_name = ?")
        .bind(team_name)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Take the write lock through a no-op write on a user row.
///
/// Returns `false` if the user does not exist.
pub async fn lock_user(conn: &mut SqliteConnection, user_id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET updated_at = updated_at WHERE user_id = ?")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn get_user(conn: &mut SqliteConnection, user_id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT user_id, username, team_name, is_active FROM users WHERE user_id = ?",
    )
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}

/// Ids of the active members of `team_name`, minus `exclude`, ordered by user id.
///
/// The ordering makes every candidate pool deterministic before any random
/// choice is applied to it.
pub async fn get_active_team_members(
    conn: &mut SqliteConnection,
    team_name: &str,
    exclude: &[String],
) -> Result<Vec<String>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new("SELECT user_id FROM users WHERE is_active = 1 AND team_name = ");
    query.push_bind(team_name);

    if !exclude.is_empty() {
        query.push(" AND user_id NOT IN (");
        let mut separated = query.separated(", ");
        for id in exclude {
            separated.push_bind(id);
        }
        separated.push_unseparated(")");
    }

    query.push(" ORDER BY user_id");

    let rows: Vec<(String,)> = query.build_query_as().fetch_all(&mut *conn).await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Look up many users at once. Unknown ids are simply absent from the result.
pub async fn get_users_by_ids(
    conn: &mut SqliteConnection,
    user_ids: &[String],
) -> Result<Vec<User>, sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT user_id, username, team_name, is_active FROM users WHERE user_id IN (",
    );
    let mut separated = query.separated(", ");
    for id in user_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY user_id");

    query.build_query_as::<User>().fetch_all(&mut *conn).await
}

/// Mark users inactive. Meant to run inside the caller's transaction.
pub async fn deactivate_users(
    conn: &mut SqliteConnection,
    user_ids: &[String],
    now: i64,
) -> Result<u64, sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(0);
    }

    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE users SET is_active = 0, updated_at = ");
    query.push_bind(now / 1000);
    query.push(" WHERE user_id IN (");
    let mut separated = query.separated(", ");
    for id in user_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let result = query.build().execute(&mut *conn).await?;
    Ok(result.rows_affected())
}

/// Set a user's active flag and return the updated record.
pub async fn set_user_active(
    conn: &mut SqliteConnection,
    user_id: &str,
    is_active: bool,
    now: i64,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users SET is_active = ?, updated_at = ?
        WHERE user_id = ?
        RETURNING user_id, username, team_name, is_active
        "#,
    )
    .bind(is_active)
    .bind(now / 1000)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await
}
