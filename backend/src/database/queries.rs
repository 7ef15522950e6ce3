//! Contains functions for executing database queries.
//!
//! All SQL of the service lives here. Handlers call these functions with a
//! pool, or with a transaction where several writes must land together.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{Executor, FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use uuid::Uuid;

use super::{models::*, Page};

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn like_pattern(search: &str) -> String {
    format!("%{}%", search.trim().to_lowercase())
}

// users

pub async fn find_user_by_id(pool: &SqlitePool, id: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
        .bind(username)
        .fetch_optional(pool)
        .await
}

pub async fn find_user_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(pool)
        .await
}

/// Only returns a user whose token has not expired yet.
pub async fn find_user_by_reset_token(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE reset_token = ? AND reset_token_expiry > ?",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(pool)
    .await
}

pub async fn insert_user<'e, E>(executor: E, user: &NewUser) -> Result<User, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let verified_at = user.is_verified.then_some(now);

    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (
            id, username, password_hash, first_name, last_name, phone_number, email,
            date_of_birth, government_id, id_type, barangay_residence, reason_for_registration,
            user_type, is_active, is_verified, verified_at, verified_by, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&user.username)
    .bind(&user.password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .bind(&user.phone_number)
    .bind(&user.email)
    .bind(user.date_of_birth)
    .bind(&user.government_id)
    .bind(&user.id_type)
    .bind(&user.barangay_residence)
    .bind(&user.reason_for_registration)
    .bind(user.user_type)
    .bind(user.is_active)
    .bind(user.is_verified)
    .bind(verified_at)
    .bind(&user.verified_by)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn record_failed_login(
    pool: &SqlitePool,
    id: &str,
    attempts: i64,
    locked_until: Option<DateTime<Utc>>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET failed_login_attempts = ?, locked_until = ?, updated_at = ? WHERE id = ?",
    )
    .bind(attempts)
    .bind(locked_until)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn clear_login_failures(pool: &SqlitePool, id: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        "UPDATE users SET failed_login_attempts = 0, locked_until = NULL WHERE id = ? AND (failed_login_attempts > 0 OR locked_until IS NOT NULL)",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn set_reset_token(
    pool: &SqlitePool,
    id: &str,
    token: &str,
    expiry: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET reset_token = ?, reset_token_expiry = ?, updated_at = ? WHERE id = ?")
        .bind(token)
        .bind(expiry)
        .bind(Utc::now())
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Stores a new hash and clears the reset token and any lockout.
pub async fn set_password(pool: &SqlitePool, id: &str, password_hash: &str) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = ?, reset_token = NULL, reset_token_expiry = NULL,
            failed_login_attempts = 0, locked_until = NULL, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(password_hash)
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

#[derive(Debug, Default, Clone)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub barangay_residence: Option<String>,
}

pub async fn update_profile(
    pool: &SqlitePool,
    id: &str,
    update: &ProfileUpdate,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET first_name = COALESCE(?, first_name),
            last_name = COALESCE(?, last_name),
            phone_number = COALESCE(?, phone_number),
            email = COALESCE(?, email),
            date_of_birth = COALESCE(?, date_of_birth),
            barangay_residence = COALESCE(?, barangay_residence),
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&update.first_name)
    .bind(&update.last_name)
    .bind(&update.phone_number)
    .bind(&update.email)
    .bind(update.date_of_birth)
    .bind(&update.barangay_residence)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn list_official_users(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE user_type != 'PUBLIC' ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

/// Active accounts for pickers, alphabetical by first name.
pub async fn list_active_users(pool: &SqlitePool, limit: i64) -> Result<Vec<UserSummary>, sqlx::Error> {
    sqlx::query_as::<_, UserSummary>(
        r#"
        SELECT id, first_name, last_name, user_type, is_active
        FROM users
        WHERE is_active = 1
        ORDER BY first_name ASC, last_name ASC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn active_enforcer_ids(pool: &SqlitePool) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM users WHERE user_type = 'ENFORCER' AND is_active = 1")
        .fetch_all(pool)
        .await
}

pub async fn count_users_by_type(pool: &SqlitePool) -> Result<Vec<(UserType, i64, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (UserType, i64, i64)>(
        "SELECT user_type, COUNT(*), COALESCE(SUM(is_active), 0) FROM users GROUP BY user_type",
    )
    .fetch_all(pool)
    .await
}

pub async fn user_signups_since(
    pool: &SqlitePool,
    since: DateTime<Utc>,
) -> Result<Vec<DateTime<Utc>>, sqlx::Error> {
    sqlx::query_scalar("SELECT created_at FROM users WHERE created_at >= ? ORDER BY created_at ASC")
        .bind(since)
        .fetch_all(pool)
        .await
}

/// Unverified accounts, plus public accounts that were switched off.
pub async fn list_pending_users(pool: &SqlitePool) -> Result<Vec<User>, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT * FROM users
        WHERE is_verified = 0 OR (user_type = 'PUBLIC' AND is_active = 0)
        ORDER BY created_at DESC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn set_user_verification(
    conn: &mut SqliteConnection,
    id: &str,
    approved: bool,
    verified_by: &str,
) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    if approved {
        sqlx::query(
            "UPDATE users SET is_active = 1, is_verified = 1, verified_at = ?, verified_by = ?, updated_at = ? WHERE id = ?",
        )
        .bind(now)
        .bind(verified_by)
        .bind(now)
        .bind(id)
        .execute(conn)
        .await?;
    } else {
        sqlx::query("UPDATE users SET is_active = 0, is_verified = 0, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(conn)
            .await?;
    }
    Ok(())
}

pub async fn set_user_active(
    conn: &mut SqliteConnection,
    id: &str,
    active: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE users SET is_active = ?, updated_at = ? WHERE id = ?")
        .bind(active)
        .bind(Utc::now())
        .bind(id)
        .execute(conn)
        .await?;
    Ok(())
}

pub async fn insert_verification_log<'e, E>(
    executor: E,
    user_id: &str,
    action: &str,
    performed_by: &str,
    reason: Option<&str>,
) -> Result<(), sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query(
        "INSERT INTO user_verification_logs (id, user_id, action, performed_by, reason, created_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(new_id())
    .bind(user_id)
    .bind(action)
    .bind(performed_by)
    .bind(reason)
    .bind(Utc::now())
    .execute(executor)
    .await?;
    Ok(())
}

pub async fn list_verification_logs(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Vec<UserVerificationLog>, sqlx::Error> {
    sqlx::query_as::<_, UserVerificationLog>(
        "SELECT * FROM user_verification_logs WHERE user_id = ? ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct CreationRecord {
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub notes: Option<String>,
}

pub async fn insert_admin_user_creation(
    conn: &mut SqliteConnection,
    created_by: &str,
    created_user: &User,
    record: &CreationRecord,
) -> Result<AdminUserCreation, sqlx::Error> {
    sqlx::query_as::<_, AdminUserCreation>(
        r#"
        INSERT INTO admin_user_creations (
            id, created_by, created_user_id, user_type, department, position, employee_id, notes, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(created_by)
    .bind(&created_user.id)
    .bind(created_user.user_type)
    .bind(&record.department)
    .bind(&record.position)
    .bind(&record.employee_id)
    .bind(&record.notes)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

// incidents

pub async fn insert_incident<'e, E>(executor: E, incident: &NewIncident) -> Result<Incident, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    sqlx::query_as::<_, Incident>(
        r#"
        INSERT INTO incidents (
            id, incident_type, description, location, coordinates, plate_number, driver_license,
            vehicle_type, incident_date, status, ticket_number, penalty_amount, remarks,
            reported_by_id, handled_by_id, vehicle_id, resolved_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(incident.incident_type)
    .bind(&incident.description)
    .bind(&incident.location)
    .bind(&incident.coordinates)
    .bind(&incident.plate_number)
    .bind(&incident.driver_license)
    .bind(incident.vehicle_type)
    .bind(incident.incident_date)
    .bind(incident.status)
    .bind(&incident.ticket_number)
    .bind(incident.penalty_amount)
    .bind(&incident.remarks)
    .bind(&incident.reported_by_id)
    .bind(&incident.handled_by_id)
    .bind(&incident.vehicle_id)
    .bind(incident.resolved_at)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn find_incident(pool: &SqlitePool, id: &str) -> Result<Option<Incident>, sqlx::Error> {
    sqlx::query_as::<_, Incident>("SELECT * FROM incidents WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn ticket_number_exists(pool: &SqlitePool, ticket: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incidents WHERE ticket_number = ?")
        .bind(ticket)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Newest first.
pub async fn list_incidents_by_reporter(
    pool: &SqlitePool,
    reporter_id: &str,
    page: Page,
) -> Result<(Vec<Incident>, i64), sqlx::Error> {
    let incidents = sqlx::query_as::<_, Incident>(
        "SELECT * FROM incidents WHERE reported_by_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(reporter_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM incidents WHERE reported_by_id = ?")
        .bind(reporter_id)
        .fetch_one(pool)
        .await?;

    Ok((incidents, total))
}

/// Oldest first, so the queue is worked in arrival order.
pub async fn list_incident_queue(
    pool: &SqlitePool,
    status: Option<IncidentStatus>,
) -> Result<Vec<Incident>, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM incidents");
    if let Some(status) = status {
        qb.push(" WHERE status = ").push_bind(status);
    }
    qb.push(" ORDER BY created_at ASC");
    qb.build_query_as::<Incident>().fetch_all(pool).await
}

/// A state change applied only if the incident is still in `from`.
#[derive(Debug, Clone)]
pub struct IncidentTransition {
    pub from: IncidentStatus,
    pub to: IncidentStatus,
    pub handled_by_id: Option<String>,
    pub ticket_number: Option<String>,
    pub penalty_amount: Option<f64>,
    pub remarks: Option<String>,
}

/// Returns `None` when another request changed the incident first.
pub async fn transition_incident(
    pool: &SqlitePool,
    id: &str,
    change: &IncidentTransition,
) -> Result<Option<Incident>, sqlx::Error> {
    let now = Utc::now();
    let resolved_at = change.to.is_terminal().then_some(now);

    sqlx::query_as::<_, Incident>(
        r#"
        UPDATE incidents
        SET status = ?,
            handled_by_id = COALESCE(?, handled_by_id),
            ticket_number = COALESCE(?, ticket_number),
            penalty_amount = COALESCE(?, penalty_amount),
            remarks = COALESCE(?, remarks),
            resolved_at = COALESCE(?, resolved_at),
            updated_at = ?
        WHERE id = ? AND status = ?
        RETURNING *
        "#,
    )
    .bind(change.to)
    .bind(&change.handled_by_id)
    .bind(&change.ticket_number)
    .bind(change.penalty_amount)
    .bind(&change.remarks)
    .bind(resolved_at)
    .bind(now)
    .bind(id)
    .bind(change.from)
    .fetch_optional(pool)
    .await
}

/// Case-insensitive plate match, newest first.
pub async fn list_incidents_by_plate(
    pool: &SqlitePool,
    plate: &str,
) -> Result<Vec<Incident>, sqlx::Error> {
    sqlx::query_as::<_, Incident>(
        "SELECT * FROM incidents WHERE UPPER(plate_number) = UPPER(?) ORDER BY created_at DESC",
    )
    .bind(plate.trim())
    .fetch_all(pool)
    .await
}

pub async fn count_incidents_by_status(
    pool: &SqlitePool,
) -> Result<Vec<(IncidentStatus, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (IncidentStatus, i64)>(
        "SELECT status, COUNT(*) FROM incidents GROUP BY status",
    )
    .fetch_all(pool)
    .await
}

/// Headline counters for the shared dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardCounts {
    pub total_users: i64,
    pub total_incidents: i64,
    pub pending_incidents: i64,
    pub resolved_incidents: i64,
    pub total_vehicles: i64,
    pub total_permits: i64,
}

pub async fn dashboard_counts(pool: &SqlitePool) -> Result<DashboardCounts, sqlx::Error> {
    sqlx::query_as::<_, DashboardCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM users) AS total_users,
            (SELECT COUNT(*) FROM incidents) AS total_incidents,
            (SELECT COUNT(*) FROM incidents WHERE status = 'PENDING') AS pending_incidents,
            (SELECT COUNT(*) FROM incidents WHERE status = 'RESOLVED') AS resolved_incidents,
            (SELECT COUNT(*) FROM vehicles) AS total_vehicles,
            (SELECT COUNT(*) FROM permits) AS total_permits
        "#,
    )
    .fetch_one(pool)
    .await
}

/// Workload counters for one enforcer.
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow)]
pub struct EnforcerCounts {
    pub active_incidents: i64,
    pub assigned_to_me: i64,
    pub resolved_today: i64,
    pub pending_evidence: i64,
    pub tickets_issued: i64,
}

pub async fn enforcer_counts(
    pool: &SqlitePool,
    enforcer_id: &str,
    day_start: DateTime<Utc>,
) -> Result<EnforcerCounts, sqlx::Error> {
    sqlx::query_as::<_, EnforcerCounts>(
        r#"
        SELECT
            (SELECT COUNT(*) FROM incidents WHERE status IN ('PENDING', 'INVESTIGATING')) AS active_incidents,
            (SELECT COUNT(*) FROM incidents WHERE status = 'INVESTIGATING' AND handled_by_id = ?1) AS assigned_to_me,
            (SELECT COUNT(*) FROM incidents
             WHERE status = 'RESOLVED' AND handled_by_id = ?1 AND resolved_at >= ?2) AS resolved_today,
            (SELECT COUNT(*) FROM evidence e JOIN incidents i ON i.id = e.incident_id
             WHERE e.status = 'PENDING_REVIEW' AND i.handled_by_id = ?1) AS pending_evidence,
            (SELECT COUNT(*) FROM incidents WHERE handled_by_id = ?1 AND ticket_number IS NOT NULL) AS tickets_issued
        "#,
    )
    .bind(enforcer_id)
    .bind(day_start)
    .fetch_one(pool)
    .await
}

/// `(created_at, resolved_at)` of the incidents an enforcer resolved.
pub async fn resolution_spans(
    pool: &SqlitePool,
    enforcer_id: &str,
) -> Result<Vec<(DateTime<Utc>, DateTime<Utc>)>, sqlx::Error> {
    sqlx::query_as::<_, (DateTime<Utc>, DateTime<Utc>)>(
        r#"
        SELECT created_at, resolved_at FROM incidents
        WHERE status = 'RESOLVED' AND handled_by_id = ? AND resolved_at IS NOT NULL
        "#,
    )
    .bind(enforcer_id)
    .fetch_all(pool)
    .await
}

/// An incident joined with the names of its reporter and handler.
#[derive(Debug, Clone, FromRow)]
pub struct IncidentWithNames {
    pub id: String,
    pub incident_type: IncidentType,
    pub description: String,
    pub status: IncidentStatus,
    pub location: String,
    pub ticket_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub reporter_name: Option<String>,
    pub handler_name: Option<String>,
}

pub async fn recent_incidents(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<IncidentWithNames>, sqlx::Error> {
    sqlx::query_as::<_, IncidentWithNames>(
        r#"
        SELECT i.id, i.incident_type, i.description, i.status, i.location, i.ticket_number, i.created_at,
               r.first_name || ' ' || r.last_name AS reporter_name,
               h.first_name || ' ' || h.last_name AS handler_name
        FROM incidents i
        LEFT JOIN users r ON r.id = i.reported_by_id
        LEFT JOIN users h ON h.id = i.handled_by_id
        ORDER BY i.created_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn incidents_created_since(
    pool: &SqlitePool,
    since: DateTime<Utc>,
) -> Result<Vec<Incident>, sqlx::Error> {
    sqlx::query_as::<_, Incident>(
        "SELECT * FROM incidents WHERE created_at >= ? ORDER BY created_at ASC",
    )
    .bind(since)
    .fetch_all(pool)
    .await
}

/// Ids of closed incidents whose evidence may be purged.
pub async fn closed_incident_ids_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<String>, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT id FROM incidents WHERE status IN ('RESOLVED', 'DISMISSED') AND resolved_at < ?",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
}

// evidence

#[derive(Debug, Clone)]
pub struct NewEvidence {
    pub incident_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: String,
}

pub async fn insert_evidence<'e, E>(executor: E, evidence: &NewEvidence) -> Result<Evidence, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    sqlx::query_as::<_, Evidence>(
        r#"
        INSERT INTO evidence (
            id, incident_id, file_name, file_url, file_type, file_size, mime_type,
            uploaded_by, status, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'PENDING_REVIEW', ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&evidence.incident_id)
    .bind(&evidence.file_name)
    .bind(&evidence.file_url)
    .bind(evidence.file_type)
    .bind(evidence.file_size)
    .bind(&evidence.mime_type)
    .bind(&evidence.uploaded_by)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
}

pub async fn find_evidence(pool: &SqlitePool, id: &str) -> Result<Option<Evidence>, sqlx::Error> {
    sqlx::query_as::<_, Evidence>("SELECT * FROM evidence WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn list_evidence(pool: &SqlitePool, incident_id: &str) -> Result<Vec<Evidence>, sqlx::Error> {
    sqlx::query_as::<_, Evidence>(
        "SELECT * FROM evidence WHERE incident_id = ? ORDER BY created_at DESC",
    )
    .bind(incident_id)
    .fetch_all(pool)
    .await
}

pub async fn review_evidence(
    pool: &SqlitePool,
    id: &str,
    status: EvidenceStatus,
    reviewer_id: &str,
    remarks: Option<&str>,
) -> Result<Evidence, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Evidence>(
        r#"
        UPDATE evidence
        SET status = ?, reviewed_by = ?, reviewed_at = ?, remarks = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(status)
    .bind(reviewer_id)
    .bind(now)
    .bind(remarks)
    .bind(now)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub async fn mark_evidence_purged(
    pool: &SqlitePool,
    incident_id: &str,
    remark: &str,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE evidence SET remarks = ?, updated_at = ? WHERE incident_id = ?")
        .bind(remark)
        .bind(Utc::now())
        .bind(incident_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// `(file_type, files, bytes)` per type.
pub async fn evidence_usage_by_type(
    pool: &SqlitePool,
) -> Result<Vec<(FileType, i64, i64)>, sqlx::Error> {
    sqlx::query_as::<_, (FileType, i64, i64)>(
        "SELECT file_type, COUNT(*), COALESCE(SUM(file_size), 0) FROM evidence GROUP BY file_type ORDER BY file_type",
    )
    .fetch_all(pool)
    .await
}

// vehicles

#[derive(Debug, Clone, Default)]
pub struct VehicleFilter {
    pub vehicle_type: Option<VehicleType>,
    pub is_active: Option<bool>,
    pub search: Option<String>,
}

fn push_vehicle_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &VehicleFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(vehicle_type) = filter.vehicle_type {
        qb.push(" AND vehicle_type = ").push_bind(vehicle_type);
    }
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(plate_number) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(owner_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(driver_name, '')) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_vehicles(
    pool: &SqlitePool,
    filter: &VehicleFilter,
    page: Page,
) -> Result<(Vec<Vehicle>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM vehicles");
    push_vehicle_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let vehicles = qb.build_query_as::<Vehicle>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM vehicles");
    push_vehicle_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok((vehicles, total))
}

/// A driver named on an active vehicle record.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverEntry {
    pub vehicle_id: String,
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub driver_name: String,
    pub driver_license: Option<String>,
}

pub async fn list_drivers(pool: &SqlitePool, limit: i64) -> Result<Vec<DriverEntry>, sqlx::Error> {
    sqlx::query_as::<_, DriverEntry>(
        r#"
        SELECT id AS vehicle_id, plate_number, vehicle_type, driver_name, driver_license
        FROM vehicles
        WHERE is_active = 1 AND driver_name IS NOT NULL AND TRIM(driver_name) != ''
        ORDER BY driver_name ASC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn find_vehicle(pool: &SqlitePool, id: &str) -> Result<Option<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_vehicle_by_plate(
    pool: &SqlitePool,
    plate: &str,
) -> Result<Option<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>("SELECT * FROM vehicles WHERE UPPER(plate_number) = UPPER(?)")
        .bind(plate.trim())
        .fetch_optional(pool)
        .await
}

pub async fn vehicle_id_for_plate<'e, E>(executor: E, plate: &str) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_scalar("SELECT id FROM vehicles WHERE UPPER(plate_number) = UPPER(?)")
        .bind(plate.trim())
        .fetch_optional(executor)
        .await
}

#[derive(Debug, Clone)]
pub struct VehicleRecord {
    pub plate_number: String,
    pub vehicle_type: VehicleType,
    pub make: String,
    pub model: String,
    pub year: i64,
    pub color: String,
    pub capacity: i64,
    pub owner_name: String,
    pub owner_contact: String,
    pub driver_name: Option<String>,
    pub driver_license: Option<String>,
    pub registration_expiry: DateTime<Utc>,
    pub insurance_expiry: Option<DateTime<Utc>>,
}

pub async fn insert_vehicle<'e, E>(executor: E, vehicle: &VehicleRecord) -> Result<Vehicle, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    sqlx::query_as::<_, Vehicle>(
        r#"
        INSERT INTO vehicles (
            id, plate_number, vehicle_type, make, model, year, color, capacity, owner_name,
            owner_contact, driver_name, driver_license, registration_expiry, insurance_expiry,
            is_active, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&vehicle.plate_number)
    .bind(vehicle.vehicle_type)
    .bind(&vehicle.make)
    .bind(&vehicle.model)
    .bind(vehicle.year)
    .bind(&vehicle.color)
    .bind(vehicle.capacity)
    .bind(&vehicle.owner_name)
    .bind(&vehicle.owner_contact)
    .bind(&vehicle.driver_name)
    .bind(&vehicle.driver_license)
    .bind(vehicle.registration_expiry)
    .bind(vehicle.insurance_expiry)
    .bind(now)
    .bind(now)
    .fetch_one(executor)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct VehiclePatch {
    pub vehicle_type: Option<VehicleType>,
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i64>,
    pub color: Option<String>,
    pub capacity: Option<i64>,
    pub owner_name: Option<String>,
    pub owner_contact: Option<String>,
    pub driver_name: Option<String>,
    pub driver_license: Option<String>,
    pub registration_expiry: Option<DateTime<Utc>>,
    pub insurance_expiry: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

pub async fn update_vehicle(
    pool: &SqlitePool,
    id: &str,
    patch: &VehiclePatch,
) -> Result<Option<Vehicle>, sqlx::Error> {
    sqlx::query_as::<_, Vehicle>(
        r#"
        UPDATE vehicles
        SET vehicle_type = COALESCE(?, vehicle_type),
            make = COALESCE(?, make),
            model = COALESCE(?, model),
            year = COALESCE(?, year),
            color = COALESCE(?, color),
            capacity = COALESCE(?, capacity),
            owner_name = COALESCE(?, owner_name),
            owner_contact = COALESCE(?, owner_contact),
            driver_name = COALESCE(?, driver_name),
            driver_license = COALESCE(?, driver_license),
            registration_expiry = COALESCE(?, registration_expiry),
            insurance_expiry = COALESCE(?, insurance_expiry),
            is_active = COALESCE(?, is_active),
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(patch.vehicle_type)
    .bind(&patch.make)
    .bind(&patch.model)
    .bind(patch.year)
    .bind(&patch.color)
    .bind(patch.capacity)
    .bind(&patch.owner_name)
    .bind(&patch.owner_contact)
    .bind(&patch.driver_name)
    .bind(&patch.driver_license)
    .bind(patch.registration_expiry)
    .bind(patch.insurance_expiry)
    .bind(patch.is_active)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await
}

// permits

#[derive(Debug, Clone, Default)]
pub struct PermitFilter {
    pub status: Option<PermitStatus>,
    pub vehicle_type: Option<VehicleType>,
    pub search: Option<String>,
}

fn push_permit_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &PermitFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status);
    }
    if let Some(vehicle_type) = filter.vehicle_type {
        qb.push(" AND vehicle_type = ").push_bind(vehicle_type);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(plate_number) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(driver_full_name) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_permits(
    pool: &SqlitePool,
    filter: &PermitFilter,
    page: Page,
) -> Result<(Vec<Permit>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM permits");
    push_permit_filter(&mut qb, filter);
    qb.push(" ORDER BY encoded_at DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let permits = qb.build_query_as::<Permit>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM permits");
    push_permit_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok((permits, total))
}

pub async fn find_permit(pool: &SqlitePool, id: &str) -> Result<Option<Permit>, sqlx::Error> {
    sqlx::query_as::<_, Permit>("SELECT * FROM permits WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn find_permit_by_plate(pool: &SqlitePool, plate: &str) -> Result<Option<Permit>, sqlx::Error> {
    sqlx::query_as::<_, Permit>("SELECT * FROM permits WHERE plate_number = ?")
        .bind(plate)
        .fetch_optional(pool)
        .await
}

pub async fn find_permit_by_permit_plate(
    pool: &SqlitePool,
    permit_plate: &str,
) -> Result<Option<Permit>, sqlx::Error> {
    sqlx::query_as::<_, Permit>("SELECT * FROM permits WHERE permit_plate_number = ?")
        .bind(permit_plate)
        .fetch_optional(pool)
        .await
}

pub async fn insert_permit(
    pool: &SqlitePool,
    plate_number: &str,
    driver_full_name: &str,
    vehicle_type: VehicleType,
    expiry_date: DateTime<Utc>,
    encoded_by: &str,
) -> Result<Permit, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Permit>(
        r#"
        INSERT INTO permits (
            id, plate_number, driver_full_name, vehicle_type, issued_date, expiry_date,
            status, encoded_by, encoded_at, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 'ACTIVE', ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(plate_number)
    .bind(driver_full_name)
    .bind(vehicle_type)
    .bind(now)
    .bind(expiry_date)
    .bind(encoded_by)
    .bind(now)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct PermitPatch {
    pub permit_plate_number: Option<String>,
    pub driver_full_name: Option<String>,
    pub status: Option<PermitStatus>,
    pub remarks: Option<String>,
}

pub async fn update_permit(
    pool: &SqlitePool,
    id: &str,
    patch: &PermitPatch,
    updated_by: &str,
) -> Result<Option<Permit>, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, Permit>(
        r#"
        UPDATE permits
        SET permit_plate_number = COALESCE(?, permit_plate_number),
            driver_full_name = COALESCE(?, driver_full_name),
            status = COALESCE(?, status),
            remarks = COALESCE(?, remarks),
            last_updated_by = ?,
            last_updated_at = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&patch.permit_plate_number)
    .bind(&patch.driver_full_name)
    .bind(patch.status)
    .bind(&patch.remarks)
    .bind(updated_by)
    .bind(now)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_permit(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM permits WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Extends the permit and records the renewal atomically.
pub async fn renew_permit(
    pool: &SqlitePool,
    permit: &Permit,
    new_expiry: DateTime<Utc>,
    renewed_by: &str,
    notes: Option<&str>,
) -> Result<Permit, sqlx::Error> {
    let now = Utc::now();
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO permit_renewals (id, permit_id, previous_expiry, new_expiry, renewed_by, renewed_at, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(new_id())
    .bind(&permit.id)
    .bind(permit.expiry_date)
    .bind(new_expiry)
    .bind(renewed_by)
    .bind(now)
    .bind(notes)
    .execute(&mut *tx)
    .await?;

    let renewed = sqlx::query_as::<_, Permit>(
        r#"
        UPDATE permits
        SET expiry_date = ?, status = 'ACTIVE', last_updated_by = ?, last_updated_at = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(new_expiry)
    .bind(renewed_by)
    .bind(now)
    .bind(now)
    .bind(&permit.id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(renewed)
}

pub async fn list_permit_renewals(
    pool: &SqlitePool,
    permit_id: &str,
) -> Result<Vec<PermitRenewal>, sqlx::Error> {
    sqlx::query_as::<_, PermitRenewal>(
        "SELECT * FROM permit_renewals WHERE permit_id = ? ORDER BY renewed_at DESC",
    )
    .bind(permit_id)
    .fetch_all(pool)
    .await
}

// locations

/// Active locations offered to the public, by name.
pub async fn list_public_locations(pool: &SqlitePool) -> Result<Vec<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>(
        r#"
        SELECT * FROM locations
        WHERE is_active = 1 AND validation_status IN ('VALIDATED', 'PENDING')
        ORDER BY name ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

pub async fn list_all_locations(pool: &SqlitePool) -> Result<Vec<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>("SELECT * FROM locations ORDER BY name ASC")
        .fetch_all(pool)
        .await
}

pub async fn find_location(pool: &SqlitePool, id: &str) -> Result<Option<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>("SELECT * FROM locations WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Exact match first, then case-insensitive; only active rows.
pub async fn find_location_by_name(
    pool: &SqlitePool,
    name: &str,
) -> Result<Option<Location>, sqlx::Error> {
    sqlx::query_as::<_, Location>(
        r#"
        SELECT * FROM locations
        WHERE is_active = 1 AND (name = ?1 OR LOWER(name) = LOWER(?1))
        ORDER BY name = ?1 DESC
        LIMIT 1
        "#,
    )
    .bind(name.trim())
    .fetch_optional(pool)
    .await
}

/// Case-insensitive name clash with any row other than `except_id`.
pub async fn location_name_taken(
    pool: &SqlitePool,
    name: &str,
    except_id: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM locations WHERE LOWER(name) = LOWER(?) AND id != COALESCE(?, '')",
    )
    .bind(name.trim())
    .bind(except_id)
    .fetch_one(pool)
    .await?;
    Ok(count > 0)
}

#[derive(Debug, Clone)]
pub struct LocationRecord {
    pub name: String,
    pub location_type: LocationType,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub description: Option<String>,
    pub validation_status: ValidationStatus,
}

pub async fn insert_location(
    pool: &SqlitePool,
    record: &LocationRecord,
    created_by: &str,
) -> Result<Location, sqlx::Error> {
    let now = Utc::now();
    let validated = matches!(record.validation_status, ValidationStatus::Validated);
    sqlx::query_as::<_, Location>(
        r#"
        INSERT INTO locations (
            id, name, location_type, latitude, longitude, address, description, is_active,
            validation_status, validated_at, validated_by, created_by, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&record.name)
    .bind(record.location_type)
    .bind(record.latitude)
    .bind(record.longitude)
    .bind(&record.address)
    .bind(&record.description)
    .bind(record.validation_status)
    .bind(validated.then_some(now))
    .bind(validated.then_some(created_by))
    .bind(created_by)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct LocationPatch {
    pub name: Option<String>,
    pub location_type: Option<LocationType>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub validation_status: Option<ValidationStatus>,
}

pub async fn update_location(
    pool: &SqlitePool,
    id: &str,
    patch: &LocationPatch,
    updated_by: &str,
) -> Result<Option<Location>, sqlx::Error> {
    let now = Utc::now();
    let validated = patch.validation_status.is_some();
    sqlx::query_as::<_, Location>(
        r#"
        UPDATE locations
        SET name = COALESCE(?, name),
            location_type = COALESCE(?, location_type),
            latitude = COALESCE(?, latitude),
            longitude = COALESCE(?, longitude),
            address = COALESCE(?, address),
            description = COALESCE(?, description),
            is_active = COALESCE(?, is_active),
            validation_status = COALESCE(?, validation_status),
            validated_at = CASE WHEN ? THEN ? ELSE validated_at END,
            validated_by = CASE WHEN ? THEN ? ELSE validated_by END,
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(&patch.name)
    .bind(patch.location_type)
    .bind(patch.latitude)
    .bind(patch.longitude)
    .bind(&patch.address)
    .bind(&patch.description)
    .bind(patch.is_active)
    .bind(patch.validation_status)
    .bind(validated)
    .bind(now)
    .bind(validated)
    .bind(updated_by)
    .bind(now)
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn delete_location(pool: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM locations WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// discount cards

pub async fn find_card_by_user(
    pool: &SqlitePool,
    user_id: &str,
) -> Result<Option<DiscountCard>, sqlx::Error> {
    sqlx::query_as::<_, DiscountCard>("SELECT * FROM discount_cards WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

pub async fn find_card(pool: &SqlitePool, id: &str) -> Result<Option<DiscountCard>, sqlx::Error> {
    sqlx::query_as::<_, DiscountCard>("SELECT * FROM discount_cards WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub async fn insert_card(pool: &SqlitePool, card: &NewDiscountCard) -> Result<DiscountCard, sqlx::Error> {
    let now = Utc::now();
    let verified_at = card.verified_by.as_ref().map(|_| now);
    sqlx::query_as::<_, DiscountCard>(
        r#"
        INSERT INTO discount_cards (
            id, user_id, discount_type, full_name, date_of_birth, photo_url, id_number, id_type,
            issuing_authority, school_name, school_address, grade_level, school_id_expiry,
            disability_type, pwd_id_expiry, verification_status, verified_by, verified_at,
            is_admin_override, override_reason, is_active, valid_from, valid_until,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&card.user_id)
    .bind(card.discount_type)
    .bind(&card.full_name)
    .bind(card.date_of_birth)
    .bind(&card.photo_url)
    .bind(&card.id_number)
    .bind(&card.id_type)
    .bind(&card.issuing_authority)
    .bind(&card.school_name)
    .bind(&card.school_address)
    .bind(&card.grade_level)
    .bind(card.school_id_expiry)
    .bind(&card.disability_type)
    .bind(card.pwd_id_expiry)
    .bind(card.verification_status)
    .bind(&card.verified_by)
    .bind(verified_at)
    .bind(card.is_admin_override)
    .bind(&card.override_reason)
    .bind(card.is_active)
    .bind(card.valid_from)
    .bind(card.valid_until)
    .bind(now)
    .bind(now)
    .fetch_one(pool)
    .await
}

/// Replaces the applicant's details and puts the card back in the queue.
pub async fn resubmit_card(
    pool: &SqlitePool,
    id: &str,
    card: &NewDiscountCard,
) -> Result<DiscountCard, sqlx::Error> {
    sqlx::query_as::<_, DiscountCard>(
        r#"
        UPDATE discount_cards
        SET discount_type = ?, full_name = ?, date_of_birth = ?, photo_url = ?,
            id_number = ?, id_type = ?, issuing_authority = ?,
            school_name = ?, school_address = ?, grade_level = ?, school_id_expiry = ?,
            disability_type = ?, pwd_id_expiry = ?,
            verification_status = 'PENDING', rejection_reason = NULL,
            verified_by = NULL, verified_at = NULL, is_active = 0,
            valid_from = ?, valid_until = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(card.discount_type)
    .bind(&card.full_name)
    .bind(card.date_of_birth)
    .bind(&card.photo_url)
    .bind(&card.id_number)
    .bind(&card.id_type)
    .bind(&card.issuing_authority)
    .bind(&card.school_name)
    .bind(&card.school_address)
    .bind(&card.grade_level)
    .bind(card.school_id_expiry)
    .bind(&card.disability_type)
    .bind(card.pwd_id_expiry)
    .bind(card.valid_from)
    .bind(card.valid_until)
    .bind(Utc::now())
    .bind(id)
    .fetch_one(pool)
    .await
}

#[derive(Debug, Clone, Default)]
pub struct CardFilter {
    pub status: Option<CardStatus>,
    pub discount_type: Option<DiscountType>,
    pub is_active: Option<bool>,
    pub is_admin_override: Option<bool>,
    pub search: Option<String>,
}

fn push_card_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &CardFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(status) = filter.status {
        qb.push(" AND verification_status = ").push_bind(status);
    }
    if let Some(discount_type) = filter.discount_type {
        qb.push(" AND discount_type = ").push_bind(discount_type);
    }
    if let Some(active) = filter.is_active {
        qb.push(" AND is_active = ").push_bind(active);
    }
    if let Some(is_override) = filter.is_admin_override {
        qb.push(" AND is_admin_override = ").push_bind(is_override);
    }
    if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
        let pattern = like_pattern(search);
        qb.push(" AND (LOWER(full_name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR LOWER(COALESCE(id_number, '')) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

pub async fn list_cards(
    pool: &SqlitePool,
    filter: &CardFilter,
    page: Page,
) -> Result<(Vec<DiscountCard>, i64), sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM discount_cards");
    push_card_filter(&mut qb, filter);
    qb.push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(page.limit)
        .push(" OFFSET ")
        .push_bind(page.offset());
    let cards = qb.build_query_as::<DiscountCard>().fetch_all(pool).await?;

    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM discount_cards");
    push_card_filter(&mut count, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    Ok((cards, total))
}

/// Status change made by an administrator.
#[derive(Debug, Clone)]
pub struct CardReview {
    pub status: Option<CardStatus>,
    pub is_active: Option<bool>,
    pub rejection_reason: Option<String>,
}

pub async fn review_card(
    conn: &mut SqliteConnection,
    id: &str,
    review: &CardReview,
    admin_id: &str,
) -> Result<DiscountCard, sqlx::Error> {
    let now = Utc::now();
    sqlx::query_as::<_, DiscountCard>(
        r#"
        UPDATE discount_cards
        SET verification_status = COALESCE(?, verification_status),
            is_active = COALESCE(?, is_active),
            rejection_reason = COALESCE(?, rejection_reason),
            verified_by = ?,
            verified_at = ?,
            updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(review.status)
    .bind(review.is_active)
    .bind(&review.rejection_reason)
    .bind(admin_id)
    .bind(now)
    .bind(now)
    .bind(id)
    .fetch_one(conn)
    .await
}

/// Bumps the usage counters; the daily counter restarts on a new UTC day.
pub async fn record_card_usage(
    conn: &mut SqliteConnection,
    card_id: &str,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    let today = now.date_naive().to_string();
    sqlx::query(
        r#"
        UPDATE discount_cards
        SET usage_count = usage_count + 1,
            daily_usage_count = CASE
                WHEN last_daily_reset IS NULL OR substr(last_daily_reset, 1, 10) != ? THEN 1
                ELSE daily_usage_count + 1
            END,
            last_daily_reset = CASE
                WHEN last_daily_reset IS NULL OR substr(last_daily_reset, 1, 10) != ? THEN ?
                ELSE last_daily_reset
            END,
            last_used_at = ?,
            updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(&today)
    .bind(&today)
    .bind(now)
    .bind(now)
    .bind(now)
    .bind(card_id)
    .execute(conn)
    .await?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct NewUsageLog {
    pub discount_card_id: String,
    pub fare_calculation_id: Option<String>,
    pub original_fare: f64,
    pub discount_amount: f64,
    pub final_fare: f64,
    pub from_location: String,
    pub to_location: String,
    pub distance: f64,
}

pub async fn insert_usage_log(
    conn: &mut SqliteConnection,
    log: &NewUsageLog,
) -> Result<DiscountUsageLog, sqlx::Error> {
    sqlx::query_as::<_, DiscountUsageLog>(
        r#"
        INSERT INTO discount_usage_logs (
            id, discount_card_id, fare_calculation_id, original_fare, discount_amount,
            final_fare, from_location, to_location, distance, used_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&log.discount_card_id)
    .bind(&log.fare_calculation_id)
    .bind(log.original_fare)
    .bind(log.discount_amount)
    .bind(log.final_fare)
    .bind(&log.from_location)
    .bind(&log.to_location)
    .bind(log.distance)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

// fare calculations

#[derive(Debug, Clone)]
pub struct NewFareCalculation {
    pub user_id: Option<String>,
    pub from_location: String,
    pub to_location: String,
    pub distance: f64,
    pub calculated_fare: f64,
    pub original_fare: Option<f64>,
    pub discount_applied: Option<f64>,
    pub discount_type: Option<DiscountType>,
    pub calculation_type: String,
    pub route_data: Option<String>,
    pub vehicle_type: Option<VehicleType>,
}

pub async fn insert_fare_calculation(
    conn: &mut SqliteConnection,
    calc: &NewFareCalculation,
) -> Result<FareCalculation, sqlx::Error> {
    sqlx::query_as::<_, FareCalculation>(
        r#"
        INSERT INTO fare_calculations (
            id, user_id, from_location, to_location, distance, calculated_fare, original_fare,
            discount_applied, discount_type, calculation_type, route_data, vehicle_type, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(new_id())
    .bind(&calc.user_id)
    .bind(&calc.from_location)
    .bind(&calc.to_location)
    .bind(calc.distance)
    .bind(calc.calculated_fare)
    .bind(calc.original_fare)
    .bind(calc.discount_applied)
    .bind(calc.discount_type)
    .bind(&calc.calculation_type)
    .bind(&calc.route_data)
    .bind(calc.vehicle_type)
    .bind(Utc::now())
    .fetch_one(conn)
    .await
}

/// The caller's saved calculations, newest first, with the total count.
pub async fn list_fare_calculations(
    pool: &SqlitePool,
    user_id: &str,
    page: Page,
) -> Result<(Vec<FareCalculation>, i64), sqlx::Error> {
    let calculations = sqlx::query_as::<_, FareCalculation>(
        "SELECT * FROM fare_calculations WHERE user_id = ? ORDER BY created_at DESC LIMIT ? OFFSET ?",
    )
    .bind(user_id)
    .bind(page.limit)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM fare_calculations WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(pool)
        .await?;

    Ok((calculations, total))
}

// notifications

/// Sends the same notification to every recipient; returns how many were stored.
pub async fn insert_notifications(
    pool: &SqlitePool,
    recipients: &[String],
    notification: &NewNotification,
) -> Result<u64, sqlx::Error> {
    if recipients.is_empty() {
        return Ok(0);
    }
    let now = Utc::now();
    let mut qb = QueryBuilder::<Sqlite>::new(
        "INSERT INTO notifications (id, user_id, kind, title, message, incident_id, action_required, created_at) ",
    );
    qb.push_values(recipients, |mut row, user_id| {
        row.push_bind(new_id())
            .push_bind(user_id)
            .push_bind(notification.kind)
            .push_bind(&notification.title)
            .push_bind(&notification.message)
            .push_bind(&notification.incident_id)
            .push_bind(notification.action_required)
            .push_bind(now);
    });
    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

pub async fn list_notifications(
    pool: &SqlitePool,
    user_id: &str,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = ? AND (? = 0 OR is_read = 0)
        ORDER BY created_at DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_unread_notifications(pool: &SqlitePool, user_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0")
        .bind(user_id)
        .fetch_one(pool)
        .await
}

/// `None` when the notification does not exist or belongs to someone else.
pub async fn mark_notification_read(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications
        SET is_read = 1, read_at = COALESCE(read_at, ?)
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(Utc::now())
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub async fn mark_all_notifications_read(pool: &SqlitePool, user_id: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE notifications SET is_read = 1, read_at = ? WHERE user_id = ? AND is_read = 0",
    )
    .bind(Utc::now())
    .bind(user_id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

pub async fn ping(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
