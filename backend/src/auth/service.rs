//! Core business logic for the authentication system.
//!
//! Password hashing, session tokens, registration rules, the login lockout
//! and password reset tokens. Handlers stay thin and call into here.

use std::sync::LazyLock;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use sqlx::SqlitePool;
use tracing::{info, warn};

use super::{
    errors::AuthError,
    models::{Claims, RegisterRequest},
};
use crate::{
    database::{
        models::{NewUser, User, UserType},
        queries,
    },
    errors::ApiError,
    services::discount::parse_date,
};

pub const MAX_FAILED_ATTEMPTS: i64 = 5;
pub const LOCKOUT_MINUTES: i64 = 15;
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const AUTO_APPROVED: &str = "AUTO_APPROVED";
const TEMPORARY_PASSWORD_LEN: usize = 12;

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(09|\+639)\d{9}$").expect("phone pattern compiles"));
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Philippine mobile number with whitespace removed, if it is one.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let compact: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    PHONE_RE.is_match(&compact).then_some(compact)
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

pub fn is_strong_enough(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

pub async fn hash_password(password: &str, cost: u32) -> Result<String, AuthError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|err| AuthError::Hashing(err.to_string()))?
        .map_err(AuthError::from)
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let (password, hash) = (password.to_owned(), hash.to_owned());
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|err| AuthError::Hashing(err.to_string()))?
        .map_err(AuthError::from)
}

pub fn issue_token(
    user: &User,
    secret: &str,
    ttl_hours: i64,
    now: DateTime<Utc>,
) -> Result<String, AuthError> {
    let claims = Claims {
        user_id: user.id.clone(),
        username: user.username.clone(),
        user_type: user.user_type,
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AuthError::InvalidToken)
}

/// 32 random bytes, hex encoded.
pub fn generate_reset_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

pub fn generate_temporary_password() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(TEMPORARY_PASSWORD_LEN)
        .map(char::from)
        .collect()
}

/// Counter and lock to store after one more failed login. An expired lock
/// starts the count again.
pub fn failed_attempt(user: &User, now: DateTime<Utc>) -> (i64, Option<DateTime<Utc>>) {
    let previous = match user.locked_until {
        Some(until) if until <= now => 0,
        _ => user.failed_login_attempts,
    };
    let attempts = previous + 1;
    let locked_until =
        (attempts >= MAX_FAILED_ATTEMPTS).then(|| now + Duration::minutes(LOCKOUT_MINUTES));
    (attempts, locked_until)
}

fn minutes_left(until: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    ((until - now).num_seconds() + 59).div_euclid(60).max(1)
}

pub async fn authenticate(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    now: DateTime<Utc>,
) -> Result<User, AuthError> {
    let user = queries::find_user_by_username(pool, username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if let Some(until) = user.locked_until.filter(|until| *until > now) {
        return Err(AuthError::AccountLocked {
            minutes: minutes_left(until, now),
        });
    }

    if !verify_password(password, &user.password_hash).await? {
        let (attempts, locked_until) = failed_attempt(&user, now);
        queries::record_failed_login(pool, &user.id, attempts, locked_until).await?;
        if let Some(until) = locked_until {
            warn!(username, "account locked after {attempts} failed logins");
            return Err(AuthError::AccountLocked {
                minutes: minutes_left(until, now),
            });
        }
        return Err(AuthError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AuthError::AccountInactive);
    }

    queries::clear_login_failures(pool, &user.id).await?;
    Ok(user)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub government_id: String,
    pub id_type: String,
    pub barangay_residence: String,
    pub reason_for_registration: Option<String>,
    pub user_type: UserType,
}

pub fn validate_registration(req: &RegisterRequest) -> Result<ValidRegistration, ApiError> {
    let (Some(username), Some(password), Some(first_name), Some(last_name), Some(phone)) = (
        non_blank(&req.username),
        req.password.as_deref().filter(|p| !p.is_empty()),
        non_blank(&req.first_name),
        non_blank(&req.last_name),
        non_blank(&req.phone_number),
    ) else {
        return Err(ApiError::bad_request("All required fields must be provided"));
    };

    let id_type = non_blank(&req.id_type)
        .ok_or_else(|| ApiError::bad_request("Government ID Type is required"))?;
    let government_id = non_blank(&req.government_id)
        .ok_or_else(|| ApiError::bad_request("Government ID Number is required"))?;
    let barangay = non_blank(&req.barangay_residence)
        .ok_or_else(|| ApiError::bad_request("Barangay of Residence is required"))?;

    let phone_number = normalize_phone(phone)
        .ok_or_else(|| ApiError::bad_request("Please enter a valid Philippine mobile number"))?;

    if !is_strong_enough(password) {
        return Err(ApiError::bad_request(
            "Password must be at least 8 characters long",
        ));
    }

    let user_type = match non_blank(&req.user_type).unwrap_or("PUBLIC").parse::<UserType>() {
        Ok(UserType::Admin) | Err(_) => return Err(ApiError::bad_request("Invalid user type")),
        Ok(user_type) => user_type,
    };

    let email = match non_blank(&req.email) {
        Some(email) if !is_valid_email(email) => {
            return Err(ApiError::bad_request("Please enter a valid email address"))
        }
        other => other.map(str::to_lowercase),
    };

    let date_of_birth = match non_blank(&req.date_of_birth) {
        Some(raw) => Some(
            parse_date(raw).ok_or_else(|| ApiError::bad_request("Invalid date of birth"))?,
        ),
        None => None,
    };

    Ok(ValidRegistration {
        username: username.to_string(),
        password: password.to_string(),
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        phone_number,
        email,
        date_of_birth,
        government_id: government_id.to_string(),
        id_type: id_type.to_string(),
        barangay_residence: barangay.to_string(),
        reason_for_registration: non_blank(&req.reason_for_registration).map(String::from),
        user_type,
    })
}

/// Public accounts are usable at once; official ones wait for an admin.
pub async fn register(
    pool: &SqlitePool,
    bcrypt_cost: u32,
    reg: ValidRegistration,
) -> Result<User, ApiError> {
    if queries::find_user_by_username(pool, &reg.username).await?.is_some() {
        return Err(ApiError::conflict("Username already taken"));
    }
    if let Some(email) = &reg.email {
        if queries::find_user_by_email(pool, email).await?.is_some() {
            return Err(ApiError::conflict("Email is already registered"));
        }
    }

    let auto_approved = reg.user_type == UserType::Public;
    let password_hash = hash_password(&reg.password, bcrypt_cost).await?;

    let user = queries::insert_user(
        pool,
        &NewUser {
            username: reg.username,
            password_hash,
            first_name: reg.first_name,
            last_name: reg.last_name,
            phone_number: reg.phone_number,
            email: reg.email,
            date_of_birth: reg.date_of_birth,
            government_id: Some(reg.government_id),
            id_type: Some(reg.id_type),
            barangay_residence: Some(reg.barangay_residence),
            reason_for_registration: reg.reason_for_registration,
            user_type: reg.user_type,
            is_active: auto_approved,
            is_verified: auto_approved,
            verified_by: auto_approved.then(|| AUTO_APPROVED.to_string()),
        },
    )
    .await?;

    info!(username = %user.username, user_type = %user.user_type, "user registered");
    Ok(user)
}

/// Stores a fresh reset token when the username exists.
pub async fn request_reset(
    pool: &SqlitePool,
    username: &str,
    now: DateTime<Utc>,
) -> Result<Option<String>, AuthError> {
    let Some(user) = queries::find_user_by_username(pool, username).await? else {
        return Ok(None);
    };
    let token = generate_reset_token();
    queries::set_reset_token(pool, &user.id, &token, now + Duration::hours(RESET_TOKEN_TTL_HOURS))
        .await?;
    info!(username, "password reset token issued");
    Ok(Some(token))
}

pub async fn find_reset_owner(
    pool: &SqlitePool,
    token: &str,
    now: DateTime<Utc>,
) -> Result<User, AuthError> {
    queries::find_user_by_reset_token(pool, token, now)
        .await?
        .ok_or(AuthError::InvalidResetToken)
}

pub async fn reset_password(
    pool: &SqlitePool,
    bcrypt_cost: u32,
    token: &str,
    new_password: &str,
    now: DateTime<Utc>,
) -> Result<User, AuthError> {
    let user = find_reset_owner(pool, token, now).await?;
    let hash = hash_password(new_password, bcrypt_cost).await?;
    queries::set_password(pool, &user.id, &hash).await?;
    info!(username = %user.username, "password reset");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(attempts: i64, locked_until: Option<DateTime<Utc>>) -> User {
        let now = Utc::now();
        User {
            id: "u1".into(),
            username: "juan".into(),
            password_hash: String::new(),
            first_name: "Juan".into(),
            last_name: "Dela Cruz".into(),
            phone_number: "09171234567".into(),
            email: None,
            date_of_birth: None,
            government_id: None,
            id_type: None,
            barangay_residence: None,
            reason_for_registration: None,
            user_type: UserType::Public,
            is_active: true,
            is_verified: true,
            verified_at: None,
            verified_by: None,
            failed_login_attempts: attempts,
            locked_until,
            reset_token: None,
            reset_token_expiry: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn registration() -> RegisterRequest {
        RegisterRequest {
            username: Some("juan".into()),
            password: Some("s3cretpass".into()),
            first_name: Some("Juan".into()),
            last_name: Some("Dela Cruz".into()),
            phone_number: Some("0917 123 4567".into()),
            government_id: Some("N01-23-456789".into()),
            id_type: Some("Driver's License".into()),
            barangay_residence: Some("Poblacion".into()),
            ..Default::default()
        }
    }

    #[test]
    fn phone_numbers() {
        assert_eq!(normalize_phone("0917 123 4567").as_deref(), Some("09171234567"));
        assert_eq!(normalize_phone("+639171234567").as_deref(), Some("+639171234567"));
        assert!(normalize_phone("0817 123 4567").is_none());
        assert!(normalize_phone("0917123456").is_none());
    }

    #[test]
    fn token_roundtrip_and_tamper() {
        let now = Utc::now();
        let token = issue_token(&user(0, None), "a-long-enough-secret", 1, now).unwrap();
        let claims = decode_token(&token, "a-long-enough-secret").unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.user_type, UserType::Public);
        assert!(decode_token(&token, "another-secret-value").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let issued = Utc::now() - Duration::hours(3);
        let token = issue_token(&user(0, None), "a-long-enough-secret", 1, issued).unwrap();
        assert!(matches!(
            decode_token(&token, "a-long-enough-secret"),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn reset_tokens_are_hex() {
        let token = generate_reset_token();
        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(token, generate_reset_token());
        assert_eq!(generate_temporary_password().len(), 12);
    }

    #[test]
    fn fifth_failure_locks() {
        let now = Utc::now();
        assert_eq!(failed_attempt(&user(3, None), now), (4, None));
        let (attempts, locked) = failed_attempt(&user(4, None), now);
        assert_eq!(attempts, 5);
        assert_eq!(locked, Some(now + Duration::minutes(LOCKOUT_MINUTES)));
    }

    #[test]
    fn expired_lock_restarts_count() {
        let now = Utc::now();
        let stale = user(5, Some(now - Duration::minutes(1)));
        assert_eq!(failed_attempt(&stale, now), (1, None));
    }

    #[test]
    fn registration_rules() {
        let valid = validate_registration(&registration()).unwrap();
        assert_eq!(valid.phone_number, "09171234567");
        assert_eq!(valid.user_type, UserType::Public);

        let admin = RegisterRequest {
            user_type: Some("ADMIN".into()),
            ..registration()
        };
        assert_eq!(
            validate_registration(&admin).unwrap_err().to_string(),
            "Invalid user type"
        );

        let short = RegisterRequest {
            password: Some("short".into()),
            ..registration()
        };
        assert!(validate_registration(&short)
            .unwrap_err()
            .to_string()
            .contains("at least 8"));

        let no_barangay = RegisterRequest {
            barangay_residence: Some("  ".into()),
            ..registration()
        };
        assert_eq!(
            validate_registration(&no_barangay).unwrap_err().to_string(),
            "Barangay of Residence is required"
        );
    }

    #[tokio::test]
    async fn hashing_roundtrip() {
        let hash = hash_password("s3cretpass", 4).await.unwrap();
        assert!(verify_password("s3cretpass", &hash).await.unwrap());
        assert!(!verify_password("wrong-pass", &hash).await.unwrap());
    }
}
