//! Defines the data structures (structs) that map directly to database tables.
//!
//! Every status-like column is a TEXT holding the variant name, and the same
//! name is used on the wire, so one enum serves both `sqlx` and `serde`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type)]
        #[serde(rename_all = "SCREAMING_SNAKE_CASE")]
        #[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(format!("Invalid {}: {}", stringify!($name), other)),
                }
            }
        }
    };
}

text_enum!(UserType {
    Public => "PUBLIC",
    Enforcer => "ENFORCER",
    DataEncoder => "DATA_ENCODER",
    Admin => "ADMIN",
});

text_enum!(IncidentType {
    FareOvercharge => "FARE_OVERCHARGE",
    FareUndercharge => "FARE_UNDERCHARGE",
    RecklessDriving => "RECKLESS_DRIVING",
    VehicleViolation => "VEHICLE_VIOLATION",
    RouteViolation => "ROUTE_VIOLATION",
    Other => "OTHER",
});

text_enum!(
    /// Lifecycle of a reported incident.
    IncidentStatus {
        Pending => "PENDING",
        Investigating => "INVESTIGATING",
        Resolved => "RESOLVED",
        Dismissed => "DISMISSED",
    }
);

text_enum!(VehicleType {
    Tricycle => "TRICYCLE",
    HabalHabal => "HABAL_HABAL",
    Jeepney => "JEEPNEY",
    Multicab => "MULTICAB",
    Van => "VAN",
    Bus => "BUS",
});

text_enum!(PermitStatus {
    Active => "ACTIVE",
    Expired => "EXPIRED",
    Suspended => "SUSPENDED",
    Revoked => "REVOKED",
});

text_enum!(EvidenceStatus {
    PendingReview => "PENDING_REVIEW",
    Verified => "VERIFIED",
    Rejected => "REJECTED",
    RequiresAdditional => "REQUIRES_ADDITIONAL",
});

text_enum!(FileType {
    Image => "IMAGE",
    Video => "VIDEO",
    Audio => "AUDIO",
    Document => "DOCUMENT",
    Other => "OTHER",
});

text_enum!(DiscountType {
    SeniorCitizen => "SENIOR_CITIZEN",
    Pwd => "PWD",
    Student => "STUDENT",
});

text_enum!(
    /// Verification state of a discount card application.
    CardStatus {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
        Suspended => "SUSPENDED",
        Expired => "EXPIRED",
    }
);

text_enum!(LocationType {
    Barangay => "BARANGAY",
    Landmark => "LANDMARK",
});

text_enum!(ValidationStatus {
    Pending => "PENDING",
    Validated => "VALIDATED",
    Invalid => "INVALID",
    NeedsReview => "NEEDS_REVIEW",
});

impl UserType {
    /// Accounts that act on behalf of the municipality.
    pub fn is_official(&self) -> bool {
        !matches!(self, UserType::Public)
    }
}

impl IncidentStatus {
    /// The only place incident transitions are decided.
    pub fn can_transition_to(self, next: IncidentStatus) -> bool {
        use IncidentStatus::*;
        matches!(
            (self, next),
            (Pending, Investigating)
                | (Investigating, Resolved)
                | (Pending, Dismissed)
                | (Investigating, Dismissed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, IncidentStatus::Resolved | IncidentStatus::Dismissed)
    }

    pub fn is_open(self) -> bool {
        !self.is_terminal()
    }
}

impl FileType {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            FileType::Image
        } else if mime.starts_with("video/") {
            FileType::Video
        } else if mime.starts_with("audio/") {
            FileType::Audio
        } else if mime == "application/pdf"
            || mime.starts_with("text/")
            || mime.contains("document")
            || mime.contains("msword")
        {
            FileType::Document
        } else {
            FileType::Other
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub government_id: Option<String>,
    pub id_type: Option<String>,
    pub barangay_residence: Option<String>,
    pub reason_for_registration: Option<String>,
    pub user_type: UserType,
    pub is_active: bool,
    pub is_verified: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub verified_by: Option<String>,
    #[serde(skip_serializing)]
    pub failed_login_attempts: i64,
    #[serde(skip_serializing)]
    pub locked_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub reset_token: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expiry: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }
}

/// Fields needed to insert a user row.
/// The public face of an account in pickers and listings.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_type: UserType,
    pub is_active: bool,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub government_id: Option<String>,
    pub id_type: Option<String>,
    pub barangay_residence: Option<String>,
    pub reason_for_registration: Option<String>,
    pub user_type: UserType,
    pub is_active: bool,
    pub is_verified: bool,
    pub verified_by: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    pub id: String,
    pub incident_type: IncidentType,
    pub description: String,
    pub location: String,
    pub coordinates: Option<String>,
    pub plate_number: Option<String>,
    pub driver_license: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub incident_date: DateTime<Utc>,
    pub status: IncidentStatus,
    pub ticket_number: Option<String>,
    pub penalty_amount: Option<f64>,
    pub remarks: Option<String>,
    pub reported_by_id: String,
    pub handled_by_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIncident {
    pub incident_type: IncidentType,
    pub description: String,
    pub location: String,
    pub coordinates: Option<String>,
    pub plate_number: Option<String>,
    pub driver_license: Option<String>,
    pub vehicle_type: Option<VehicleType>,
    pub incident_date: DateTime<Utc>,
    pub status: IncidentStatus,
    pub ticket_number: Option<String>,
    pub penalty_amount: Option<f64>,
    pub remarks: Option<String>,
    pub reported_by_id: String,
    pub handled_by_id: Option<String>,
    pub vehicle_id: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Evidence {
    pub id: String,
    pub incident_id: String,
    pub file_name: String,
    pub file_url: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub mime_type: String,
    pub uploaded_by: String,
    pub status: EvidenceStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: String,
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
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Permit {
    pub id: String,
    pub plate_number: String,
    pub permit_plate_number: Option<String>,
    pub driver_full_name: String,
    pub vehicle_type: VehicleType,
    pub issued_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: PermitStatus,
    pub remarks: Option<String>,
    pub encoded_by: String,
    pub encoded_at: DateTime<Utc>,
    pub last_updated_by: Option<String>,
    pub last_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermitRenewal {
    pub id: String,
    pub permit_id: String,
    pub previous_expiry: DateTime<Utc>,
    pub new_expiry: DateTime<Utc>,
    pub renewed_by: String,
    pub renewed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountCard {
    pub id: String,
    pub user_id: String,
    pub discount_type: DiscountType,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub photo_url: Option<String>,
    pub id_number: Option<String>,
    pub id_type: Option<String>,
    pub issuing_authority: Option<String>,
    pub school_name: Option<String>,
    pub school_address: Option<String>,
    pub grade_level: Option<String>,
    pub school_id_expiry: Option<NaiveDate>,
    pub disability_type: Option<String>,
    pub pwd_id_expiry: Option<NaiveDate>,
    pub verification_status: CardStatus,
    pub verified_by: Option<String>,
    pub verified_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub is_admin_override: bool,
    pub override_reason: Option<String>,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub usage_count: i64,
    pub last_used_at: Option<DateTime<Utc>>,
    pub daily_usage_count: i64,
    pub last_daily_reset: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDiscountCard {
    pub user_id: String,
    pub discount_type: DiscountType,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub photo_url: Option<String>,
    pub id_number: Option<String>,
    pub id_type: Option<String>,
    pub issuing_authority: Option<String>,
    pub school_name: Option<String>,
    pub school_address: Option<String>,
    pub grade_level: Option<String>,
    pub school_id_expiry: Option<NaiveDate>,
    pub disability_type: Option<String>,
    pub pwd_id_expiry: Option<NaiveDate>,
    pub verification_status: CardStatus,
    pub verified_by: Option<String>,
    pub is_admin_override: bool,
    pub override_reason: Option<String>,
    pub is_active: bool,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FareCalculation {
    pub id: String,
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
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountUsageLog {
    pub id: String,
    pub discount_card_id: String,
    pub fare_calculation_id: Option<String>,
    pub original_fare: f64,
    pub discount_amount: f64,
    pub final_fare: f64,
    pub from_location: String,
    pub to_location: String,
    pub distance: f64,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub latitude: f64,
    pub longitude: f64,
    pub address: Option<String>,
    pub description: Option<String>,
    pub is_active: bool,
    pub validation_status: ValidationStatus,
    pub validated_at: Option<DateTime<Utc>>,
    pub validated_by: Option<String>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Location {
    pub fn coordinates(&self) -> fareguide_adapters::Coordinates {
        fareguide_adapters::Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUserCreation {
    pub id: String,
    pub created_by: String,
    pub created_user_id: String,
    pub user_type: UserType,
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserVerificationLog {
    pub id: String,
    pub user_id: String,
    pub action: String,
    pub performed_by: String,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

text_enum!(NotificationKind {
    Incident => "INCIDENT",
    Evidence => "EVIDENCE",
});

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub incident_id: Option<String>,
    pub action_required: bool,
    #[serde(rename = "read")]
    pub is_read: bool,
    pub read_at: Option<DateTime<Utc>>,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub incident_id: Option<String>,
    pub action_required: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn incident_lifecycle() {
        use IncidentStatus::*;
        assert!(Pending.can_transition_to(Investigating));
        assert!(Investigating.can_transition_to(Resolved));
        assert!(Pending.can_transition_to(Dismissed));
        assert!(Investigating.can_transition_to(Dismissed));

        assert!(!Pending.can_transition_to(Resolved));
        assert!(!Investigating.can_transition_to(Pending));
        for terminal in [Resolved, Dismissed] {
            assert!(terminal.is_terminal());
            for next in IncidentStatus::ALL {
                assert!(!terminal.can_transition_to(*next));
            }
        }
    }

    #[test]
    fn enum_text_matches_wire_name() {
        assert_eq!(
            serde_json::to_string(&VehicleType::HabalHabal).unwrap(),
            "\"HABAL_HABAL\""
        );
        assert_eq!("DATA_ENCODER".parse::<UserType>(), Ok(UserType::DataEncoder));
        assert!("janitor".parse::<UserType>().is_err());
    }

    #[test]
    fn file_type_from_mime() {
        assert_eq!(FileType::from_mime("image/jpeg"), FileType::Image);
        assert_eq!(FileType::from_mime("video/mp4"), FileType::Video);
        assert_eq!(FileType::from_mime("audio/mpeg"), FileType::Audio);
        assert_eq!(FileType::from_mime("application/pdf"), FileType::Document);
        assert_eq!(FileType::from_mime("application/zip"), FileType::Other);
    }
}
