use rideshare_core::models::PrivacySettings;
use rideshare_core::{CoreError, Role, User};
use rideshare_shared::pii::{abbreviate_name, mask_phone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Picture shown in place of the real one when blurring is enabled.
pub const BLURRED_PICTURE: &str = "blurred.jpg";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Option<Role>,
    pub profile_picture: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
}

/// A user as presented to API callers, with privacy settings applied.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProfileView {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub role: Role,
    pub profile_picture: Option<String>,
    pub privacy: PrivacySettings,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        let name = if user.privacy.hide_full_name {
            abbreviate_name(&user.name)
        } else {
            user.name.clone()
        };
        let profile_picture = if user.privacy.blur_profile_picture {
            Some(BLURRED_PICTURE.to_string())
        } else {
            user.profile_picture.clone()
        };

        Self {
            id: user.id,
            name,
            email: user.email.clone(),
            phone: mask_phone(&user.phone),
            role: user.role,
            profile_picture,
            privacy: user.privacy.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub long: f64,
}

/// Outcome of one live-location SMS.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeliveryReport {
    pub contact_name: String,
    pub phone: String,
    pub delivered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CallReport {
    pub target_id: Uuid,
    pub call_id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Notification provider failed: {0}")]
    Dependency(String),

    #[error("Storage failure: {0}")]
    Storage(String),
}

impl From<CoreError> for AccountError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ValidationError(msg) => AccountError::Validation(msg),
            CoreError::NotFound(msg) => AccountError::NotFound(msg),
            CoreError::Conflict(msg) => AccountError::Conflict(msg),
            CoreError::DependencyError(msg) => AccountError::Dependency(msg),
            CoreError::StorageError(msg) => AccountError::Storage(msg),
        }
    }
}
