use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rideshare_core::models::{EmergencyContact, PrivacySettings};
use rideshare_core::{CoreError, CoreResult, Role, User, UserStore};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::storage_error;

pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: String,
    role: String,
    profile_picture: Option<String>,
    hide_full_name: bool,
    blur_profile_picture: bool,
    emergency_contacts: Json<Vec<EmergencyContact>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| CoreError::StorageError(format!("unknown role {} for user {}", row.role, row.id)))?;

        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            role,
            profile_picture: row.profile_picture,
            privacy: PrivacySettings {
                hide_full_name: row.hide_full_name,
                blur_profile_picture: row.blur_profile_picture,
            },
            emergency_contacts: row.emergency_contacts.0,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, phone, role, profile_picture, hide_full_name, \
     blur_profile_picture, emergency_contacts, created_at";

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, role, profile_picture, hide_full_name,
                               blur_profile_picture, emergency_contacts, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.profile_picture.as_deref())
        .bind(user.privacy.hide_full_name)
        .bind(user.privacy.blur_profile_picture)
        .bind(Json(&user.emergency_contacts))
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE lower(email) = lower($1)",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(User::try_from).transpose()
    }

    async fn update_user(&self, user: &User) -> CoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, phone = $4, profile_picture = $5,
                hide_full_name = $6, blur_profile_picture = $7, emergency_contacts = $8
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.phone)
        .bind(user.profile_picture.as_deref())
        .bind(user.privacy.hide_full_name)
        .bind(user.privacy.blur_profile_picture)
        .bind(Json(&user.emergency_contacts))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound(format!("user {}", user.id)));
        }
        Ok(())
    }
}
