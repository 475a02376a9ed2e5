use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rideshare_core::models::Vehicle;
use rideshare_core::{CandidateQuery, CoreResult, RideOffer, RidePreferences, RideStore};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{contains_pattern, storage_error};

pub struct PgRideStore {
    pool: PgPool,
}

impl PgRideStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RideRow {
    id: Uuid,
    driver_id: Uuid,
    pickup_location: String,
    drop_location: String,
    departure_time: DateTime<Utc>,
    available_seats: i32,
    vehicle: Option<Json<Vehicle>>,
    preferences: Json<RidePreferences>,
    requests: Vec<Uuid>,
    passengers: Vec<Uuid>,
    version: i64,
    created_at: DateTime<Utc>,
}

impl From<RideRow> for RideOffer {
    fn from(row: RideRow) -> Self {
        RideOffer {
            id: row.id,
            driver_id: row.driver_id,
            pickup_location: row.pickup_location,
            drop_location: row.drop_location,
            departure_time: row.departure_time,
            available_seats: row.available_seats,
            vehicle: row.vehicle.map(|v| v.0),
            preferences: row.preferences.0,
            requests: row.requests,
            passengers: row.passengers,
            version: row.version,
            created_at: row.created_at,
        }
    }
}

const RIDE_COLUMNS: &str = "id, driver_id, pickup_location, drop_location, departure_time, \
     available_seats, vehicle, preferences, requests, passengers, version, created_at";

#[async_trait]
impl RideStore for PgRideStore {
    async fn insert_ride(&self, ride: &RideOffer) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rides (id, driver_id, pickup_location, drop_location, departure_time,
                               available_seats, vehicle, preferences, requests, passengers, version, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(ride.id)
        .bind(ride.driver_id)
        .bind(&ride.pickup_location)
        .bind(&ride.drop_location)
        .bind(ride.departure_time)
        .bind(ride.available_seats)
        .bind(ride.vehicle.as_ref().map(Json))
        .bind(Json(&ride.preferences))
        .bind(&ride.requests)
        .bind(&ride.passengers)
        .bind(ride.version)
        .bind(ride.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(())
    }

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<RideOffer>> {
        let row = sqlx::query_as::<_, RideRow>(&format!("SELECT {} FROM rides WHERE id = $1", RIDE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        Ok(row.map(RideOffer::from))
    }

    async fn find_candidates(&self, query: &CandidateQuery) -> CoreResult<Vec<RideOffer>> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            r#"
            SELECT {}
            FROM rides
            WHERE pickup_location ILIKE $1
              AND drop_location ILIKE $2
              AND available_seats > 0
              AND departure_time >= $3
            ORDER BY departure_time ASC
            "#,
            RIDE_COLUMNS
        ))
        .bind(contains_pattern(&query.pickup))
        .bind(contains_pattern(&query.drop))
        .bind(query.min_departure)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(RideOffer::from).collect())
    }

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<RideOffer>> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {} FROM rides WHERE driver_id = $1 ORDER BY departure_time ASC",
            RIDE_COLUMNS
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(rows.into_iter().map(RideOffer::from).collect())
    }

    async fn update_ride(&self, ride: &RideOffer, expected_version: i64) -> CoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE rides
            SET available_seats = $3,
                requests = $4,
                passengers = $5,
                vehicle = $6,
                preferences = $7,
                version = version + 1,
                updated_at = NOW()
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(ride.id)
        .bind(expected_version)
        .bind(ride.available_seats)
        .bind(&ride.requests)
        .bind(&ride.passengers)
        .bind(ride.vehicle.as_ref().map(Json))
        .bind(Json(&ride.preferences))
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        Ok(result.rows_affected() == 1)
    }
}
