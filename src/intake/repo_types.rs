use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::nutrition::Macros;

/// A confirmed intake entry as stored in `diet_history`.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DietRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal: String,
    pub calories: i32,
    pub protein_g: i32,
    pub carbohydrate_g: i32,
    pub fat_g: i32,
    pub image_url: Option<String>,
    pub eaten_at: DateTime<Utc>,
}

/// Fields for a record that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewDietRecord<'a> {
    pub user_id: Uuid,
    pub meal: &'a str,
    pub macros: Macros,
    pub image_url: Option<&'a str>,
    pub eaten_at: DateTime<Utc>,
}

/// Macro sums over a day window. Postgres SUM widens to BIGINT, and an empty
/// window coalesces to all zeros rather than NULLs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize)]
pub struct DailyTotals {
    pub calories: i64,
    pub protein_g: i64,
    pub carbohydrate_g: i64,
    pub fat_g: i64,
}
