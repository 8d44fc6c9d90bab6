use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::{DailyTotals, DietRecord, NewDietRecord};

impl DietRecord {
    pub async fn insert(db: &PgPool, new: &NewDietRecord<'_>) -> Result<DietRecord, sqlx::Error> {
        sqlx::query_as::<_, DietRecord>(
            r#"
            INSERT INTO diet_history (user_id, meal, calories, protein_g, carbohydrate_g, fat_g, image_url, eaten_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, meal, calories, protein_g, carbohydrate_g, fat_g, image_url, eaten_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.meal)
        .bind(new.macros.calories())
        .bind(new.macros.protein_g)
        .bind(new.macros.carbohydrate_g)
        .bind(new.macros.fat_g)
        .bind(new.image_url)
        .bind(new.eaten_at)
        .fetch_one(db)
        .await
    }

    pub async fn find_by_id(
        db: &PgPool,
        user_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DietRecord>, sqlx::Error> {
        sqlx::query_as::<_, DietRecord>(
            r#"
            SELECT id, user_id, meal, calories, protein_g, carbohydrate_g, fat_g, image_url, eaten_at
            FROM diet_history
            WHERE user_id = $1 AND id = $2
            "#,
        )
        .bind(user_id)
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn list_recent(
        db: &PgPool,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<DietRecord>, sqlx::Error> {
        sqlx::query_as::<_, DietRecord>(
            r#"
            SELECT id, user_id, meal, calories, protein_g, carbohydrate_g, fat_g, image_url, eaten_at
            FROM diet_history
            WHERE user_id = $1
            ORDER BY eaten_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Records inside a closed window, newest first. Both bounds count.
    pub async fn list_between_inclusive(
        db: &PgPool,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<DietRecord>, sqlx::Error> {
        sqlx::query_as::<_, DietRecord>(
            r#"
            SELECT id, user_id, meal, calories, protein_g, carbohydrate_g, fat_g, image_url, eaten_at
            FROM diet_history
            WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at <= $3
            ORDER BY eaten_at DESC
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_all(db)
        .await
    }
}

impl DailyTotals {
    /// Sums over the half-open window `[start, end)`.
    pub async fn for_window(
        db: &PgPool,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DailyTotals, sqlx::Error> {
        sqlx::query_as::<_, DailyTotals>(
            r#"
            SELECT COALESCE(SUM(calories), 0) AS calories,
                   COALESCE(SUM(protein_g), 0) AS protein_g,
                   COALESCE(SUM(carbohydrate_g), 0) AS carbohydrate_g,
                   COALESCE(SUM(fat_g), 0) AS fat_g
            FROM diet_history
            WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at < $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(db)
        .await
    }

    /// Sums over the closed window `[start, end]`.
    pub async fn for_window_inclusive(
        db: &PgPool,
        user_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<DailyTotals, sqlx::Error> {
        sqlx::query_as::<_, DailyTotals>(
            r#"
            SELECT COALESCE(SUM(calories), 0) AS calories,
                   COALESCE(SUM(protein_g), 0) AS protein_g,
                   COALESCE(SUM(carbohydrate_g), 0) AS carbohydrate_g,
                   COALESCE(SUM(fat_g), 0) AS fat_g
            FROM diet_history
            WHERE user_id = $1 AND eaten_at >= $2 AND eaten_at <= $3
            "#,
        )
        .bind(user_id)
        .bind(start)
        .bind(end)
        .fetch_one(db)
        .await
    }
}
