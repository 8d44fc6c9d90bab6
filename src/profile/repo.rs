use sqlx::PgPool;
use uuid::Uuid;

use super::repo_types::ProfileRow;
use super::targets::{Profile, Target};

impl ProfileRow {
    pub async fn find_by_user(
        db: &PgPool,
        user_id: Uuid,
    ) -> Result<Option<ProfileRow>, sqlx::Error> {
        sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT user_id, height_cm, weight_kg, age,
                   gender, activity_level, goal, preference,
                   target_calories, target_protein_g, target_carbohydrate_g, target_fat_g,
                   updated_at
            FROM profiles
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    /// Inserts or replaces the single profile row a user owns, refreshing the
    /// persisted targets at the same time.
    pub async fn upsert(
        db: &PgPool,
        user_id: Uuid,
        profile: &Profile,
        target: &Target,
    ) -> Result<ProfileRow, sqlx::Error> {
        sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles (
                user_id, height_cm, weight_kg, age,
                gender, activity_level, goal, preference,
                target_calories, target_protein_g, target_carbohydrate_g, target_fat_g,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, now())
            ON CONFLICT (user_id) DO UPDATE SET
                height_cm = EXCLUDED.height_cm,
                weight_kg = EXCLUDED.weight_kg,
                age = EXCLUDED.age,
                gender = EXCLUDED.gender,
                activity_level = EXCLUDED.activity_level,
                goal = EXCLUDED.goal,
                preference = EXCLUDED.preference,
                target_calories = EXCLUDED.target_calories,
                target_protein_g = EXCLUDED.target_protein_g,
                target_carbohydrate_g = EXCLUDED.target_carbohydrate_g,
                target_fat_g = EXCLUDED.target_fat_g,
                updated_at = now()
            RETURNING user_id, height_cm, weight_kg, age,
                      gender, activity_level, goal, preference,
                      target_calories, target_protein_g, target_carbohydrate_g, target_fat_g,
                      updated_at
            "#,
        )
        .bind(user_id)
        .bind(profile.height_cm)
        .bind(profile.weight_kg)
        .bind(profile.age)
        .bind(profile.gender.to_string())
        .bind(profile.activity_level.to_string())
        .bind(profile.goal.to_string())
        .bind(profile.preference.to_string())
        .bind(target.calories)
        .bind(target.protein_g)
        .bind(target.carbohydrate_g)
        .bind(target.fat_g)
        .fetch_one(db)
        .await
    }
}
