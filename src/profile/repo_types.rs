use chrono::{DateTime, Utc};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use super::targets::{ActivityLevel, Profile, Target};
use crate::error::AppError;

/// Raw `profiles` row. Enum columns are stored as TEXT and parsed on the
/// way out.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub height_cm: i32,
    pub weight_kg: i32,
    pub age: i32,
    pub gender: String,
    pub activity_level: String,
    pub goal: String,
    pub preference: String,
    pub target_calories: i32,
    pub target_protein_g: i32,
    pub target_carbohydrate_g: i32,
    pub target_fat_g: i32,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    /// Reconstructs the typed profile. Gender, goal and preference must match
    /// a known label; an unknown activity tier falls back to sedentary.
    pub fn profile(&self) -> Result<Profile, AppError> {
        Ok(Profile {
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            age: self.age,
            gender: self.gender.parse()?,
            activity_level: ActivityLevel::parse_lenient(&self.activity_level),
            goal: self.goal.parse()?,
            preference: self.preference.parse()?,
        })
    }

    /// Targets as persisted when the profile was last saved.
    pub fn target(&self) -> Target {
        Target {
            calories: self.target_calories,
            protein_g: self.target_protein_g,
            carbohydrate_g: self.target_carbohydrate_g,
            fat_g: self.target_fat_g,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::targets::{Gender, Goal, Preference};
    use super::*;

    fn sample_row() -> ProfileRow {
        ProfileRow {
            user_id: Uuid::new_v4(),
            height_cm: 180,
            weight_kg: 75,
            age: 29,
            gender: "Male".into(),
            activity_level: "Moderately Active".into(),
            goal: "Gain Muscle".into(),
            preference: "High Protein".into(),
            target_calories: 2778,
            target_protein_g: 208,
            target_carbohydrate_g: 208,
            target_fat_g: 123,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn row_parses_into_typed_profile() {
        let profile = sample_row().profile().expect("well formed row");
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.activity_level, ActivityLevel::ModeratelyActive);
        assert_eq!(profile.goal, Goal::GainMuscle);
        assert_eq!(profile.preference, Preference::HighProtein);
    }

    #[test]
    fn unknown_gender_in_row_is_an_error() {
        let mut row = sample_row();
        row.gender = "Robot".into();
        assert!(matches!(
            row.profile().unwrap_err(),
            AppError::InvalidProfile(_)
        ));
    }

    #[test]
    fn unknown_activity_in_row_degrades() {
        let mut row = sample_row();
        row.activity_level = "Extremely Active".into();
        let profile = row.profile().expect("lenient tier");
        assert_eq!(profile.activity_level, ActivityLevel::Sedentary);
    }
}
