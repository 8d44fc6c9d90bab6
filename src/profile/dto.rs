use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::repo_types::ProfileRow;
use super::targets::{ActivityLevel, Gender, Goal, Preference, Profile, Target};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct ProfileRequest {
    pub height_cm: i32,
    pub weight_kg: i32,
    pub age: i32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub preference: Preference,
}

impl ProfileRequest {
    pub fn into_profile(self) -> Profile {
        Profile {
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
            age: self.age,
            gender: self.gender,
            activity_level: self.activity_level,
            goal: self.goal,
            preference: self.preference,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub height_cm: i32,
    pub weight_kg: i32,
    pub age: i32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub preference: Preference,
    pub target: Target,
    pub updated_at: DateTime<Utc>,
}

impl ProfileResponse {
    pub fn from_row(row: &ProfileRow) -> Result<ProfileResponse, AppError> {
        let profile = row.profile()?;
        Ok(ProfileResponse {
            height_cm: profile.height_cm,
            weight_kg: profile.weight_kg,
            age: profile.age,
            gender: profile.gender,
            activity_level: profile.activity_level,
            goal: profile.goal,
            preference: profile.preference,
            target: row.target(),
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_deserializes_wire_labels() {
        let payload = r#"{
            "height_cm": 180,
            "weight_kg": 75,
            "age": 29,
            "gender": "Male",
            "activity_level": "Moderately Active",
            "goal": "Gain Muscle",
            "preference": "High Protein"
        }"#;
        let request: ProfileRequest = serde_json::from_str(payload).unwrap();
        let profile = request.into_profile();
        assert_eq!(profile.gender, Gender::Male);
        assert_eq!(profile.activity_level, ActivityLevel::ModeratelyActive);
    }

    #[test]
    fn request_rejects_unknown_labels() {
        let payload = r#"{
            "height_cm": 180,
            "weight_kg": 75,
            "age": 29,
            "gender": "Male",
            "activity_level": "Heroically Active",
            "goal": "Gain Muscle",
            "preference": "High Protein"
        }"#;
        assert!(serde_json::from_str::<ProfileRequest>(payload).is_err());
    }
}
