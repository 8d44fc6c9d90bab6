use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::nutrition::{KCAL_PER_G_CARB, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel {
    Sedentary,
    #[serde(rename = "Lightly Active")]
    LightlyActive,
    #[serde(rename = "Moderately Active")]
    ModeratelyActive,
    #[serde(rename = "Very Active")]
    VeryActive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    #[serde(rename = "Gain Muscle")]
    GainMuscle,
    #[serde(rename = "Lose Weight")]
    LoseWeight,
    Maintain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preference {
    #[serde(rename = "High Protein")]
    HighProtein,
    #[serde(rename = "Low Carb")]
    LowCarb,
    Balanced,
}

/// A user's biometric and preference snapshot, the input to target calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Profile {
    pub height_cm: i32,
    pub weight_kg: i32,
    pub age: i32,
    pub gender: Gender,
    pub activity_level: ActivityLevel,
    pub goal: Goal,
    pub preference: Preference,
}

/// Daily energy and macro budget. Each field is rounded independently from the
/// unrounded daily energy, so the gram values do not reproduce `calories`
/// exactly when converted back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub calories: i32,
    pub protein_g: i32,
    pub carbohydrate_g: i32,
    pub fat_g: i32,
}

impl Gender {
    fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Gender::Male),
            "Female" => Ok(Gender::Female),
            other => Err(AppError::InvalidProfile(format!("unknown gender: {other}"))),
        }
    }
}

impl ActivityLevel {
    /// Multiplier applied to the basal rate to approximate daily expenditure.
    pub fn multiplier(&self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::LightlyActive => 1.375,
            ActivityLevel::ModeratelyActive => 1.55,
            ActivityLevel::VeryActive => 1.725,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ActivityLevel::Sedentary => "Sedentary",
            ActivityLevel::LightlyActive => "Lightly Active",
            ActivityLevel::ModeratelyActive => "Moderately Active",
            ActivityLevel::VeryActive => "Very Active",
        }
    }

    /// Parses a stored tier, degrading unknown values to the sedentary
    /// multiplier instead of failing.
    pub fn parse_lenient(s: &str) -> ActivityLevel {
        match s {
            "Lightly Active" => ActivityLevel::LightlyActive,
            "Moderately Active" => ActivityLevel::ModeratelyActive,
            "Very Active" => ActivityLevel::VeryActive,
            _ => ActivityLevel::Sedentary,
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Goal {
    fn as_str(&self) -> &'static str {
        match self {
            Goal::GainMuscle => "Gain Muscle",
            Goal::LoseWeight => "Lose Weight",
            Goal::Maintain => "Maintain",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Goal {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Gain Muscle" => Ok(Goal::GainMuscle),
            "Lose Weight" => Ok(Goal::LoseWeight),
            "Maintain" => Ok(Goal::Maintain),
            other => Err(AppError::InvalidProfile(format!("unknown goal: {other}"))),
        }
    }
}

impl Preference {
    fn as_str(&self) -> &'static str {
        match self {
            Preference::HighProtein => "High Protein",
            Preference::LowCarb => "Low Carb",
            Preference::Balanced => "Balanced",
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preference {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "High Protein" => Ok(Preference::HighProtein),
            "Low Carb" => Ok(Preference::LowCarb),
            "Balanced" => Ok(Preference::Balanced),
            other => Err(AppError::InvalidProfile(format!(
                "unknown preference: {other}"
            ))),
        }
    }
}

struct MacroSplit {
    protein: f64,
    carb: f64,
    fat: f64,
}

/// Fraction of daily energy budgeted to each macro, keyed on goal and
/// preference. The fractions are independent budgets and do not always sum
/// to 1.0.
fn macro_split(goal: Goal, preference: Preference) -> MacroSplit {
    use Preference::*;

    match goal {
        Goal::GainMuscle => MacroSplit {
            protein: if preference == HighProtein { 0.30 } else { 0.25 },
            carb: if preference == Balanced { 0.40 } else { 0.30 },
            fat: if preference == Balanced { 0.30 } else { 0.40 },
        },
        Goal::LoseWeight => MacroSplit {
            protein: if preference == HighProtein { 0.25 } else { 0.20 },
            carb: if preference == LowCarb { 0.35 } else { 0.45 },
            fat: if preference == LowCarb { 0.40 } else { 0.35 },
        },
        Goal::Maintain => MacroSplit {
            protein: 0.25,
            carb: if preference == Balanced { 0.50 } else { 0.45 },
            fat: if preference == Balanced { 0.25 } else { 0.30 },
        },
    }
}

/// Revised Harris-Benedict basal metabolic rate.
fn basal_metabolic_rate(profile: &Profile) -> f64 {
    let weight = f64::from(profile.weight_kg);
    let height = f64::from(profile.height_cm);
    let age = f64::from(profile.age);
    match profile.gender {
        Gender::Male => 88.362 + 13.397 * weight + 4.799 * height - 5.677 * age,
        Gender::Female => 447.593 + 9.247 * weight + 3.098 * height - 4.330 * age,
    }
}

/// Computes the daily calorie and macro targets for a profile.
///
/// Pure and deterministic. Gram budgets come from the unrounded daily energy,
/// each rounded on its own; `calories` is the rounded energy itself.
pub fn compute_target(profile: &Profile) -> Result<Target, AppError> {
    if profile.height_cm <= 0 || profile.weight_kg <= 0 || profile.age <= 0 {
        return Err(AppError::InvalidProfile(
            "height, weight and age must be positive".into(),
        ));
    }

    let tdee = basal_metabolic_rate(profile) * profile.activity_level.multiplier();
    let split = macro_split(profile.goal, profile.preference);

    Ok(Target {
        calories: tdee.round() as i32,
        protein_g: (split.protein * tdee / f64::from(KCAL_PER_G_PROTEIN)).round() as i32,
        carbohydrate_g: (split.carb * tdee / f64::from(KCAL_PER_G_CARB)).round() as i32,
        fat_g: (split.fat * tdee / f64::from(KCAL_PER_G_FAT)).round() as i32,
    })
}
