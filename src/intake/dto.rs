use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::repo_types::DailyTotals;
use super::services::{Analysis, Provenance, DEFAULT_MEAL};
use crate::pending::PendingEntry;
use crate::profile::targets::Target;

/// The `current` half of an analysis bundle: the fresh triple with its derived
/// energy and provenance tag.
#[derive(Debug, Serialize)]
pub struct CurrentIntake {
    pub protein_g: i32,
    pub carbohydrate_g: i32,
    pub fat_g: i32,
    pub calories: i32,
    pub provenance: Provenance,
}

#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    pub current: CurrentIntake,
    pub prior: DailyTotals,
    pub target: Target,
    pub staged: bool,
}

impl From<Analysis> for AnalysisResponse {
    fn from(analysis: Analysis) -> Self {
        AnalysisResponse {
            current: CurrentIntake {
                protein_g: analysis.current.protein_g,
                carbohydrate_g: analysis.current.carbohydrate_g,
                fat_g: analysis.current.fat_g,
                calories: analysis.current.calories(),
                provenance: analysis.provenance,
            },
            prior: analysis.prior,
            target: analysis.target,
            staged: analysis.staged,
        }
    }
}

/// The staged entry a confirm would commit, with its derived energy.
#[derive(Debug, Serialize)]
pub struct PendingResponse {
    pub protein_g: i32,
    pub carbohydrate_g: i32,
    pub fat_g: i32,
    pub calories: i32,
    pub has_image: bool,
}

impl From<PendingEntry> for PendingResponse {
    fn from(entry: PendingEntry) -> Self {
        PendingResponse {
            protein_g: entry.macros.protein_g,
            carbohydrate_g: entry.macros.carbohydrate_g,
            fat_g: entry.macros.fat_g,
            calories: entry.macros.calories(),
            has_image: entry.image.is_some(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub meal: Option<String>,
}

impl ConfirmRequest {
    /// Label to store; blank or absent input falls back to the default meal.
    pub fn meal(&self) -> &str {
        match self.meal.as_deref().map(str::trim) {
            Some(meal) if !meal.is_empty() => meal,
            _ => DEFAULT_MEAL,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TotalsQuery {
    pub time_zone: String,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub date: Option<NaiveDate>,
    pub time_zone: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nutrition::Macros;

    #[test]
    fn analysis_response_derives_calories() {
        let analysis = Analysis {
            current: Macros::new(25, 45, 15),
            provenance: Provenance::Estimated,
            prior: DailyTotals {
                calories: 600,
                protein_g: 40,
                carbohydrate_g: 70,
                fat_g: 20,
            },
            target: Target {
                calories: 2778,
                protein_g: 208,
                carbohydrate_g: 208,
                fat_g: 123,
            },
            staged: true,
        };
        let response = AnalysisResponse::from(analysis);
        assert_eq!(response.current.calories, 415);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["current"]["provenance"], "estimated");
        assert_eq!(json["staged"], true);
        assert_eq!(json["prior"]["calories"], 600);
        assert_eq!(json["target"]["calories"], 2778);
    }

    #[test]
    fn pending_response_reports_image_presence() {
        let staged = PendingResponse::from(PendingEntry {
            macros: Macros::new(25, 45, 15),
            image: Some(bytes::Bytes::from_static(b"jpeg")),
        });
        assert_eq!(staged.calories, 415);
        assert!(staged.has_image);

        let bare = PendingResponse::from(PendingEntry {
            macros: Macros::new(10, 0, 0),
            image: None,
        });
        assert!(!bare.has_image);
    }

    #[test]
    fn confirm_meal_defaults_to_lunch() {
        let explicit = ConfirmRequest {
            meal: Some("breakfast".into()),
        };
        assert_eq!(explicit.meal(), "breakfast");

        let blank = ConfirmRequest {
            meal: Some("   ".into()),
        };
        assert_eq!(blank.meal(), "lunch");

        let absent = ConfirmRequest { meal: None };
        assert_eq!(absent.meal(), "lunch");
    }
}
