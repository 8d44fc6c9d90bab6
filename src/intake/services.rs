use bytes::Bytes;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use super::repo_types::{DailyTotals, DietRecord, NewDietRecord};
use super::window::{date_window, parse_time_zone, today_window};
use crate::error::AppError;
use crate::estimator::retry::{estimate_with_retry, EstimateOutcome, RetryPolicy};
use crate::nutrition::Macros;
use crate::pending::PendingEntry;
use crate::profile::repo_types::ProfileRow;
use crate::profile::targets::Target;
use crate::state::AppState;

pub const DEFAULT_MEAL: &str = "lunch";

/// Pending images arrive through multipart uploads without a reliable content
/// type, so stored objects are tagged as JPEG across the board.
const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// Only this many leading bytes feed the key digest. Two images sharing their
/// first kilobyte get the same suffix, which the UUID half keeps collision-free.
const IMAGE_HASH_PREFIX_LEN: usize = 1024;

#[derive(Debug)]
pub enum AnalysisInput {
    Image(Bytes),
    Manual(Macros),
}

/// Where the macros in an analysis came from. `Unavailable` marks a failed or
/// degenerate estimation whose zeros are not nutrition data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Estimated,
    Manual,
    Unavailable,
}

/// Result of one `analyze` call: the fresh triple, today's totals so far, the
/// stored target, and whether the triple was staged for later confirmation.
#[derive(Debug)]
pub struct Analysis {
    pub current: Macros,
    pub provenance: Provenance,
    pub prior: DailyTotals,
    pub target: Target,
    pub staged: bool,
}

/// Storage key for an intake image: a fresh UUID joined with the first 8 hex
/// chars of the SHA-256 of the image's leading bytes.
pub fn image_key(image: &[u8]) -> String {
    let prefix_len = image.len().min(IMAGE_HASH_PREFIX_LEN);
    let digest = hex::encode(Sha256::digest(&image[..prefix_len]));
    format!("intake/{}_{}", Uuid::new_v4(), &digest[..8])
}

fn estimate_parts(user_id: Uuid, outcome: EstimateOutcome) -> (Macros, Provenance) {
    let macros = outcome.macros();
    let provenance = match &outcome {
        EstimateOutcome::Estimated(_) => Provenance::Estimated,
        EstimateOutcome::AllZero => {
            warn!(user_id = %user_id, "estimation produced only zeros");
            Provenance::Unavailable
        }
        EstimateOutcome::Failed(e) => {
            warn!(user_id = %user_id, error = %e, "estimation failed");
            Provenance::Unavailable
        }
    };
    (macros, provenance)
}

/// Analyzes one prospective intake without writing history.
///
/// Image input runs the estimator with retries; manual input passes the
/// caller's macros through. With `stage` set, a usable triple is parked in the
/// pending cache so a later confirm can commit it.
pub async fn analyze(
    state: &AppState,
    user_id: Uuid,
    time_zone: &str,
    input: AnalysisInput,
    stage: bool,
) -> Result<Analysis, AppError> {
    let tz = parse_time_zone(time_zone)?;
    let target = ProfileRow::find_by_user(&state.db, user_id)
        .await?
        .ok_or(AppError::ProfileNotFound)?
        .target();

    let (current, provenance, image) = match input {
        AnalysisInput::Manual(macros) => (macros, Provenance::Manual, None),
        AnalysisInput::Image(bytes) => {
            let policy = RetryPolicy {
                max_attempts: state.config.estimator.max_attempts,
                backoff: Duration::from_millis(state.config.estimator.backoff_ms),
            };
            let outcome = estimate_with_retry(state.estimator.as_ref(), &bytes, &policy).await;
            let keep_image = outcome.is_estimated();
            let (macros, provenance) = estimate_parts(user_id, outcome);
            (macros, provenance, keep_image.then_some(bytes))
        }
    };

    let staged = stage && provenance != Provenance::Unavailable;
    if staged {
        state
            .pending
            .put(user_id, PendingEntry { macros: current, image })
            .await;
        info!(user_id = %user_id, calories = current.calories(), "analysis staged for confirmation");
    }

    let (start, end) = today_window(tz, Utc::now());
    let prior = DailyTotals::for_window(&state.db, user_id, start, end).await?;

    Ok(Analysis {
        current,
        provenance,
        prior,
        target,
        staged,
    })
}

/// Commits the staged entry for this user, or reports that none is waiting.
pub async fn confirm_pending(
    state: &AppState,
    user_id: Uuid,
    meal: &str,
) -> Result<DietRecord, AppError> {
    let entry = state
        .pending
        .take(user_id)
        .await
        .ok_or(AppError::NoPendingEntry)?;
    record_intake(state, user_id, meal, entry.macros, entry.image).await
}

/// Writes one intake record, uploading the image first when present.
///
/// If the insert fails after the upload succeeded, the object is deleted again
/// so storage does not accumulate entries history never references.
pub async fn record_intake(
    state: &AppState,
    user_id: Uuid,
    meal: &str,
    macros: Macros,
    image: Option<Bytes>,
) -> Result<DietRecord, AppError> {
    let mut stored: Option<(String, String)> = None;
    if let Some(bytes) = image {
        let key = image_key(&bytes);
        let url = state
            .storage
            .put_object(&key, bytes, IMAGE_CONTENT_TYPE)
            .await
            .map_err(AppError::Storage)?;
        stored = Some((key, url));
    }

    let new = NewDietRecord {
        user_id,
        meal,
        macros,
        image_url: stored.as_ref().map(|(_, url)| url.as_str()),
        eaten_at: Utc::now(),
    };
    match DietRecord::insert(&state.db, &new).await {
        Ok(record) => {
            info!(user_id = %user_id, record_id = %record.id, calories = record.calories, "intake recorded");
            Ok(record)
        }
        Err(e) => {
            if let Some((key, _)) = stored {
                if let Err(del) = state.storage.delete_object(&key).await {
                    warn!(key = %key, error = %del, "orphaned image after failed insert");
                }
            }
            Err(e.into())
        }
    }
}

/// Totals for the caller's current local day.
pub async fn daily_totals(
    state: &AppState,
    user_id: Uuid,
    time_zone: &str,
) -> Result<DailyTotals, AppError> {
    let tz = parse_time_zone(time_zone)?;
    let (start, end) = today_window(tz, Utc::now());
    Ok(DailyTotals::for_window(&state.db, user_id, start, end).await?)
}

/// Totals for an explicit local calendar date, both endpoints included.
pub async fn daily_totals_for_date(
    state: &AppState,
    user_id: Uuid,
    time_zone: &str,
    date: NaiveDate,
) -> Result<DailyTotals, AppError> {
    let tz = parse_time_zone(time_zone)?;
    let (start, end) = date_window(tz, date);
    Ok(DailyTotals::for_window_inclusive(&state.db, user_id, start, end).await?)
}

/// Records eaten on an explicit local calendar date, newest first.
pub async fn history_for_date(
    state: &AppState,
    user_id: Uuid,
    time_zone: &str,
    date: NaiveDate,
) -> Result<Vec<DietRecord>, AppError> {
    let tz = parse_time_zone(time_zone)?;
    let (start, end) = date_window(tz, date);
    Ok(DietRecord::list_between_inclusive(&state.db, user_id, start, end).await?)
}

pub async fn recent_history(
    state: &AppState,
    user_id: Uuid,
    limit: i64,
    offset: i64,
) -> Result<Vec<DietRecord>, AppError> {
    Ok(DietRecord::list_recent(&state.db, user_id, limit, offset).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::EstimatorError;

    #[test]
    fn image_key_has_uuid_and_digest_parts() {
        let key = image_key(b"jpeg bytes");
        let rest = key.strip_prefix("intake/").expect("intake/ prefix");
        let (uuid_part, digest_part) = rest.split_once('_').expect("separator");
        assert!(uuid_part.parse::<Uuid>().is_ok());
        assert_eq!(digest_part.len(), 8);
        assert!(digest_part.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn image_key_digest_covers_only_leading_bytes() {
        let mut a = vec![7u8; 2048];
        let mut b = vec![7u8; 2048];
        b[2000] = 9; // differs only past the hashed prefix
        let suffix = |key: &str| key.split('_').last().map(str::to_owned);
        assert_eq!(suffix(&image_key(&a)), suffix(&image_key(&b)));

        a[0] = 1; // differs inside the hashed prefix
        assert_ne!(suffix(&image_key(&a)), suffix(&image_key(&b)));
    }

    #[test]
    fn image_keys_never_repeat_for_same_content() {
        let bytes = b"same plate";
        assert_ne!(image_key(bytes), image_key(bytes));
    }

    #[test]
    fn estimate_outcomes_map_to_provenance() {
        let user = Uuid::new_v4();
        let macros = Macros::new(25, 45, 15);

        let (m, p) = estimate_parts(user, EstimateOutcome::Estimated(macros));
        assert_eq!((m, p), (macros, Provenance::Estimated));

        let (m, p) = estimate_parts(user, EstimateOutcome::AllZero);
        assert_eq!((m, p), (Macros::ZERO, Provenance::Unavailable));

        let (m, p) = estimate_parts(
            user,
            EstimateOutcome::Failed(EstimatorError::Api("boom".into())),
        );
        assert_eq!((m, p), (Macros::ZERO, Provenance::Unavailable));
    }
}
