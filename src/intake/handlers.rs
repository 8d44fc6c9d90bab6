use axum::extract::multipart::{Field, MultipartError};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use tracing::instrument;
use uuid::Uuid;

use super::dto::{AnalysisResponse, ConfirmRequest, HistoryQuery, PendingResponse, TotalsQuery};
use super::repo_types::{DailyTotals, DietRecord};
use super::services::{self, AnalysisInput, DEFAULT_MEAL};
use crate::auth::services::AuthUser;
use crate::error::AppError;
use crate::nutrition::{Macros, MAX_COMPONENT_G};
use crate::state::AppState;

const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn intake_routes() -> Router<AppState> {
    Router::new()
        .route("/intake/analyze", post(analyze_intake))
        .route("/intake/confirm", post(confirm_intake))
        .route("/intake/pending", get(get_pending))
        .route("/intake/records", post(create_record).get(list_records))
        .route("/intake/records/:id", get(get_record))
        .route("/intake/today", get(today_totals))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

/// Fields accepted by the multipart intake endpoints. Unknown fields are
/// ignored.
#[derive(Default)]
struct IntakeForm {
    image: Option<Bytes>,
    protein: Option<i32>,
    carbohydrates: Option<i32>,
    fat: Option<i32>,
    meal: Option<String>,
    time_zone: Option<String>,
    stage: bool,
}

impl IntakeForm {
    async fn parse(multipart: &mut Multipart) -> Result<IntakeForm, AppError> {
        let mut form = IntakeForm::default();
        while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
            let Some(name) = field.name().map(str::to_owned) else {
                continue;
            };
            match name.as_str() {
                "image" => form.image = Some(field.bytes().await.map_err(bad_multipart)?),
                "protein" => form.protein = Some(parse_grams(&name, &text(field).await?)?),
                "carbohydrates" => {
                    form.carbohydrates = Some(parse_grams(&name, &text(field).await?)?)
                }
                "fat" => form.fat = Some(parse_grams(&name, &text(field).await?)?),
                "meal" => form.meal = Some(text(field).await?),
                "time_zone" => form.time_zone = Some(text(field).await?),
                "stage" => form.stage = parse_flag(&text(field).await?),
                _ => {}
            }
        }
        Ok(form)
    }

    /// The manual macro triple, which is all-or-nothing.
    fn manual_macros(&self) -> Result<Option<Macros>, AppError> {
        match (self.protein, self.carbohydrates, self.fat) {
            (Some(p), Some(c), Some(f)) => Ok(Some(Macros::new(p, c, f))),
            (None, None, None) => Ok(None),
            _ => Err(AppError::InvalidInput(
                "protein, carbohydrates and fat must be provided together".into(),
            )),
        }
    }

    /// Resolves the analysis source. A complete manual triple wins over an
    /// image sent alongside it; the image is dropped unestimated.
    fn into_input(self) -> Result<AnalysisInput, AppError> {
        let manual = self.manual_macros()?;
        match (self.image, manual) {
            (_, Some(macros)) => Ok(AnalysisInput::Manual(macros)),
            (Some(bytes), None) => Ok(AnalysisInput::Image(bytes)),
            (None, None) => Err(AppError::InvalidInput(
                "provide an image or a manual macro triple".into(),
            )),
        }
    }

    fn meal_or_default(&self) -> &str {
        match self.meal.as_deref().map(str::trim) {
            Some(meal) if !meal.is_empty() => meal,
            _ => DEFAULT_MEAL,
        }
    }
}

async fn text(field: Field<'_>) -> Result<String, AppError> {
    field.text().await.map_err(bad_multipart)
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::InvalidInput(format!("malformed multipart body: {e}"))
}

fn parse_grams(name: &str, raw: &str) -> Result<i32, AppError> {
    let grams = raw.trim().parse::<i32>().map_err(|_| {
        AppError::InvalidInput(format!("{name} must be an integer gram count"))
    })?;
    if grams < 0 {
        return Err(AppError::InvalidInput(format!("{name} cannot be negative")));
    }
    if grams > MAX_COMPONENT_G {
        return Err(AppError::InvalidInput(format!(
            "{name} cannot exceed {MAX_COMPONENT_G} g"
        )));
    }
    Ok(grams)
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim(), "true" | "1" | "yes")
}

/// POST /intake/analyze (multipart): image and/or a manual macro triple, plus
/// a required `time_zone` and an optional `stage` flag.
#[instrument(skip(state, multipart))]
async fn analyze_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<AnalysisResponse>, AppError> {
    let mut form = IntakeForm::parse(&mut multipart).await?;
    let time_zone = form
        .time_zone
        .take()
        .ok_or_else(|| AppError::InvalidInput("time_zone is required".into()))?;
    let stage = form.stage;
    let input = form.into_input()?;

    let analysis = services::analyze(&state, user_id, &time_zone, input, stage).await?;
    Ok(Json(analysis.into()))
}

/// POST /intake/confirm: commits the staged analysis under the given meal.
#[instrument(skip(state, payload))]
async fn confirm_intake(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ConfirmRequest>,
) -> Result<(StatusCode, Json<DietRecord>), AppError> {
    let record = services::confirm_pending(&state, user_id, payload.meal()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /intake/pending: the staged entry a confirm would commit, if any.
#[instrument(skip(state))]
async fn get_pending(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<PendingResponse>, AppError> {
    let entry = state
        .pending
        .get(user_id)
        .await
        .ok_or(AppError::NoPendingEntry)?;
    Ok(Json(entry.into()))
}

/// POST /intake/records (multipart): direct manual save, no staging involved.
#[instrument(skip(state, multipart))]
async fn create_record(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<DietRecord>), AppError> {
    let form = IntakeForm::parse(&mut multipart).await?;
    let macros = form.manual_macros()?.ok_or_else(|| {
        AppError::InvalidInput("protein, carbohydrates and fat are required".into())
    })?;
    let meal = form.meal_or_default().to_owned();

    let record = services::record_intake(&state, user_id, &meal, macros, form.image).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /intake/records: an explicit local date (with its zone), or a paged
/// recent listing when no date is given.
#[instrument(skip(state))]
async fn list_records(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<Vec<DietRecord>>, AppError> {
    let records = match query.date {
        Some(date) => {
            let time_zone = query.time_zone.as_deref().ok_or_else(|| {
                AppError::InvalidInput("time_zone is required when date is given".into())
            })?;
            services::history_for_date(&state, user_id, time_zone, date).await?
        }
        None => {
            let limit = query.limit.clamp(1, 100);
            let offset = query.offset.max(0);
            services::recent_history(&state, user_id, limit, offset).await?
        }
    };
    Ok(Json(records))
}

#[instrument(skip(state))]
async fn get_record(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DietRecord>, AppError> {
    let record = DietRecord::find_by_id(&state.db, user_id, id)
        .await?
        .ok_or(AppError::RecordNotFound)?;
    Ok(Json(record))
}

/// GET /intake/today: totals for the caller's current local day, or for an
/// explicit date when one is given.
#[instrument(skip(state))]
async fn today_totals(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<TotalsQuery>,
) -> Result<Json<DailyTotals>, AppError> {
    let totals = match query.date {
        Some(date) => {
            services::daily_totals_for_date(&state, user_id, &query.time_zone, date).await?
        }
        None => services::daily_totals(&state, user_id, &query.time_zone).await?,
    };
    Ok(Json(totals))
}
