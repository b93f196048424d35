//! Document templates and generation

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use marketplace_core::{quotas, templates};
use shared_types::{DocumentTemplate, UsState};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{
    CreateTemplateRequest, DbTemplate, GenerateRequest, GeneratedDocument, TemplateFilter,
    TemplateSummary,
};
use crate::state::AppState;

async fn load_template(db: &SqlitePool, id: &str) -> ApiResult<DocumentTemplate> {
    sqlx::query_as::<_, DbTemplate>("SELECT * FROM templates WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or(ApiError::NotFound("Template"))?
        .try_into()
}

/// Documents generated by a user, ever
pub async fn templates_used(db: &SqlitePool, user_id: &str) -> ApiResult<u32> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM template_usage WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(db)
        .await?;
    Ok(count.max(0) as u32)
}

/// `GET /api/templates`
///
/// A state filter also matches general templates that carry no state.
pub async fn list_templates(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(filter): Query<TemplateFilter>,
) -> ApiResult<Json<Vec<TemplateSummary>>> {
    let state_code = match filter.state.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(
            UsState::from_code(code)
                .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown state: {}", code)))?,
        ),
    };
    let category = filter
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());

    let rows: Vec<DbTemplate> = sqlx::query_as(
        r#"
        SELECT * FROM templates
        WHERE (? IS NULL OR LOWER(category) = LOWER(?))
          AND (? IS NULL OR state IS NULL OR state = ?)
        ORDER BY category, title
        "#,
    )
    .bind(category)
    .bind(category)
    .bind(state_code.map(|s| s.code()))
    .bind(state_code.map(|s| s.code()))
    .fetch_all(&state.db)
    .await?;

    let summaries = rows
        .into_iter()
        .map(|row| DocumentTemplate::try_from(row).map(|t| TemplateSummary::from(&t)))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(summaries))
}

/// `GET /api/templates/:id`
pub async fn get_template(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<DocumentTemplate>> {
    Ok(Json(load_template(&state.db, &id).await?))
}

/// `POST /api/templates/:id/generate`
pub async fn generate(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<Json<GeneratedDocument>> {
    let template = load_template(&state.db, &id).await?;

    let used = templates_used(&state.db, &user.id).await?;
    quotas::check_template_quota(user.tier, used)?;

    let document = templates::render(&template.body, &req.fields)?;

    // Template quota is counted inside the insert
    let limit = quotas::TierLimits::for_tier(user.tier).templates;
    let inserted = sqlx::query(
        r#"
        INSERT INTO template_usage (id, user_id, template_id, created_at)
        SELECT ?, ?, ?, ?
        WHERE ? IS NULL OR (SELECT COUNT(*) FROM template_usage WHERE user_id = ?) < ?
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(&user.id)
    .bind(&template.id)
    .bind(Utc::now())
    .bind(limit.map(i64::from))
    .bind(&user.id)
    .bind(limit.map(i64::from))
    .execute(&state.db)
    .await?;
    if let (0, Some(limit)) = (inserted.rows_affected(), limit) {
        return Err(quotas::QuotaError::TemplateLimit { limit }.into());
    }

    info!(user = %user.id, template = %template.id, "Document generated");
    Ok(Json(GeneratedDocument {
        template_id: template.id,
        title: template.title,
        document,
    }))
}

/// `POST /api/templates`
pub async fn create_template(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<CreateTemplateRequest>,
) -> ApiResult<(StatusCode, Json<DocumentTemplate>)> {
    user.require_admin()?;

    let title = req.title.trim();
    let category = req.category.trim().to_lowercase();
    if title.is_empty() || category.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Title and category are required".to_string(),
        ));
    }
    let state_code = match req.state.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(
            UsState::from_code(code)
                .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown state: {}", code)))?,
        ),
    };
    templates::validate_body(&req.body)?;

    let template = DocumentTemplate {
        id: Uuid::new_v4().to_string(),
        title: title.to_string(),
        category,
        state: state_code,
        description: req.description.trim().to_string(),
        body: req.body,
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO templates (id, title, category, state, description, body, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&template.id)
    .bind(&template.title)
    .bind(&template.category)
    .bind(template.state.map(|s| s.code()))
    .bind(&template.description)
    .bind(&template.body)
    .bind(template.created_at)
    .execute(&state.db)
    .await?;

    info!(template = %template.id, category = %template.category, "Template created");
    Ok((StatusCode::CREATED, Json(template)))
}
