//! Lead browsing and acceptance

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use email_proxy::EmailTemplate;
use marketplace_core::{lifecycle::is_lead, quotas, transition, Actor};
use shared_types::{
    CaseStatus, ChangeEvent, ChangeKind, LeadPurchase, LegalCase, PaymentStatus, Role, Table,
    Tier, UsState,
};
use sqlx::SqlitePool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{conflict_on_unique, ApiError, ApiResult};
use crate::handlers::cases::load_case;
use crate::models::{
    AcceptLeadResponse, DbCase, DbLawyer, DbLeadPurchase, DbProfile, LeadFilter, LeadPreview,
};
use crate::notify::spawn_email;
use crate::state::AppState;
use crate::stripe::LeadCheckout;

/// Attorneys must hold a verified profile before touching leads
async fn require_verified_attorney(db: &SqlitePool, user: &AuthUser) -> ApiResult<()> {
    if user.role != Role::Attorney {
        return Err(ApiError::Forbidden(
            "Only attorneys can access leads".to_string(),
        ));
    }
    let verified = DbLawyer::find(db, &user.id)
        .await?
        .map(|l| l.verified)
        .unwrap_or(false);
    if !verified {
        return Err(ApiError::Forbidden(
            "Your attorney profile has not been verified yet".to_string(),
        ));
    }
    Ok(())
}

/// Purchases counted against this month's quota; failed payments are not
pub async fn leads_used_this_month(
    db: &SqlitePool,
    attorney_id: &str,
    now: DateTime<Utc>,
) -> ApiResult<u32> {
    let (start, end) = quotas::month_window(now);
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM lead_purchases
        WHERE attorney_id = ? AND created_at >= ? AND created_at < ? AND payment_status != 'failed'
        "#,
    )
    .bind(attorney_id)
    .bind(start)
    .bind(end)
    .fetch_one(db)
    .await?;
    Ok(count.max(0) as u32)
}

/// `GET /api/leads`
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(filter): Query<LeadFilter>,
) -> ApiResult<Json<Vec<LeadPreview>>> {
    require_verified_attorney(&state.db, &user).await?;

    let state_code = match filter.state.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(
            UsState::from_code(code)
                .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown state: {}", code)))?,
        ),
    };
    let topic = filter
        .topic
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", t.to_lowercase()));

    let rows: Vec<DbCase> = sqlx::query_as(
        r#"
        SELECT * FROM cases
        WHERE status = 'open'
          AND (? IS NULL OR state = ?)
          AND (? IS NULL OR LOWER(topic) LIKE ?)
        ORDER BY created_at DESC
        "#,
    )
    .bind(state_code.map(|s| s.code()))
    .bind(state_code.map(|s| s.code()))
    .bind(topic.as_deref())
    .bind(topic.as_deref())
    .fetch_all(&state.db)
    .await?;

    let previews = rows
        .into_iter()
        .map(|row| LegalCase::try_from(row).map(|case| LeadPreview::from(&case)))
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(previews))
}

/// `POST /api/leads/:case_id/accept`
pub async fn accept_lead(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(case_id): Path<String>,
) -> ApiResult<(StatusCode, Json<AcceptLeadResponse>)> {
    require_verified_attorney(&state.db, &user).await?;

    let mut case = load_case(&state.db, &case_id).await?;
    if !is_lead(case.status) {
        return Err(ApiError::Conflict(
            "This lead has already been accepted".to_string(),
        ));
    }

    let now = Utc::now();
    let used = leads_used_this_month(&state.db, &user.id, now).await?;
    quotas::check_lead_quota(user.tier, used)?;

    // Pro plans include their monthly leads; free accounts pay per lead when billing is on
    let stripe = match user.tier {
        Tier::Pro => None,
        Tier::Free => {
            if state.stripe.is_none() {
                warn!(attorney = %user.id, "Stripe not configured; lead accepted without payment");
            }
            state.stripe.as_ref()
        }
    };
    let (payment_status, amount_cents) = match stripe {
        Some(_) => (PaymentStatus::Pending, state.config.stripe_lead_price_cents),
        None => (PaymentStatus::Included, 0),
    };

    let mut purchase = LeadPurchase {
        id: Uuid::new_v4().to_string(),
        case_id: case.id.clone(),
        attorney_id: user.id.clone(),
        payment_status,
        amount_cents,
        stripe_session_id: None,
        created_at: now,
        updated_at: now,
    };
    case.status = transition(case.status, CaseStatus::Accepted, Actor::System)?;
    case.updated_at = now;

    // Monthly quota is counted inside the insert
    let limit = quotas::TierLimits::for_tier(user.tier).monthly_leads;
    let (month_start, month_end) = quotas::month_window(now);
    let mut tx = state.db.begin().await?;
    let inserted = sqlx::query(
        r#"
        INSERT INTO lead_purchases (id, case_id, attorney_id, payment_status, amount_cents, created_at, updated_at)
        SELECT ?, ?, ?, ?, ?, ?, ?
        WHERE (
            SELECT COUNT(*) FROM lead_purchases
            WHERE attorney_id = ? AND created_at >= ? AND created_at < ? AND payment_status != 'failed'
        ) < ?
        "#,
    )
    .bind(&purchase.id)
    .bind(&purchase.case_id)
    .bind(&purchase.attorney_id)
    .bind(purchase.payment_status.as_str())
    .bind(purchase.amount_cents)
    .bind(purchase.created_at)
    .bind(purchase.updated_at)
    .bind(&purchase.attorney_id)
    .bind(month_start)
    .bind(month_end)
    .bind(i64::from(limit))
    .execute(&mut *tx)
    .await
    .map_err(conflict_on_unique("This lead has already been accepted"))?;
    if inserted.rows_affected() == 0 {
        return Err(quotas::QuotaError::LeadLimit { used: limit, limit }.into());
    }

    let updated = sqlx::query("UPDATE cases SET status = ?, updated_at = ? WHERE id = ? AND status = 'open'")
        .bind(case.status.as_str())
        .bind(case.updated_at)
        .bind(&case.id)
        .execute(&mut *tx)
        .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::Conflict(
            "This lead has already been accepted".to_string(),
        ));
    }
    tx.commit().await?;

    let mut checkout_url = None;
    if let Some(stripe) = stripe {
        let session = stripe
            .create_lead_checkout(&LeadCheckout {
                purchase_id: &purchase.id,
                case_id: &case.id,
                attorney_email: &user.email,
                amount_cents,
                success_url: state
                    .config
                    .app_url(&format!("/cases/{}?checkout=success", case.id)),
                cancel_url: state.config.app_url("/leads?checkout=cancelled"),
            })
            .await;

        match session {
            Ok(session) => {
                sqlx::query("UPDATE lead_purchases SET stripe_session_id = ? WHERE id = ?")
                    .bind(&session.id)
                    .bind(&purchase.id)
                    .execute(&state.db)
                    .await?;
                purchase.stripe_session_id = Some(session.id);
                checkout_url = session.url;
            }
            Err(e) => {
                warn!(purchase = %purchase.id, error = %e, "Failed to create lead checkout");
                release_lead(&state.db, &purchase.id, &case.id).await?;
                return Err(ApiError::Upstream(
                    "Could not start checkout; the lead is still available, please try again"
                        .to_string(),
                ));
            }
        }
    }

    info!(
        case = %case.id,
        attorney = %user.id,
        payment = %purchase.payment_status,
        "Lead accepted"
    );

    state.realtime.publish(ChangeEvent::new(
        Table::LeadPurchases,
        ChangeKind::Insert,
        Some(&case.id),
        &purchase,
    ));
    state.realtime.publish(ChangeEvent::new(
        Table::Cases,
        ChangeKind::Update,
        Some(&case.id),
        &case,
    ));

    if let Some(client) = DbProfile::find(&state.db, &case.client_id).await? {
        spawn_email(
            &state,
            EmailTemplate::CaseAccepted {
                client_name: client.full_name,
                client_email: client.email,
                attorney_name: user.full_name.clone(),
                case_topic: case.topic.clone(),
                case_url: state.config.app_url(&format!("/cases/{}", case.id)),
            },
        );
    }

    Ok((
        StatusCode::CREATED,
        Json(AcceptLeadResponse {
            purchase,
            checkout_url,
        }),
    ))
}

/// Undo an acceptance whose checkout could not be created
///
/// Nothing has been published yet, so the lead simply goes back on the market.
async fn release_lead(db: &SqlitePool, purchase_id: &str, case_id: &str) -> ApiResult<()> {
    let mut tx = db.begin().await?;
    sqlx::query("DELETE FROM lead_purchases WHERE id = ?")
        .bind(purchase_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("UPDATE cases SET status = 'open', updated_at = ? WHERE id = ? AND status = 'accepted'")
        .bind(Utc::now())
        .bind(case_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    info!(case = %case_id, "Lead released after checkout failure");
    Ok(())
}

/// `GET /api/purchases`
pub async fn list_purchases(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<LeadPurchase>>> {
    user.require(Role::Attorney)?;

    let rows: Vec<DbLeadPurchase> = sqlx::query_as(
        "SELECT * FROM lead_purchases WHERE attorney_id = ? ORDER BY created_at DESC",
    )
    .bind(&user.id)
    .fetch_all(&state.db)
    .await?;

    let purchases = rows
        .into_iter()
        .map(LeadPurchase::try_from)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(purchases))
}
