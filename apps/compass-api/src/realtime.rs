//! Realtime change feed
//!
//! Handlers publish a [`ChangeEvent`] after each committed write; subscribers
//! receive them over Server-Sent Events. Delivery is best effort: a slow
//! subscriber that falls behind skips the missed events.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::Deserialize;
use shared_types::{ChangeEvent, Role, Table};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tokio_stream::wrappers::{errors::BroadcastStreamRecvError, BroadcastStream};
use tracing::{debug, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Clone)]
pub struct RealtimeHub {
    tx: broadcast::Sender<ChangeEvent>,
}

impl Default for RealtimeHub {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl RealtimeHub {
    /// Fire and forget; no subscribers is not an error
    pub fn publish(&self, event: ChangeEvent) {
        debug!(table = event.table.as_str(), kind = ?event.kind, "Publishing change");
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

/// Whether `user_id` is the client of the case or holds its lead purchase
pub async fn participates(db: &SqlitePool, case_id: &str, user_id: &str) -> ApiResult<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT 1 FROM cases c
        LEFT JOIN lead_purchases lp ON lp.case_id = c.id
        WHERE c.id = ? AND (c.client_id = ? OR lp.attorney_id = ?)
        "#,
    )
    .bind(case_id)
    .bind(user_id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

async fn visible(db: &SqlitePool, user: &AuthUser, event: &ChangeEvent) -> bool {
    if user.role == Role::Admin {
        return true;
    }
    match &event.case_id {
        None => true,
        Some(case_id) => match participates(db, case_id, &user.id).await {
            Ok(allowed) => allowed,
            Err(e) => {
                warn!(
                    user = %user.id,
                    case = %case_id,
                    error = %e,
                    "Dropping event; participation lookup failed"
                );
                false
            }
        },
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscribeQuery {
    pub case_id: Option<String>,
}

/// `GET /realtime/:table`
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(table): Path<String>,
    Query(query): Query<SubscribeQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let table = Table::from_name(&table)
        .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown table: {}", table)))?;

    if let Some(case_id) = &query.case_id {
        if user.role != Role::Admin && !participates(&state.db, case_id, &user.id).await? {
            return Err(ApiError::Forbidden(
                "Not a participant in this case".to_string(),
            ));
        }
    }

    debug!(user = %user.id, table = table.as_str(), case_id = ?query.case_id, "Realtime subscribe");

    let filter_case = query.case_id;
    let rx = state.realtime.subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |item| {
        let state = state.clone();
        let user = user.clone();
        let filter_case = filter_case.clone();
        async move {
            let event = match item {
                Ok(event) => event,
                Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Realtime subscriber lagged");
                    return None;
                }
            };
            if event.table != table {
                return None;
            }
            if let Some(case_id) = &filter_case {
                if event.case_id.as_deref() != Some(case_id.as_str()) {
                    return None;
                }
            } else if !visible(&state.db, &user, &event).await {
                return None;
            }
            Event::default().json_data(&event).ok().map(Ok)
        }
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
