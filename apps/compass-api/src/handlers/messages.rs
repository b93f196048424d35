//! Case chat between the client and the accepting attorney

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use email_proxy::EmailTemplate;
use serde_json::{json, Value};
use shared_types::{ChangeEvent, ChangeKind, ChatMessage, LegalCase, Table};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::handlers::cases::{case_access, load_case, CaseAccess};
use crate::models::{DbMessage, DbProfile, SendMessageRequest};
use crate::notify::spawn_email;
use crate::state::AppState;

const MAX_MESSAGE_CHARS: usize = 10_000;
const MAX_ATTACHMENTS: usize = 10;
const EMAIL_PREVIEW_CHARS: usize = 140;

/// Load the case and confirm the caller is one of its two parties
///
/// Returns the id of the other party, if one exists yet.
async fn party_case(
    state: &AppState,
    case_id: &str,
    user: &AuthUser,
) -> ApiResult<(LegalCase, Option<String>)> {
    let case = load_case(&state.db, case_id).await?;
    let (access, attorney_id) = case_access(&state.db, &case, user).await?;
    if !access.is_party() {
        return Err(ApiError::Forbidden(
            "Only the client and the accepting attorney can use this chat".to_string(),
        ));
    }
    let other = match access {
        CaseAccess::Client => attorney_id,
        _ => Some(case.client_id.clone()),
    };
    Ok((case, other))
}

/// `GET /api/cases/:id/messages`
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(case_id): Path<String>,
) -> ApiResult<Json<Vec<ChatMessage>>> {
    party_case(&state, &case_id, &user).await?;

    let rows: Vec<DbMessage> =
        sqlx::query_as("SELECT * FROM messages WHERE case_id = ? ORDER BY created_at ASC")
            .bind(&case_id)
            .fetch_all(&state.db)
            .await?;

    let messages = rows
        .into_iter()
        .map(ChatMessage::try_from)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(messages))
}

/// `POST /api/cases/:id/messages`
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(case_id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<(StatusCode, Json<ChatMessage>)> {
    let content = req.content.trim();
    if content.is_empty() && req.attachments.is_empty() {
        return Err(ApiError::InvalidRequest(
            "Message must have content or an attachment".to_string(),
        ));
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::InvalidRequest(format!(
            "Message exceeds {} characters",
            MAX_MESSAGE_CHARS
        )));
    }
    if req.attachments.len() > MAX_ATTACHMENTS {
        return Err(ApiError::InvalidRequest(format!(
            "At most {} attachments per message",
            MAX_ATTACHMENTS
        )));
    }

    let (case, other) = party_case(&state, &case_id, &user).await?;

    let message = ChatMessage {
        id: Uuid::new_v4().to_string(),
        case_id: case.id.clone(),
        sender_id: user.id.clone(),
        content: content.to_string(),
        attachments: req.attachments,
        read_by_recipient: false,
        created_at: Utc::now(),
    };
    let attachments =
        serde_json::to_string(&message.attachments).map_err(|e| ApiError::Internal(e.into()))?;

    sqlx::query(
        r#"
        INSERT INTO messages (id, case_id, sender_id, content, attachments, read_by_recipient, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(&message.id)
    .bind(&message.case_id)
    .bind(&message.sender_id)
    .bind(&message.content)
    .bind(&attachments)
    .bind(message.created_at)
    .execute(&state.db)
    .await?;

    info!(case = %case.id, sender = %user.id, "Message sent");
    state.realtime.publish(ChangeEvent::new(
        Table::Messages,
        ChangeKind::Insert,
        Some(&case.id),
        &message,
    ));

    if let Some(recipient) = match other {
        Some(id) => DbProfile::find(&state.db, &id).await?,
        None => None,
    } {
        let preview = if message.content.is_empty() {
            "(attachment)".to_string()
        } else {
            message.content.chars().take(EMAIL_PREVIEW_CHARS).collect()
        };
        spawn_email(
            &state,
            EmailTemplate::NewMessage {
                recipient_name: recipient.full_name,
                recipient_email: recipient.email,
                sender_name: user.full_name.clone(),
                case_topic: case.topic.clone(),
                preview,
                case_url: state.config.app_url(&format!("/cases/{}", case.id)),
            },
        );
    }

    Ok((StatusCode::CREATED, Json(message)))
}

/// `POST /api/cases/:id/messages/read`
pub async fn mark_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(case_id): Path<String>,
) -> ApiResult<Json<Value>> {
    party_case(&state, &case_id, &user).await?;

    let result = sqlx::query(
        "UPDATE messages SET read_by_recipient = 1 WHERE case_id = ? AND sender_id != ? AND read_by_recipient = 0",
    )
    .bind(&case_id)
    .bind(&user.id)
    .execute(&state.db)
    .await?;

    Ok(Json(json!({ "updated": result.rows_affected() })))
}
