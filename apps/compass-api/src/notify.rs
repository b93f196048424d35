//! Best-effort email notifications
//!
//! Sends run on a spawned task so request latency never depends on the
//! email provider. Failures are logged and otherwise ignored.

use std::sync::Arc;

use email_proxy::EmailTemplate;
use tracing::{debug, warn};

use crate::state::AppState;

pub fn spawn_email(state: &Arc<AppState>, template: EmailTemplate) {
    let Some(sender) = state.email.clone() else {
        debug!(kind = template.kind(), "Email disabled; skipping notification");
        return;
    };

    tokio::spawn(async move {
        let request = template.to_request(sender.default_from());
        match sender.send(request).await {
            Ok(response) => debug!(kind = template.kind(), id = %response.id, "Notification sent"),
            Err(e) => warn!(kind = template.kind(), error = %e, "Notification failed"),
        }
    });
}
