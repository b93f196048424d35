//! Email types and request/response structures
//!
//! Request bodies follow the Resend API shape so they can be forwarded
//! without translation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum recipients per message
pub const MAX_RECIPIENTS: usize = 50;

/// Email send request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailRequest {
    /// Sender; the configured default is used when empty
    #[serde(default)]
    pub from: String,

    /// Recipient email addresses
    pub to: Vec<String>,

    /// Reply-to address (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,

    pub subject: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,

    /// Plain text body (recommended for deliverability)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Tags for tracking
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<EmailTag>,
}

impl SendEmailRequest {
    /// Create a simple email request
    pub fn simple(from: &str, to: &str, subject: &str, html: &str) -> Self {
        Self {
            from: from.to_string(),
            to: vec![to.to_string()],
            reply_to: None,
            subject: subject.to_string(),
            html: Some(html.to_string()),
            text: None,
            tags: vec![],
        }
    }

    /// Add a tag for tracking
    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.tags.push(EmailTag {
            name: name.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Add plain text version
    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    /// Validate the request
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.from.is_empty() {
            return Err(ValidationError::MissingField("from"));
        }
        if !is_valid_email(&self.from) {
            return Err(ValidationError::InvalidEmail(self.from.clone()));
        }

        if self.to.is_empty() {
            return Err(ValidationError::MissingField("to"));
        }
        if self.to.len() > MAX_RECIPIENTS {
            return Err(ValidationError::TooManyRecipients(self.to.len()));
        }
        for email in &self.to {
            if !is_valid_email(email) {
                return Err(ValidationError::InvalidEmail(email.clone()));
            }
        }
        if let Some(reply_to) = &self.reply_to {
            if !is_valid_email(reply_to) {
                return Err(ValidationError::InvalidEmail(reply_to.clone()));
            }
        }

        if self.subject.trim().is_empty() {
            return Err(ValidationError::MissingField("subject"));
        }

        let has_html = self.html.as_deref().is_some_and(|h| !h.trim().is_empty());
        let has_text = self.text.as_deref().is_some_and(|t| !t.trim().is_empty());
        if !has_html && !has_text {
            return Err(ValidationError::MissingContent);
        }

        Ok(())
    }
}

/// Email tag for tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailTag {
    pub name: String,
    pub value: String,
}

/// Response from send email
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendEmailResponse {
    /// Provider message ID
    pub id: String,

    /// Timestamp when the email was accepted by the provider
    pub queued_at: DateTime<Utc>,
}

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Email must have either html or text content")]
    MissingContent,

    #[error("Too many recipients: {0} (max 50)")]
    TooManyRecipients(usize),
}

/// Check an address, accepting the `Name <email@domain.com>` form
pub fn is_valid_email(email: &str) -> bool {
    let email = match (email.find('<'), email.rfind('>')) {
        (Some(start), Some(end)) if start < end => &email[start + 1..end],
        _ => email,
    };
    email_address::EmailAddress::is_valid(email.trim())
}

/// Legal Compass notification emails
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmailTemplate {
    /// Sent to a new account after registration
    Welcome {
        name: String,
        email: String,
        dashboard_url: String,
    },

    /// An attorney accepted the client's case
    CaseAccepted {
        client_name: String,
        client_email: String,
        attorney_name: String,
        case_topic: String,
        case_url: String,
    },

    /// New chat message on a case
    NewMessage {
        recipient_name: String,
        recipient_email: String,
        sender_name: String,
        case_topic: String,
        preview: String,
        case_url: String,
    },

    /// Admin verified an attorney's credentials
    AttorneyVerified {
        attorney_name: String,
        attorney_email: String,
        leads_url: String,
    },
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn layout(heading: &str, paragraphs: &[String], button: Option<(&str, &str)>) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| {
            format!(
                r#"  <p style="color: #444; font-size: 16px; line-height: 1.5;">{}</p>
"#,
                p
            )
        })
        .collect();
    let button_html = button
        .map(|(label, url)| {
            format!(
                r#"  <div style="margin: 30px 0;">
    <a href="{url}" style="display: inline-block; background-color: #1e3a8a; color: white; padding: 14px 28px; text-decoration: none; border-radius: 6px; font-weight: 600;">{label}</a>
  </div>
"#,
                url = escape_html(url),
                label = escape_html(label),
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
</head>
<body style="font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #1e3a8a; font-size: 22px;">{heading}</h1>
{body}{button_html}  <hr style="border: none; border-top: 1px solid #eee; margin: 30px 0;">
  <p style="color: #999; font-size: 12px;">Legal Compass does not provide legal advice. Attorneys listed are independent practitioners.</p>
</body>
</html>"#,
        heading = escape_html(heading),
    )
}

impl EmailTemplate {
    /// Recipient address of the template
    pub fn recipient(&self) -> &str {
        match self {
            EmailTemplate::Welcome { email, .. } => email,
            EmailTemplate::CaseAccepted { client_email, .. } => client_email,
            EmailTemplate::NewMessage {
                recipient_email, ..
            } => recipient_email,
            EmailTemplate::AttorneyVerified { attorney_email, .. } => attorney_email,
        }
    }

    /// Tag value used for delivery analytics
    pub fn kind(&self) -> &'static str {
        match self {
            EmailTemplate::Welcome { .. } => "welcome",
            EmailTemplate::CaseAccepted { .. } => "case_accepted",
            EmailTemplate::NewMessage { .. } => "new_message",
            EmailTemplate::AttorneyVerified { .. } => "attorney_verified",
        }
    }

    /// Convert template to SendEmailRequest
    pub fn to_request(&self, from: &str) -> SendEmailRequest {
        let (subject, html, text) = match self {
            EmailTemplate::Welcome {
                name,
                dashboard_url,
                ..
            } => (
                "Welcome to Legal Compass".to_string(),
                layout(
                    "Welcome to Legal Compass",
                    &[format!("Hi {},", escape_html(name)),
                      "Your account is ready. You can submit a case, browse verified attorneys, \
                       or start a legal research session from your dashboard."
                        .to_string()],
                    Some(("Open dashboard", dashboard_url)),
                ),
                format!(
                    "Hi {},\n\nYour Legal Compass account is ready.\n\n{}",
                    name, dashboard_url
                ),
            ),
            EmailTemplate::CaseAccepted {
                client_name,
                attorney_name,
                case_topic,
                case_url,
                ..
            } => (
                format!("{} accepted your case", attorney_name),
                layout(
                    "An attorney accepted your case",
                    &[
                        format!("Hi {},", escape_html(client_name)),
                        format!(
                            "<strong>{}</strong> has accepted your case \"{}\" and can now \
                             message you directly.",
                            escape_html(attorney_name),
                            escape_html(case_topic)
                        ),
                    ],
                    Some(("View case", case_url)),
                ),
                format!(
                    "Hi {},\n\n{} has accepted your case \"{}\".\n\n{}",
                    client_name, attorney_name, case_topic, case_url
                ),
            ),
            EmailTemplate::NewMessage {
                recipient_name,
                sender_name,
                case_topic,
                preview,
                case_url,
                ..
            } => (
                format!("New message from {}", sender_name),
                layout(
                    "You have a new message",
                    &[
                        format!("Hi {},", escape_html(recipient_name)),
                        format!(
                            "{} wrote about \"{}\":",
                            escape_html(sender_name),
                            escape_html(case_topic)
                        ),
                        format!("<em>{}</em>", escape_html(preview)),
                    ],
                    Some(("Reply", case_url)),
                ),
                format!(
                    "Hi {},\n\n{} wrote about \"{}\":\n\n{}\n\n{}",
                    recipient_name, sender_name, case_topic, preview, case_url
                ),
            ),
            EmailTemplate::AttorneyVerified {
                attorney_name,
                leads_url,
                ..
            } => (
                "Your attorney profile is verified".to_string(),
                layout(
                    "You're verified",
                    &[
                        format!("Hi {},", escape_html(attorney_name)),
                        "Your credentials have been verified. You can now browse and accept \
                         leads in your licensed states."
                            .to_string(),
                    ],
                    Some(("Browse leads", leads_url)),
                ),
                format!(
                    "Hi {},\n\nYour credentials have been verified.\n\n{}",
                    attorney_name, leads_url
                ),
            ),
        };

        SendEmailRequest::simple(from, self.recipient(), &subject, &html)
            .with_text(&text)
            .with_tag("category", self.kind())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const FROM: &str = "Legal Compass <noreply@legalcompass.app>";

    #[test]
    fn test_simple_request_validates() {
        let req = SendEmailRequest::simple(FROM, "client@example.com", "Hello", "<p>Hi</p>");
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn test_validation_errors() {
        let mut req = SendEmailRequest::simple(FROM, "client@example.com", "Hello", "<p>Hi</p>");
        req.to.clear();
        assert_eq!(req.validate(), Err(ValidationError::MissingField("to")));

        let mut req = SendEmailRequest::simple(FROM, "not-an-email", "Hello", "<p>Hi</p>");
        assert_eq!(
            req.validate(),
            Err(ValidationError::InvalidEmail("not-an-email".to_string()))
        );

        req.to = vec!["client@example.com".to_string()];
        req.html = Some("   ".to_string());
        assert_eq!(req.validate(), Err(ValidationError::MissingContent));

        req.html = Some("<p>ok</p>".to_string());
        req.subject = " ".to_string();
        assert_eq!(req.validate(), Err(ValidationError::MissingField("subject")));
    }

    #[test]
    fn test_recipient_limit() {
        let mut req = SendEmailRequest::simple(FROM, "a@example.com", "Hello", "<p>Hi</p>");
        req.to = (0..=MAX_RECIPIENTS)
            .map(|i| format!("user{}@example.com", i))
            .collect();
        assert_eq!(
            req.validate(),
            Err(ValidationError::TooManyRecipients(MAX_RECIPIENTS + 1))
        );
    }

    #[test]
    fn test_named_address_form() {
        assert!(is_valid_email("Legal Compass <noreply@legalcompass.app>"));
        assert!(!is_valid_email("Legal Compass <>"));
    }

    #[test]
    fn test_case_accepted_template() {
        let template = EmailTemplate::CaseAccepted {
            client_name: "Jamie".to_string(),
            client_email: "jamie@example.com".to_string(),
            attorney_name: "Ada Counsel".to_string(),
            case_topic: "Deposit <dispute>".to_string(),
            case_url: "https://legalcompass.app/cases/1".to_string(),
        };
        let req = template.to_request(FROM);

        assert_eq!(req.to, vec!["jamie@example.com".to_string()]);
        assert_eq!(req.subject, "Ada Counsel accepted your case");
        let html = req.html.as_deref().unwrap();
        assert!(html.contains("Deposit &lt;dispute&gt;"));
        assert!(html.contains("https://legalcompass.app/cases/1"));
        assert!(req.text.as_deref().unwrap().contains("Deposit <dispute>"));
        assert_eq!(
            req.tags,
            vec![EmailTag {
                name: "category".to_string(),
                value: "case_accepted".to_string()
            }]
        );
        assert_eq!(req.validate(), Ok(()));
    }

    #[test]
    fn test_template_deserializes_by_type() {
        let template: EmailTemplate = serde_json::from_str(
            r#"{"type":"welcome","name":"Sam","email":"sam@example.com","dashboard_url":"https://x"}"#,
        )
        .unwrap();
        assert_eq!(template.kind(), "welcome");
        assert_eq!(template.recipient(), "sam@example.com");
    }
}
