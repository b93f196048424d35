pub mod jurisdiction;
pub mod realtime;
pub mod types;

pub use jurisdiction::UsState;
pub use realtime::{ChangeEvent, ChangeKind, Table};
pub use types::{
    Attachment, CaseStatus, ChatMessage, DocumentTemplate, LawyerProfile, LeadPurchase, LegalCase,
    ParseEnumError, PaymentStatus, Review, Role, Tier, Urgency, UserPublic,
};
