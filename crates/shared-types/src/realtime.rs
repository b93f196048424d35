//! Change events pushed to realtime subscribers

use serde::{Deserialize, Serialize};

/// Table a change event originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Cases,
    Messages,
    LeadPurchases,
    LawyerProfiles,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Cases => "cases",
            Table::Messages => "messages",
            Table::LeadPurchases => "lead_purchases",
            Table::LawyerProfiles => "lawyer_profiles",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "cases" => Some(Table::Cases),
            "messages" => Some(Table::Messages),
            "lead_purchases" => Some(Table::LeadPurchases),
            "lawyer_profiles" => Some(Table::LawyerProfiles),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row-level change
///
/// `case_id` scopes the event for visibility checks; profile changes carry
/// none and are visible to every subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: Table,
    pub kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_id: Option<String>,
    pub record: serde_json::Value,
}

impl ChangeEvent {
    pub fn new<T: Serialize>(
        table: Table,
        kind: ChangeKind,
        case_id: Option<&str>,
        record: &T,
    ) -> Self {
        Self {
            table,
            kind,
            case_id: case_id.map(str::to_string),
            record: serde_json::to_value(record).unwrap_or(serde_json::Value::Null),
        }
    }
}
