use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A registered user as seen outside the credential store.
/// The password hash never leaves the db layer, so it has no field here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub username: String,
    pub rating: u8,
    pub feedback: String,
    pub contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One entry of the embedded report catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportView {
    pub title: String,
    pub description: String,
    pub embed_url: String,
}

/// One key-takeaway card of the insights panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMetric {
    pub label: String,
    pub value: String,
    pub delta: String,
}

/// The insights panel for one set of filters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsightsSummary {
    pub cities: Vec<String>,
    pub year_from: u16,
    pub year_to: u16,
    pub sectors: Vec<String>,
    /// Human-readable restatement of the filters.
    pub summary: String,
    pub takeaways: Vec<KeyMetric>,
}
