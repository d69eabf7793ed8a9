use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    #[serde(alias = "pågående")]
    Ongoing,
    #[serde(alias = "avsluttet")]
    Resolved,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    #[serde(alias = "lav")]
    Low,
    #[serde(alias = "middels")]
    Medium,
    #[serde(alias = "høy")]
    High,
    #[serde(alias = "kritisk")]
    Critical,
    #[serde(other)]
    Unknown,
}

/// A row of the `incidents` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub place: Option<String>,
    pub severity: Severity,
    pub status: IncidentStatus,
    #[serde(rename = "sentral_id", default)]
    pub central_id: Option<String>,
    #[serde(rename = "fylke_id", default)]
    pub region_id: Option<String>,
    #[serde(rename = "kategori_id", default)]
    pub category_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A row of the `incident_updates` table: a follow-up message on an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentUpdateRecord {
    pub id: String,
    pub incident_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}
