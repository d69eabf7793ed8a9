use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::notifications::{IncidentRecord, IncidentStatus};
use crate::push::platform::Platform;

/// Which incidents a device wants to be notified about.
///
/// Every id list is a filter; an empty list places no restriction on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryScope {
    #[serde(rename = "sentral_ids", default)]
    pub central_ids: Vec<String>,
    #[serde(rename = "fylke_ids", default)]
    pub region_ids: Vec<String>,
    #[serde(rename = "kategori_ids", default)]
    pub category_ids: Vec<String>,
    #[serde(rename = "kun_pågående", default)]
    pub only_ongoing: bool,
}

impl DeliveryScope {
    /// Returns `true` if a change to `incident` should be pushed to this scope.
    pub fn matches(&self, incident: &IncidentRecord) -> bool {
        fn allows(filter: &[String], value: Option<&str>) -> bool {
            filter.is_empty() || value.is_some_and(|value| filter.iter().any(|id| id == value))
        }

        allows(&self.central_ids, incident.central_id.as_deref())
            && allows(&self.region_ids, incident.region_id.as_deref())
            && allows(&self.category_ids, incident.category_id.as_deref())
            && (!self.only_ongoing || incident.status == IncidentStatus::Ongoing)
    }
}

/// A registered push recipient, serialized as the persisted subscriber record.
///
/// `device_id` is the natural key; `id` is assigned by the store on first insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscriber {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub device_id: Uuid,
    pub platform: Platform,
    #[serde(rename = "push_token")]
    pub token: String,
    #[serde(rename = "push_aktiv")]
    pub active: bool,
    #[serde(flatten)]
    pub scope: DeliveryScope,
    #[serde(rename = "sist_aktiv")]
    pub last_active_at: DateTime<Utc>,
}

impl PushSubscriber {
    /// Creates an active subscriber that has not been stored yet.
    pub fn new(
        device_id: Uuid,
        platform: Platform,
        token: impl Into<String>,
        scope: DeliveryScope,
        last_active_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            device_id,
            platform,
            token: token.into(),
            active: true,
            scope,
            last_active_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::notifications::Severity;

    fn incident(status: IncidentStatus) -> IncidentRecord {
        IncidentRecord {
            id: "i-1".to_owned(),
            title: "Brann i bolig".to_owned(),
            description: None,
            place: Some("Hamar".to_owned()),
            severity: Severity::High,
            status,
            central_id: Some("c-1".to_owned()),
            region_id: Some("r-1".to_owned()),
            category_id: Some("k-1".to_owned()),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            updated_at: None,
        }
    }

    #[test]
    fn empty_scope_matches_everything() {
        let scope = DeliveryScope::default();
        assert!(scope.matches(&incident(IncidentStatus::Resolved)));
    }

    #[test]
    fn every_non_empty_filter_must_match() {
        let scope = DeliveryScope {
            central_ids: vec!["c-1".to_owned()],
            region_ids: vec!["r-2".to_owned(), "r-1".to_owned()],
            category_ids: vec![],
            only_ongoing: false,
        };
        assert!(scope.matches(&incident(IncidentStatus::Ongoing)));

        let other_region = DeliveryScope {
            region_ids: vec!["r-9".to_owned()],
            ..scope
        };
        assert!(!other_region.matches(&incident(IncidentStatus::Ongoing)));
    }

    #[test]
    fn only_ongoing_filters_resolved_incidents() {
        let scope = DeliveryScope {
            only_ongoing: true,
            ..DeliveryScope::default()
        };

        assert!(scope.matches(&incident(IncidentStatus::Ongoing)));
        assert!(!scope.matches(&incident(IncidentStatus::Resolved)));
    }

    #[test]
    fn serializes_the_persisted_record_shape() {
        let subscriber = PushSubscriber::new(
            Uuid::nil(),
            Platform::Android,
            "token-1",
            DeliveryScope {
                central_ids: vec!["c-1".to_owned()],
                region_ids: vec![],
                category_ids: vec!["k-1".to_owned()],
                only_ongoing: true,
            },
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        );

        insta::assert_snapshot!(
            serde_json::to_string(&subscriber).unwrap(),
            @r#"{"device_id":"00000000-0000-0000-0000-000000000000","platform":"android","push_token":"token-1","push_aktiv":true,"sentral_ids":["c-1"],"fylke_ids":[],"kategori_ids":["k-1"],"kun_pågående":true,"sist_aktiv":"2024-05-01T12:00:00Z"}"#
        );
    }

    #[test]
    fn deserializes_a_stored_record() {
        let raw = r#"{
            "id": "6f1c2a34-5b6d-4e7f-8a9b-0c1d2e3f4a5b",
            "device_id": "00000000-0000-0000-0000-000000000001",
            "platform": "web",
            "push_token": "{}",
            "push_aktiv": false,
            "sentral_ids": [],
            "fylke_ids": ["r-1"],
            "kategori_ids": [],
            "kun_pågående": false,
            "sist_aktiv": "2024-05-01T12:00:00+00:00"
        }"#;

        let subscriber: PushSubscriber = serde_json::from_str(raw).unwrap();
        assert!(subscriber.id.is_some());
        assert!(!subscriber.active);
        assert_eq!(subscriber.scope.region_ids, vec!["r-1".to_owned()]);
    }
}
