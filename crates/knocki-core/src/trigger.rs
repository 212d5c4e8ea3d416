//! Trigger model

use serde::{Deserialize, Serialize};

/// A gesture configured on a Knocki device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "device")]
    pub device_id: String,
    pub details: TriggerDetails,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDetails {
    #[serde(rename = "id")]
    pub trigger_id: i64,
    pub name: String,
}

/// Envelope returned by the triggers endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TriggerList {
    #[serde(default)]
    pub data: Vec<Trigger>,
}

impl Trigger {
    /// Unique id across devices, as used for Home Assistant unique ids
    pub fn unique_id(&self) -> String {
        format!("{}_{}", self.device_id, self.details.trigger_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_trigger_aliases() {
        let trigger: Trigger = serde_json::from_value(json!({
            "device": "KNC1-W-00000214",
            "details": {"id": 31, "name": "Tap"}
        }))
        .unwrap();

        assert_eq!(trigger.device_id, "KNC1-W-00000214");
        assert_eq!(trigger.details.trigger_id, 31);
        assert_eq!(trigger.details.name, "Tap");
        assert_eq!(trigger.unique_id(), "KNC1-W-00000214_31");

        let back = serde_json::to_value(&trigger).unwrap();
        assert_eq!(back["device"], "KNC1-W-00000214");
        assert_eq!(back["details"]["id"], 31);
    }

    #[test]
    fn test_trigger_list_ignores_extra_fields() {
        let list: TriggerList = serde_json::from_value(json!({
            "data": [
                {"device": "a", "details": {"id": 1, "name": "One", "icon": "x"}, "extra": true}
            ],
            "meta": {"count": 1}
        }))
        .unwrap();

        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].details.name, "One");
    }
}
