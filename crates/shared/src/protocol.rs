use serde::{Deserialize, Serialize};

use crate::domain::{CitizenRecord, StoredCitizen};

/// Requests a window content process sends to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum WindowRequest {
    SaveCitizen { record: CitizenRecord },
    CloseRegisterWindow,
    ListCitizens,
}

impl WindowRequest {
    pub fn channel(&self) -> &'static str {
        match self {
            WindowRequest::SaveCitizen { .. } => "save-citizen",
            WindowRequest::CloseRegisterWindow => "close-register-window",
            WindowRequest::ListCitizens => "list-citizens",
        }
    }
}

/// Events the core sends to a window content process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "channel", content = "payload", rename_all = "kebab-case")]
pub enum WindowEvent {
    CitizenSaved { citizen: StoredCitizen },
    CitizenSaveError { message: String },
    CitizensList { citizens: Vec<StoredCitizen> },
    CitizensListError { message: String },
    SerialData { line: String },
}

impl WindowEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            WindowEvent::CitizenSaved { .. } => "citizen-saved",
            WindowEvent::CitizenSaveError { .. } => "citizen-save-error",
            WindowEvent::CitizensList { .. } => "citizens-list",
            WindowEvent::CitizensListError { .. } => "citizens-list-error",
            WindowEvent::SerialData { .. } => "serial-data",
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_channels_match_wire_tags() {
        let raw = json!({"channel": "save-citizen", "payload": {"record": {"name": "Ana"}}});
        let request: WindowRequest = serde_json::from_value(raw).expect("decode");
        assert_eq!(request.channel(), "save-citizen");

        let close = serde_json::to_value(WindowRequest::CloseRegisterWindow).expect("encode");
        assert_eq!(close["channel"], "close-register-window");

        let list: WindowRequest =
            serde_json::from_value(json!({"channel": "list-citizens"})).expect("decode");
        assert_eq!(list, WindowRequest::ListCitizens);
    }

    #[test]
    fn event_channels_match_wire_tags() {
        let events = [
            WindowEvent::CitizenSaveError {
                message: "boom".into(),
            },
            WindowEvent::CitizensList { citizens: vec![] },
            WindowEvent::CitizensListError {
                message: "boom".into(),
            },
            WindowEvent::SerialData { line: "42".into() },
        ];
        for event in events {
            let encoded = serde_json::to_value(&event).expect("encode");
            assert_eq!(encoded["channel"], event.channel());
        }
    }
}
