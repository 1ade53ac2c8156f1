use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(CitizenId);
id_newtype!(WindowId);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowRole {
    Main,
    Register,
    List,
}

impl WindowRole {
    pub const ALL: [WindowRole; 3] = [WindowRole::Main, WindowRole::Register, WindowRole::List];

    pub fn as_str(self) -> &'static str {
        match self {
            WindowRole::Main => "main",
            WindowRole::Register => "register",
            WindowRole::List => "list",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl std::fmt::Display for WindowRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Form data submitted by the register window.
///
/// The core never looks inside; the store only reads the optional `"id"`
/// field, which must be unique across stored citizens.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CitizenRecord(pub Map<String, Value>);

impl CitizenRecord {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn external_id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(raw) if !raw.trim().is_empty() => Some(raw.trim().to_string()),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        }
    }
}

impl TryFrom<Value> for CitizenRecord {
    type Error = &'static str;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(Self(fields)),
            _ => Err("citizen record must be a JSON object"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCitizen {
    pub citizen_id: CitizenId,
    pub record: CitizenRecord,
    pub created_at: DateTime<Utc>,
}
