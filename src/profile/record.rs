use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Per-identity profile as stored under `userList/{id}`.
///
/// Unknown fields are ignored on read. Timestamps are accepted as RFC 3339,
/// RFC 2822 (HTTP date) or epoch milliseconds and always written as RFC 3339.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProfileRecord {
    pub display_name: String,
    pub phone_number: String,
    pub address: String,
    pub email: String,
    #[serde(
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProfileRecord {
    /// Empty record created on first profile load.
    #[must_use]
    pub fn initial(email: &str, now: DateTime<Utc>) -> Self {
        Self {
            email: email.to_string(),
            created_at: Some(now),
            ..Self::default()
        }
    }
}

/// Fields the user can edit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileDraft {
    pub display_name: String,
    pub phone_number: String,
    pub address: String,
}

impl ProfileDraft {
    #[must_use]
    pub fn from_record(record: &ProfileRecord) -> Self {
        Self {
            display_name: record.display_name.clone(),
            phone_number: record.phone_number.clone(),
            address: record.address.clone(),
        }
    }

    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    #[must_use]
    pub fn with_phone_number(mut self, phone_number: impl Into<String>) -> Self {
        self.phone_number = phone_number.into();
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawTimestamp>::deserialize(deserializer)?;
    Ok(raw.and_then(|raw| match raw {
        RawTimestamp::Text(text) => parse_timestamp(&text),
        RawTimestamp::Millis(millis) => Utc.timestamp_millis_opt(millis).single(),
    }))
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_rfc2822(text))
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}
