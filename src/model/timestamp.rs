use chrono::{DateTime, SecondsFormat, Utc};
use derive_more::{AsRef, Deref, From};
use derive_new::new;
use serde::{Deserialize, Serialize};

pub fn now() -> Timestamp {
    Utc::now().into()
}

/// A UTC instant stored as a fixed-width RFC 3339 string, so comparing the stored strings orders them by time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, new, From, Deref, AsRef)]
pub struct Timestamp(DateTime<Utc>);

impl Default for Timestamp {
    fn default() -> Self {
        now()
    }
}

impl Serialize for Timestamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| Self(dt.into()))
            .map_err(serde::de::Error::custom)
    }
}
