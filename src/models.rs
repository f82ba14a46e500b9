use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Tracking API lookup response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingResult {
    #[serde(rename = "objetos", deserialize_with = "null_default_seq")]
    pub objects: Vec<TrackedObject>,
}

/// One tracked parcel and its events, newest first as returned by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackedObject {
    #[serde(rename = "codObjeto", deserialize_with = "null_default")]
    pub code: String,
    #[serde(rename = "eventos", deserialize_with = "null_default_seq")]
    pub events: Vec<TrackingEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingEvent {
    #[serde(rename = "codigo", deserialize_with = "null_default")]
    pub code: String,
    #[serde(rename = "tipo", deserialize_with = "null_default")]
    pub kind: String,
    #[serde(rename = "descricao", deserialize_with = "null_default")]
    pub description: String,
    #[serde(rename = "dtHrCriado", deserialize_with = "null_default")]
    pub created: String,
    #[serde(rename = "unidade", deserialize_with = "null_default")]
    pub facility: Facility,
}

/// Routing or processing location attached to an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Facility {
    #[serde(rename = "nome", deserialize_with = "null_default")]
    pub name: String,
    #[serde(rename = "codSro", deserialize_with = "null_default")]
    pub sro_code: String,
    #[serde(rename = "codMcu", deserialize_with = "null_default")]
    pub mcu_code: String,
    /// Federative unit (state) code
    #[serde(rename = "se", deserialize_with = "null_default")]
    pub state: String,
}

/// Acknowledgement of an asynchronous batch registration.
///
/// `receipt` is the only link to the eventual [`TrackingResult`]; pass it to
/// `TrackingClient::fetch_receipt` once the batch has been processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AsyncRegistration {
    #[serde(deserialize_with = "null_default")]
    pub user: String,
    #[serde(rename = "numero", deserialize_with = "null_default")]
    pub receipt: String,
    #[serde(rename = "dtCriacao", deserialize_with = "null_default")]
    pub created: String,
    #[serde(rename = "dtValidade", deserialize_with = "null_default")]
    pub expires: String,
    #[serde(rename = "qtdObjetos", deserialize_with = "null_default")]
    pub object_count: u32,
    #[serde(rename = "resultado", deserialize_with = "null_default")]
    pub status: String,
    #[serde(rename = "idioma", deserialize_with = "null_default")]
    pub language: String,
}

/// The API sends `null` for absent values; treat it like a missing field.
fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Like [`null_default`], also for `null` entries inside the sequence.
fn null_default_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    let items = Option::<Vec<Option<T>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(items.into_iter().map(Option::unwrap_or_default).collect())
}

impl TrackedObject {
    pub fn last_event(&self) -> Option<&TrackingEvent> {
        self.events.first()
    }
}

impl TrackingEvent {
    /// Event timestamp, `None` when the API sent something other than `YYYY-MM-DDTHH:MM:SS`.
    pub fn created_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.created)
    }
}

impl AsyncRegistration {
    pub fn expires_at(&self) -> Option<NaiveDateTime> {
        parse_timestamp(&self.expires)
    }
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, TIMESTAMP_FORMAT).ok()
}

/// Which events a lookup returns, sent as the `resultado` query parameter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultFilter {
    /// Full history (`T`)
    All,
    /// Last event only (`U`)
    #[default]
    Last,
    /// First event only (`P`)
    First,
}

impl ResultFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultFilter::All => "T",
            ResultFilter::Last => "U",
            ResultFilter::First => "P",
        }
    }
}

impl fmt::Display for ResultFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResultFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "T" => Ok(ResultFilter::All),
            "U" => Ok(ResultFilter::Last),
            "P" => Ok(ResultFilter::First),
            other => Err(format!("unknown result filter '{other}', expected T, U or P")),
        }
    }
}
