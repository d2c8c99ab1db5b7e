//! Itinerary payloads and the request/response shapes of the TripFlow API.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Opaque server-side identifier of a stored itinerary.
///
/// The server emits numeric ids; strings are accepted too so the client never
/// depends on the representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItineraryId(String);

impl ItineraryId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItineraryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ItineraryId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ItineraryId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Number(i64),
            Text(String),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Number(value) => Ok(Self(value.to_string())),
            RawId::Text(value) => Ok(Self(value)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Itinerary {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItineraryId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// `None` when the generator produced no day list at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<DayPlan>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayPlan {
    #[serde(default, deserialize_with = "null_as_default")]
    pub day_title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub spots: Vec<Spot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spot {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub time: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
}

/// A stored generation, as listed in the history and saved panels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItineraryEntry {
    pub id: ItineraryId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub days: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: Itinerary,
}

impl ItineraryEntry {
    #[must_use]
    pub fn summary(&self) -> String {
        format!("{} · {}-day trip", self.city, self.days)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CurrentUserResponse {
    #[serde(default)]
    pub is_logged_in: bool,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub city: String,
    pub days: u32,
    pub preferences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub success: bool,
    /// Absent for guests: only signed-in generations are persisted.
    #[serde(default)]
    pub id: Option<ItineraryId>,
    #[serde(default)]
    pub data: Option<Itinerary>,
    #[serde(default)]
    pub error: Option<String>,
}

/// `{success, message?}` acknowledgement shared by the write endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl AckResponse {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            success: true,
            ..Self::default()
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            username: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryListResponse {
    #[serde(default)]
    pub history: Vec<ItineraryEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SavedListResponse {
    #[serde(default)]
    pub saved: Vec<ItineraryEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SendCodeRequest {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub code: String,
}

/// Stored itineraries are raw generator output, where any field may be `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
