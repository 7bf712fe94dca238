//! Joke model and the document shapes it is decoded from.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Id prefix of store-internal design documents.
pub const SYSTEM_ID_PREFIX: &str = "_design/";

/// Setup used when a legacy joke has no question to split on.
pub const LEGACY_DEFAULT_SETUP: &str = "Here's a joke:";

/// Returns true for store-internal documents that must never surface as jokes.
pub fn is_system_id(id: &str) -> bool {
    id.starts_with(SYSTEM_ID_PREFIX)
}

/// A joke as stored and served.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "JokeDocument")]
pub struct Joke {
    #[serde(rename = "_id")]
    pub id: String,
    /// Opaque revision token, forwarded to the store and never interpreted
    #[serde(rename = "_rev")]
    pub rev: String,
    pub setup: String,
    pub punchline: String,
    #[serde(rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Joke {
    /// Decode a raw store document, normalizing the legacy single-field shape.
    pub fn from_document(doc: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(doc)
    }
}

/// Raw document as read from the store.
#[derive(Debug, Deserialize)]
struct JokeDocument {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_rev")]
    rev: String,
    #[serde(rename = "createdAt", default)]
    created_at: Option<String>,
    #[serde(flatten)]
    content: JokeContent,
}

/// Either the current `{setup, punchline}` body or the legacy `{joke}` body.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum JokeContent {
    SetupPunchline { setup: String, punchline: String },
    Legacy { joke: String },
}

impl From<JokeDocument> for Joke {
    fn from(doc: JokeDocument) -> Self {
        let (setup, punchline) = match doc.content {
            JokeContent::SetupPunchline { setup, punchline } => (setup, punchline),
            JokeContent::Legacy { joke } => split_legacy(&joke),
        };

        Joke {
            id: doc.id,
            rev: doc.rev,
            setup,
            punchline,
            created_at: doc.created_at,
        }
    }
}

/// Split a legacy one-line joke at its first question mark.
pub fn split_legacy(text: &str) -> (String, String) {
    match text.split_once('?') {
        Some((setup, punchline)) => (format!("{}?", setup.trim()), punchline.trim().to_string()),
        None => (LEGACY_DEFAULT_SETUP.to_string(), text.to_string()),
    }
}

/// Request body for creating a new joke.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJokeRequest {
    #[serde(default)]
    pub setup: String,
    #[serde(default)]
    pub punchline: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Validated joke ready to be written; the store assigns `_id` and `_rev`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJoke {
    pub setup: String,
    pub punchline: String,
    pub created_at: String,
}

/// Request body for updating an existing joke. Absent fields are left alone.
///
/// `createdAt` is fixed at creation; a client-sent value is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJokeRequest {
    #[serde(default)]
    pub setup: Option<String>,
    #[serde(default)]
    pub punchline: Option<String>,
}

impl UpdateJokeRequest {
    /// Overlay the supplied fields onto a document body.
    pub fn apply_to(&self, doc: &mut Map<String, Value>) {
        if let Some(setup) = &self.setup {
            doc.insert("setup".into(), Value::String(setup.clone()));
        }
        if let Some(punchline) = &self.punchline {
            doc.insert("punchline".into(), Value::String(punchline.clone()));
        }
    }
}

/// Store acknowledgement of a write.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WriteResult {
    pub id: String,
    pub rev: String,
}

/// Response body for a successful update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResult {
    pub ok: bool,
    pub id: String,
    pub rev: String,
}

impl From<WriteResult> for UpdateResult {
    fn from(result: WriteResult) -> Self {
        Self {
            ok: true,
            id: result.id,
            rev: result.rev,
        }
    }
}
