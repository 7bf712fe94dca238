//! One-off maintenance commands run from the CLI.
//!
//! `seed` inserts the sample joke, `migrate` rewrites legacy `{joke}`
//! documents into the `{setup, punchline}` shape.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::{is_system_id, split_legacy};

/// Fixed id of the sample joke.
pub const SAMPLE_JOKE_ID: &str = "sample-joke";

/// Hand-written splits for known legacy jokes.
const KNOWN_CONVERSIONS: &[(&str, &str, &str)] = &[
    (
        SAMPLE_JOKE_ID,
        "Why did the scarecrow win an award?",
        "Because he was outstanding in his field.",
    ),
    (
        "programmer-joke",
        "Why did the programmer quit his job?",
        "Because he didn't get arrays.",
    ),
];

/// Result of a seed run.
#[derive(Debug, PartialEq, Eq)]
pub enum SeedOutcome {
    Inserted,
    AlreadyPresent,
}

/// Insert the sample joke unless it is already there.
pub async fn seed_sample(store: &dyn DocumentStore) -> Result<SeedOutcome, AppError> {
    let (_, setup, punchline) = KNOWN_CONVERSIONS[0];
    let doc = json!({
        "_id": SAMPLE_JOKE_ID,
        "setup": setup,
        "punchline": punchline,
        "createdAt": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });

    match store.insert(doc).await {
        Ok(_) => {
            tracing::info!("Inserted sample joke");
            Ok(SeedOutcome::Inserted)
        }
        Err(AppError::Conflict(_)) => {
            tracing::info!("Sample joke already exists");
            Ok(SeedOutcome::AlreadyPresent)
        }
        Err(e) => Err(e),
    }
}

/// Counters reported by [`migrate_legacy`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Rewrite every legacy joke document into the current shape.
///
/// Failures on single documents are logged and counted, they do not stop the run.
pub async fn migrate_legacy(store: &dyn DocumentStore) -> Result<MigrationReport, AppError> {
    let docs = store.list().await?;
    let mut report = MigrationReport::default();

    for doc in docs {
        let Value::Object(doc) = doc else {
            report.skipped += 1;
            continue;
        };
        let id = doc
            .get("_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if is_system_id(&id) {
            continue;
        }

        let Some(converted) = convert_legacy(&id, &doc) else {
            tracing::debug!("Joke {} needs no conversion", id);
            report.skipped += 1;
            continue;
        };

        match store.insert(Value::Object(converted)).await {
            Ok(result) => {
                tracing::info!("Converted joke {} (rev {})", id, result.rev);
                report.converted += 1;
            }
            Err(e) => {
                tracing::warn!("Failed to convert joke {}: {}", id, e);
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// New body for a legacy document, or `None` when it has nothing to convert.
fn convert_legacy(id: &str, doc: &Map<String, Value>) -> Option<Map<String, Value>> {
    let non_empty = |key: &str| {
        doc.get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    };

    if non_empty("setup").is_some() && non_empty("punchline").is_some() {
        return None;
    }
    let text = non_empty("joke")?;

    let (setup, punchline) = KNOWN_CONVERSIONS
        .iter()
        .find(|(known, _, _)| *known == id)
        .map(|(_, setup, punchline)| (setup.to_string(), punchline.to_string()))
        .unwrap_or_else(|| split_legacy(text));

    let mut converted = Map::new();
    converted.insert("_id".into(), Value::String(id.to_string()));
    if let Some(rev) = doc.get("_rev") {
        converted.insert("_rev".into(), rev.clone());
    }
    converted.insert("setup".into(), Value::String(setup));
    converted.insert("punchline".into(), Value::String(punchline));
    if let Some(created_at) = doc.get("createdAt") {
        converted.insert("createdAt".into(), created_at.clone());
    }

    Some(converted)
}
