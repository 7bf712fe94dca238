//! Joke repository on top of a [`DocumentStore`].
//!
//! Loads the whole collection for list and random operations and forwards
//! revision tokens to the store on writes.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

use super::DocumentStore;
use crate::errors::AppError;
use crate::models::{is_system_id, Joke, NewJoke, UpdateJokeRequest, WriteResult};

/// Repository for joke documents.
pub struct JokeRepository {
    store: Arc<dyn DocumentStore>,
    /// Id handed out by the previous random pick. Local to this instance.
    last_random_id: Mutex<Option<String>>,
}

impl JokeRepository {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            last_random_id: Mutex::new(None),
        }
    }

    /// List all jokes in store order, without system documents.
    pub async fn list_jokes(&self) -> Result<Vec<Joke>, AppError> {
        let docs = self.store.list().await?;
        Ok(docs.into_iter().filter_map(decode_listed).collect())
    }

    /// Get a joke by ID.
    pub async fn get_joke(&self, id: &str) -> Result<Option<Joke>, AppError> {
        if is_system_id(id) {
            return Ok(None);
        }

        match self.store.get(id).await? {
            Some(doc) => Ok(Some(Joke::from_document(doc)?)),
            None => Ok(None),
        }
    }

    /// Pick a random joke, never the same one twice in a row when there is a choice.
    pub async fn random_joke(&self) -> Result<Option<Joke>, AppError> {
        let jokes = self.list_jokes().await?;

        let mut last = self.last_random_id.lock();
        let picked = pick_random(&jokes, last.as_deref(), &mut rand::thread_rng()).cloned();
        if let Some(joke) = &picked {
            *last = Some(joke.id.clone());
        }

        Ok(picked)
    }

    /// Create a new joke; the store assigns id and revision.
    pub async fn create_joke(&self, joke: &NewJoke) -> Result<WriteResult, AppError> {
        self.store.insert(serde_json::to_value(joke)?).await
    }

    /// Update a joke by merging `changes` onto a fresh read of the document.
    ///
    /// The revision always comes from that read, so a concurrent writer landing
    /// between read and write surfaces as [`AppError::Conflict`] from the store.
    pub async fn update_joke(
        &self,
        id: &str,
        changes: &UpdateJokeRequest,
    ) -> Result<WriteResult, AppError> {
        let not_found = || AppError::NotFound(format!("Joke {} not found", id));

        if is_system_id(id) {
            return Err(not_found());
        }

        let existing = self.store.get(id).await?.ok_or_else(not_found)?;
        let current = Joke::from_document(existing.clone())?;
        let Value::Object(mut doc) = existing else {
            return Err(AppError::Store(format!("Document {} is not an object", id)));
        };

        // Rewrite legacy bodies to setup/punchline so the merge below sticks
        doc.remove("joke");
        doc.insert("setup".into(), Value::String(current.setup));
        doc.insert("punchline".into(), Value::String(current.punchline));

        changes.apply_to(&mut doc);
        doc.insert("_id".into(), Value::String(id.to_string()));

        self.store.insert(Value::Object(doc)).await
    }
}

/// Uniform pick over `jokes`, redrawing while it lands on `last`.
///
/// Falls back to a plain draw when every entry carries the `last` id.
pub fn pick_random<'a, R: Rng + ?Sized>(
    jokes: &'a [Joke],
    last: Option<&str>,
    rng: &mut R,
) -> Option<&'a Joke> {
    if jokes.len() <= 1 {
        return jokes.first();
    }

    let differs = |joke: &Joke| Some(joke.id.as_str()) != last;
    if !jokes.iter().any(differs) {
        return jokes.choose(rng);
    }

    loop {
        let candidate = jokes.choose(rng)?;
        if differs(candidate) {
            return Some(candidate);
        }
    }
}

fn decode_listed(doc: Value) -> Option<Joke> {
    let id = doc.get("_id").and_then(Value::as_str).unwrap_or_default();
    if is_system_id(id) {
        return None;
    }

    let id = id.to_string();
    match Joke::from_document(doc) {
        Ok(joke) => Some(joke),
        Err(e) => {
            tracing::warn!("Skipping document {} with unknown shape: {}", id, e);
            None
        }
    }
}
