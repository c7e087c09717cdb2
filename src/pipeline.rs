//! Host-facing transforms: one event in, one event out

use crate::dictionary::{DatabaseId, DictionarySnapshot};
use crate::enrich::{Enricher, EventRecord, field_text, fields};
use crate::error::Result;
use crate::logging::log_error;
use crate::parser::parse_block;
use crate::storage::DictionaryStore;

/// Parse a dictionary block and replace the stored snapshot for `database`
pub async fn extract_and_persist(
    store: &DictionaryStore,
    database: &DatabaseId,
    block: &str,
) -> Result<DictionarySnapshot> {
    let snapshot = parse_block(database, block);
    store.persist(database, &snapshot).await?;
    Ok(snapshot)
}

/// The two stages, sharing nothing but the store
#[derive(Clone)]
pub struct Pipeline {
    store: DictionaryStore,
    enricher: Enricher,
}

impl Pipeline {
    pub fn new(store: DictionaryStore) -> Self {
        Self {
            enricher: Enricher::new(store.clone()),
            store,
        }
    }

    pub fn store(&self) -> &DictionaryStore {
        &self.store
    }

    /// Extraction stage for an event carrying a dictionary block in `message`
    ///
    /// The event is returned unchanged; failures are logged.
    pub async fn on_metadata_event<E>(&self, event: E) -> E
    where
        E: EventRecord + Send,
    {
        let database = event.get_field(fields::DATABASE).and_then(field_text);
        let block = event.get_field(fields::MESSAGE).and_then(|v| v.as_str());

        match (database, block) {
            (Some(database), Some(block)) => {
                let database = DatabaseId::new(database);
                if let Err(e) = extract_and_persist(&self.store, &database, block).await {
                    log_error("extract_and_persist", database.as_str(), &e);
                }
            }
            _ => tracing::warn!("Dictionary event without Database or message, skipping"),
        }
        event
    }

    /// Enrichment stage
    pub async fn on_event<E>(&self, mut event: E) -> E
    where
        E: EventRecord + Send,
    {
        self.enricher.enrich(&mut event).await;
        event
    }
}
