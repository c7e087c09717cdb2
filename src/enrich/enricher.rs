//! Resolves an event's reference ids against the stored dictionaries

use crate::dictionary::{DatabaseId, DatabaseNames, DictionaryKind, DictionarySnapshot};
use crate::enrich::decode::{
    decode_offset, decode_session_parameters, decode_transaction, resolve_reference,
    resolve_references,
};
use crate::enrich::event::{EventRecord, field_text, fields};
use crate::logging::Timer;
use crate::storage::DictionaryStore;
use serde_json::Value;

/// Single-reference fields: (raw id field, resolved field, dictionary)
const REFERENCE_FIELDS: [(&str, &str, DictionaryKind); 8] = [
    (fields::USER_ID, fields::USER, DictionaryKind::User),
    (fields::COMPUTER_ID, fields::COMPUTER, DictionaryKind::Computer),
    (fields::APPLICATION_ID, fields::APPLICATION, DictionaryKind::Application),
    (fields::EVENT_ID, fields::EVENT, DictionaryKind::Event),
    (fields::METADATA_ID, fields::METADATA, DictionaryKind::Metadata),
    (fields::WORK_SERVER_ID, fields::WORK_SERVER, DictionaryKind::Server),
    (fields::PRIMARY_PORT_ID, fields::PRIMARY_PORT, DictionaryKind::PrimaryPort),
    (fields::SECONDARY_PORT_ID, fields::SECONDARY_PORT, DictionaryKind::SecondaryPort),
];

/// Event enricher
///
/// Loads fresh dictionaries from the store for every event and never writes
/// to it. Missing dictionaries degrade to pass-through resolution.
#[derive(Clone)]
pub struct Enricher {
    store: DictionaryStore,
}

impl Enricher {
    pub fn new(store: DictionaryStore) -> Self {
        Self { store }
    }

    /// Resolve every reference field of `event` in place
    pub async fn enrich<E>(&self, event: &mut E)
    where
        E: EventRecord + Send + ?Sized,
    {
        let database = event.get_field(fields::DATABASE).and_then(field_text);
        let _timer = Timer::new("enrich", database.as_deref().unwrap_or("-"));

        let (names, dictionaries) = match &database {
            Some(id) => {
                let id = DatabaseId::new(id.clone());
                tokio::join!(
                    self.store.load_database_names(),
                    self.store.load_snapshot(&id)
                )
            }
            None => {
                tracing::warn!("Event has no Database field, resolving ids as-is");
                (
                    self.store.load_database_names().await,
                    DictionarySnapshot::default(),
                )
            }
        };

        apply_dictionaries(event, &names, &dictionaries);
    }
}

/// Rewrite the designated fields of `event` using already loaded dictionaries
pub fn apply_dictionaries<E>(event: &mut E, names: &DatabaseNames, dictionaries: &DictionarySnapshot)
where
    E: EventRecord + ?Sized,
{
    if let Some(database) = event.get_field(fields::DATABASE).and_then(field_text) {
        let display = names.get(&database).cloned().unwrap_or(database);
        event.set_field(fields::DATABASE, Value::String(display));
    }

    for (raw_field, resolved_field, kind) in REFERENCE_FIELDS {
        let raw = event.get_field(raw_field).and_then(field_text);
        let resolved = resolve_reference(raw.as_deref(), dictionaries.get(kind));
        tracing::trace!(field = resolved_field, raw = ?raw, resolved = ?resolved, "Resolved reference");
        event.set_field(resolved_field, resolved.map_or(Value::Null, Value::String));
    }

    let count = event.get_field(fields::MORE_METADATA).and_then(field_text);
    let ids = event.get_field(fields::MORE_METADATA_ARRAY).and_then(field_text);
    let more_metadata = resolve_references(count.as_deref(), ids.as_deref(), &dictionaries.metadata);
    event.set_field(
        fields::MORE_METADATA,
        more_metadata.map_or(Value::Null, |ids| {
            Value::Array(ids.into_iter().map(Value::String).collect())
        }),
    );

    let transaction = transaction_value(event);
    event.set_field(fields::TRANSACTION, transaction);

    let offset = match event.get_field(fields::TRANSACTION_START_OFFSET) {
        Some(raw) => match decode_offset(raw) {
            Ok(offset) => offset.map_or(Value::Null, Value::from),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to decode transaction start offset");
                Value::Null
            }
        },
        None => Value::Null,
    };
    event.set_field(fields::TRANSACTION_START_OFFSET, offset);

    let session_parameters = event
        .get_field(fields::SESSION_PARAMETERS)
        .and_then(field_text)
        .map(|raw| {
            decode_session_parameters(
                &raw,
                &dictionaries.session_parameter,
                &dictionaries.session_parameters,
            )
        })
        .unwrap_or_default();
    event.set_field(
        fields::SESSION_PARAMETERS,
        Value::Array(session_parameters.into_iter().map(Value::String).collect()),
    );
}

fn transaction_value<E>(event: &E) -> Value
where
    E: EventRecord + ?Sized,
{
    let Some(raw) = event.get_field(fields::TRANSACTION) else {
        return Value::Null;
    };
    let timezone = event.get_field(fields::TIMEZONE).and_then(Value::as_str);

    match decode_transaction(raw, timezone) {
        Ok(Some(time)) => Value::String(time),
        Ok(None) => Value::Null,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to decode transaction time");
            Value::Null
        }
    }
}
