//! Decoders for reference ids and encoded event fields

use crate::dictionary::{SessionParameterValues, SimpleDictionary};
use crate::error::{OnecMapError, Result};
use chrono::DateTime;
use serde_json::Value;

/// Reference id meaning "no reference"
pub const NO_REFERENCE: &str = "0";

/// Seconds between 0001-01-01 and 1970-01-01
pub const UNIX_EPOCH_OFFSET_SECS: i64 = 62_135_596_800;

/// Divisor turning a `Transaction` value into seconds since 0001-01-01
pub const TRANSACTION_SCALE: u64 = 10_000;

/// Resolve one reference id: `"0"` is absent, unknown ids pass through
pub fn resolve_reference(raw: Option<&str>, dictionary: &SimpleDictionary) -> Option<String> {
    match raw {
        None | Some(NO_REFERENCE) => None,
        Some(id) => Some(dictionary.get(id).cloned().unwrap_or_else(|| id.to_string())),
    }
}

/// Resolve a comma-separated list of metadata ids, keeping their order
///
/// `count` is the companion sentinel field; `"0"` means there is no list.
pub fn resolve_references(
    count: Option<&str>,
    ids: Option<&str>,
    dictionary: &SimpleDictionary,
) -> Option<Vec<String>> {
    if count == Some(NO_REFERENCE) {
        return None;
    }

    let resolved = ids
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| dictionary.get(id).cloned().unwrap_or_else(|| id.to_string()))
        .collect();
    Some(resolved)
}

/// Parse a hexadecimal string or a non-negative JSON number
pub fn parse_hex_or_number(field: &str, value: &Value) -> Result<u64> {
    match value {
        Value::String(s) => u64::from_str_radix(s.trim(), 16)
            .map_err(|e| OnecMapError::invalid_field(field, format!("{s:?}: {e}"))),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| OnecMapError::invalid_field(field, format!("{n} is not a u64"))),
        other => Err(OnecMapError::invalid_field(
            field,
            format!("unexpected value {other}"),
        )),
    }
}

/// Decode a `Transaction` value into `YYYY-MM-DDTHH:MM:SS<timezone>`
///
/// The encoded value is local wall time stored as if it were UTC, so the UTC
/// designator is replaced with the event's own timezone offset.
pub fn decode_transaction(value: &Value, timezone: Option<&str>) -> Result<Option<String>> {
    let encoded = parse_hex_or_number("Transaction", value)?;
    if encoded == 0 {
        return Ok(None);
    }

    let secs = (encoded / TRANSACTION_SCALE) as i64 - UNIX_EPOCH_OFFSET_SECS;
    let time = DateTime::from_timestamp(secs, 0).ok_or_else(|| {
        OnecMapError::invalid_field("Transaction", format!("{secs} is out of range"))
    })?;

    Ok(Some(format!(
        "{}{}",
        time.format("%Y-%m-%dT%H:%M:%S"),
        timezone.unwrap_or_default()
    )))
}

/// Decode a `TransactionStartOffset` value; `0` is absent
pub fn decode_offset(value: &Value) -> Result<Option<u64>> {
    let offset = parse_hex_or_number("TransactionStartOffset", value)?;
    Ok((offset != 0).then_some(offset))
}

/// Decode `count,param,value,param,value,...` into display strings
pub fn decode_session_parameters(
    raw: &str,
    names: &SimpleDictionary,
    values: &SessionParameterValues,
) -> Vec<String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();

    let count: usize = match parts.first().map(|count| count.parse()) {
        Some(Ok(count)) => count,
        _ => {
            tracing::warn!(raw = %raw, "Invalid session parameter count");
            return Vec::new();
        }
    };

    let mut decoded = Vec::with_capacity(count);
    for pair in 0..count {
        let index = 1 + pair * 2;
        let (Some(param_id), Some(value_id)) = (parts.get(index), parts.get(index + 1)) else {
            tracing::warn!(
                raw = %raw,
                expected = count,
                decoded = pair,
                "Session parameter list is shorter than its count"
            );
            break;
        };
        decoded.push(describe_session_parameter(param_id, value_id, names, values));
    }
    decoded
}

fn describe_session_parameter(
    param_id: &str,
    value_id: &str,
    names: &SimpleDictionary,
    values: &SessionParameterValues,
) -> String {
    let Some(name) = names.get(param_id) else {
        return format!("[unknown parameter {param_id}]");
    };

    match values.get(param_id).and_then(|v| v.get(value_id)) {
        Some(value) => format!("{} ({}): {}", name, value.value_type, value.value),
        None => format!("{name}: [unknown value_id {value_id}]"),
    }
}
