//! Location extraction from `SLT_LOCATION:` notes.
//!
//! Qualification records written before `location` became a structured column
//! only carry the location inside a free-text note. These helpers recover it.

use serde_json::Value;

use crate::db::{Address, Location, Note};

pub const LOCATION_PREFIX: &str = "SLT_LOCATION:";
pub const SERVICES_PREFIX: &str = "SLT_SERVICES:";
pub const INFRASTRUCTURE_PREFIX: &str = "SLT_INFRASTRUCTURE:";
pub const AREA_MATCH_PREFIX: &str = "SLT_AREA_MATCH:";

/// Text of the first note starting with `SLT_LOCATION:`, prefix stripped.
pub fn find_location_payload(notes: &[Note]) -> Option<&str> {
    notes
        .iter()
        .find_map(|note| note.text.strip_prefix(LOCATION_PREFIX))
}

/// Parse the first location note into an address.
///
/// Returns `None` when there is no location note, the payload is not JSON, or
/// any of `address`, `district`, `province` is missing or blank.
pub fn parse_location_note(notes: &[Note]) -> Option<Address> {
    parse_location_payload(find_location_payload(notes)?).map(|loc| loc.to_address())
}

pub fn parse_location_payload(payload: &str) -> Option<Location> {
    let value: Value = serde_json::from_str(payload.trim()).ok()?;
    let object = value.as_object()?;

    let text = |key: &str| -> Option<String> {
        match object.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            _ => None,
        }
    };

    // Postal codes are sometimes stored as numbers
    let postal_code = match object.get("postalCode") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    Some(Location {
        address: text("address")?,
        district: text("district")?,
        province: text("province")?,
        postal_code,
    })
}

/// Render a location as an `SLT_LOCATION:` note text
pub fn location_note_text(location: &Location) -> String {
    let mut payload = serde_json::json!({
        "address": location.address,
        "district": location.district,
        "province": location.province,
    });
    if let (Some(postal_code), Some(object)) = (&location.postal_code, payload.as_object_mut()) {
        object.insert("postalCode".to_string(), Value::String(postal_code.clone()));
    }
    format!("{}{}", LOCATION_PREFIX, payload)
}
