//! Common types and utilities shared across models.

use chrono::SecondsFormat;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A normalized postal address stored on a user record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub postal_code: String,
}

/// The location a qualification check was run against.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub district: String,
    #[serde(default)]
    pub province: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
}

impl Location {
    /// A location is usable only when address, district and province are all present.
    pub fn is_complete(&self) -> bool {
        !self.address.trim().is_empty()
            && !self.district.trim().is_empty()
            && !self.province.trim().is_empty()
    }

    /// Convert to a user address. The district doubles as the city.
    pub fn to_address(&self) -> Address {
        Address {
            street: self.address.clone(),
            city: self.district.clone(),
            district: self.district.clone(),
            province: self.province.clone(),
            postal_code: self.postal_code.clone().unwrap_or_default(),
        }
    }
}

/// Current time in the format used for every timestamp column.
///
/// Fixed sub-second precision keeps lexicographic ordering equal to
/// chronological ordering.
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Helper to parse a JSON array column, treating bad data as empty
pub fn parse_json_list<T: DeserializeOwned>(json: &str) -> Vec<T> {
    serde_json::from_str(json).unwrap_or_default()
}

/// Helper to parse an optional JSON object column
pub fn parse_json_opt<T: DeserializeOwned>(json: Option<&str>) -> Option<T> {
    json.and_then(|s| serde_json::from_str(s).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_to_address_uses_district_as_city() {
        let location = Location {
            address: "12 Main St".to_string(),
            district: "Kandy".to_string(),
            province: "Central".to_string(),
            postal_code: Some("20000".to_string()),
        };

        assert_eq!(
            location.to_address(),
            Address {
                street: "12 Main St".to_string(),
                city: "Kandy".to_string(),
                district: "Kandy".to_string(),
                province: "Central".to_string(),
                postal_code: "20000".to_string(),
            }
        );
    }

    #[test]
    fn test_location_completeness() {
        let mut location = Location {
            address: "1 Galle Rd".to_string(),
            district: "Colombo".to_string(),
            province: "Western".to_string(),
            postal_code: None,
        };
        assert!(location.is_complete());

        location.province = "  ".to_string();
        assert!(!location.is_complete());
    }

    #[test]
    fn test_timestamps_sort_chronologically() {
        let first = now_timestamp();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = now_timestamp();
        assert!(first < second);
        assert!(first.ends_with('Z'));
    }

    #[test]
    fn test_parse_json_list_tolerates_garbage() {
        let parsed: Vec<String> = parse_json_list("not json");
        assert!(parsed.is_empty());

        let parsed: Vec<String> = parse_json_list(r#"["a","b"]"#);
        assert_eq!(parsed, vec!["a", "b"]);
    }
}
