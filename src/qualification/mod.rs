//! Builds TMF679 qualification records from a request and an availability profile.

use anyhow::Result;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::db::{
    now_timestamp, Alternative, Location, Note, QualificationRecord, QualificationResult,
    QualificationState, RelatedParty,
};
use crate::infrastructure::{is_urban_district, Infrastructure, InfrastructureProvider, Technology};
use crate::sync::note::{
    location_note_text, AREA_MATCH_PREFIX, INFRASTRUCTURE_PREFIX, SERVICES_PREFIX,
};

const CURRENCY: &str = "LKR";

/// Body of `POST /checkProductOfferingQualification`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualificationRequest {
    #[serde(default)]
    pub requested_services: Vec<String>,
    pub location: Location,
    #[serde(default = "default_provide_alternatives")]
    pub provide_alternatives: bool,
    #[serde(default)]
    pub related_party: Vec<RelatedParty>,
    #[serde(default)]
    pub note: Vec<Note>,
}

fn default_provide_alternatives() -> bool {
    true
}

/// Decide the overall result.
///
/// An exact match between a requested service and an available technology
/// qualifies; any availability at all is conditional; otherwise unqualified.
pub fn determine_result(
    requested: &[Technology],
    infrastructure: &Infrastructure,
) -> QualificationResult {
    if requested.iter().any(|t| infrastructure.is_available(*t)) {
        QualificationResult::Qualified
    } else if !infrastructure.available_technologies().is_empty() {
        QualificationResult::Conditional
    } else {
        QualificationResult::Unqualified
    }
}

/// Available technologies that were not requested, with their pricing
pub fn alternatives(requested: &[Technology], infrastructure: &Infrastructure) -> Vec<Alternative> {
    infrastructure
        .available_technologies()
        .into_iter()
        .filter(|t| !requested.contains(t))
        .filter_map(|service| {
            Some(Alternative {
                service,
                monthly_fee: infrastructure.monthly_fee(service)?,
                currency: CURRENCY.to_string(),
                max_speed: infrastructure.max_speed(service),
            })
        })
        .collect()
}

fn requested_technologies(services: &[String]) -> Vec<Technology> {
    let mut technologies = Vec::new();
    for service in services {
        if let Some(t) = Technology::from_str(service) {
            if !technologies.contains(&t) {
                technologies.push(t);
            }
        }
    }
    technologies
}

fn system_note(text: String, date: &str) -> Note {
    Note {
        text,
        author: Some("system".to_string()),
        date: Some(date.to_string()),
    }
}

/// Assemble the record. Caller-supplied notes come first, followed by the
/// `SLT_LOCATION`, `SLT_SERVICES`, `SLT_INFRASTRUCTURE` and `SLT_AREA_MATCH` notes.
pub fn build(
    request: &QualificationRequest,
    infrastructure: Infrastructure,
) -> Result<QualificationRecord> {
    let id = Uuid::new_v4().to_string();
    let now = now_timestamp();
    let requested = requested_technologies(&request.requested_services);
    let result = determine_result(&requested, &infrastructure);

    let alternatives = if request.provide_alternatives {
        alternatives(&requested, &infrastructure)
    } else {
        Vec::new()
    };

    let location = &request.location;
    let mut note = request.note.clone();
    note.push(system_note(location_note_text(location), &now));
    note.push(system_note(
        format!(
            "{}{}",
            SERVICES_PREFIX,
            serde_json::to_string(&request.requested_services)?
        ),
        &now,
    ));
    note.push(system_note(
        format!(
            "{}{}",
            INFRASTRUCTURE_PREFIX,
            serde_json::to_string(&infrastructure)?
        ),
        &now,
    ));
    note.push(system_note(
        format!(
            "{}{}",
            AREA_MATCH_PREFIX,
            json!({
                "district": location.district,
                "province": location.province,
                "isUrban": is_urban_district(&location.district),
            })
        ),
        &now,
    ));

    Ok(QualificationRecord {
        href: QualificationRecord::href_for(&id),
        id,
        state: QualificationState::Done,
        creation_date: now,
        qualification_result: Some(result),
        location: Some(location.clone()),
        infrastructure: Some(infrastructure),
        requested_services: request.requested_services.clone(),
        alternatives,
        note,
        related_party: request.related_party.clone(),
        at_type: "CheckProductOfferingQualification".to_string(),
    })
}

/// Look up availability through `provider` and build the record.
pub async fn evaluate(
    provider: &dyn InfrastructureProvider,
    request: &QualificationRequest,
) -> Result<QualificationRecord> {
    let infrastructure = provider.availability(&request.location).await?;

    tracing::debug!(
        provider = provider.name(),
        district = %request.location.district,
        available = ?infrastructure.available_technologies(),
        "Infrastructure availability resolved"
    );

    build(request, infrastructure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{AdslAvailability, FiberAvailability, MobileAvailability};
    use crate::sync::note::parse_location_note;

    fn infrastructure(fiber: bool, adsl: bool, mobile: bool) -> Infrastructure {
        Infrastructure {
            fiber: FiberAvailability {
                available: fiber,
                max_speed: fiber.then(|| "100 Mbps".to_string()),
                monthly_fee: fiber.then_some(4500),
            },
            adsl: AdslAvailability {
                available: adsl,
                line_quality: None,
                max_speed: adsl.then(|| "16 Mbps".to_string()),
                monthly_fee: adsl.then_some(2500),
            },
            mobile: MobileAvailability {
                available: mobile,
                technologies: if mobile { vec!["4G".to_string()] } else { vec![] },
                monthly_fee: mobile.then_some(1500),
            },
        }
    }

    fn request(services: &[&str], provide_alternatives: bool) -> QualificationRequest {
        QualificationRequest {
            requested_services: services.iter().map(|s| s.to_string()).collect(),
            location: Location {
                address: "12 Main St".to_string(),
                district: "Kandy".to_string(),
                province: "Central".to_string(),
                postal_code: Some("20000".to_string()),
            },
            provide_alternatives,
            related_party: vec![],
            note: vec![],
        }
    }

    #[test]
    fn test_result_qualified_on_exact_match() {
        let infra = infrastructure(true, false, true);
        assert_eq!(
            determine_result(&[Technology::Fiber], &infra),
            QualificationResult::Qualified
        );
    }

    #[test]
    fn test_result_conditional_when_only_other_technologies() {
        let infra = infrastructure(false, false, true);
        assert_eq!(
            determine_result(&[Technology::Fiber], &infra),
            QualificationResult::Conditional
        );
        assert_eq!(determine_result(&[], &infra), QualificationResult::Conditional);
    }

    #[test]
    fn test_result_unqualified_when_nothing_available() {
        let infra = infrastructure(false, false, false);
        assert_eq!(
            determine_result(&[Technology::Adsl], &infra),
            QualificationResult::Unqualified
        );
    }

    #[test]
    fn test_alternatives_exclude_requested() {
        let infra = infrastructure(true, true, true);
        let alts = alternatives(&[Technology::Fiber], &infra);
        let services: Vec<_> = alts.iter().map(|a| a.service).collect();
        assert_eq!(services, vec![Technology::Adsl, Technology::Mobile]);
        assert!(alts.iter().all(|a| a.currency == "LKR"));
        assert_eq!(alts[0].monthly_fee, 2500);
    }

    #[test]
    fn test_build_record_shape() {
        let req = request(&["fibre", "Satellite"], true);
        let record = build(&req, infrastructure(true, true, true)).unwrap();

        assert_eq!(record.state, QualificationState::Done);
        assert_eq!(record.qualification_result, Some(QualificationResult::Qualified));
        assert!(record.href.ends_with(&record.id));
        assert_eq!(record.alternatives.len(), 2);
        assert_eq!(record.note.len(), 4);

        let prefixes = ["SLT_LOCATION:", "SLT_SERVICES:", "SLT_INFRASTRUCTURE:", "SLT_AREA_MATCH:"];
        for (note, prefix) in record.note.iter().zip(prefixes) {
            assert!(note.text.starts_with(prefix), "{}", note.text);
        }
        assert!(record.note[3].text.contains("\"isUrban\":true"));

        let address = parse_location_note(&record.note).unwrap();
        assert_eq!(address.street, "12 Main St");
        assert_eq!(address.postal_code, "20000");
    }

    #[test]
    fn test_build_without_alternatives_keeps_caller_notes_first() {
        let mut req = request(&["Mobile"], false);
        req.note.push(Note {
            text: "walk-in customer".to_string(),
            author: Some("agent".to_string()),
            date: None,
        });

        let record = build(&req, infrastructure(true, true, true)).unwrap();
        assert!(record.alternatives.is_empty());
        assert_eq!(record.note[0].text, "walk-in customer");
        assert_eq!(record.note.len(), 5);
    }

    #[test]
    fn test_request_defaults() {
        let req: QualificationRequest = serde_json::from_str(
            r#"{"location":{"address":"a","district":"Jaffna","province":"Northern"}}"#,
        )
        .unwrap();
        assert!(req.provide_alternatives);
        assert!(req.requested_services.is_empty());
        assert!(req.location.postal_code.is_none());
    }
}
