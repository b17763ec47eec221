//! Infrastructure availability lookup.
//!
//! Callers depend on [`InfrastructureProvider`] only. The bundled
//! [`RandomInfrastructureProvider`] fabricates plausible availability from the
//! district and province and is meant for demos and tests; a provider backed by
//! real network inventory can replace it without touching the qualification code.

use anyhow::Result;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::db::Location;

/// Districts treated as urban for fiber probability and 5G coverage
pub const URBAN_DISTRICTS: [&str; 5] = ["Colombo", "Gampaha", "Kandy", "Galle", "Matara"];

/// Every fiber speed the generator can report
pub const FIBER_SPEEDS: [&str; 2] = ["100 Mbps", "50 Mbps"];

const FIBER_PROBABILITY_URBAN: f64 = 0.8;
const FIBER_PROBABILITY_RURAL: f64 = 0.3;
const ADSL_PROBABILITY: f64 = 0.85;

/// Monthly fees in LKR
const FIBER_FEE_WESTERN: u32 = 4500;
const FIBER_FEE_OTHER: u32 = 3500;
const ADSL_FEE: u32 = 2500;
const MOBILE_FEE: u32 = 1500;

const ADSL_MAX_SPEED: &str = "16 Mbps";

/// Access technologies a customer can be qualified for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Technology {
    Fiber,
    #[serde(rename = "ADSL")]
    Adsl,
    Mobile,
}

impl Technology {
    pub const ALL: [Technology; 3] = [Technology::Fiber, Technology::Adsl, Technology::Mobile];

    pub fn as_str(&self) -> &'static str {
        match self {
            Technology::Fiber => "Fiber",
            Technology::Adsl => "ADSL",
            Technology::Mobile => "Mobile",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "fiber" | "fibre" => Some(Technology::Fiber),
            "adsl" => Some(Technology::Adsl),
            "mobile" => Some(Technology::Mobile),
            _ => None,
        }
    }
}

impl std::fmt::Display for Technology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineQuality {
    Excellent,
    Good,
    Fair,
}

impl LineQuality {
    pub const ALL: [LineQuality; 3] = [
        LineQuality::Excellent,
        LineQuality::Good,
        LineQuality::Fair,
    ];
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiberAvailability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_fee: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdslAvailability {
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_quality: Option<LineQuality>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_fee: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileAvailability {
    pub available: bool,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_fee: Option<u32>,
}

/// Availability of each access technology at one location
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Infrastructure {
    pub fiber: FiberAvailability,
    pub adsl: AdslAvailability,
    pub mobile: MobileAvailability,
}

impl Infrastructure {
    pub fn is_available(&self, technology: Technology) -> bool {
        match technology {
            Technology::Fiber => self.fiber.available,
            Technology::Adsl => self.adsl.available,
            Technology::Mobile => self.mobile.available,
        }
    }

    /// Available technologies in fixed Fiber, ADSL, Mobile order
    pub fn available_technologies(&self) -> Vec<Technology> {
        Technology::ALL
            .into_iter()
            .filter(|t| self.is_available(*t))
            .collect()
    }

    pub fn monthly_fee(&self, technology: Technology) -> Option<u32> {
        match technology {
            Technology::Fiber => self.fiber.monthly_fee,
            Technology::Adsl => self.adsl.monthly_fee,
            Technology::Mobile => self.mobile.monthly_fee,
        }
    }

    pub fn max_speed(&self, technology: Technology) -> Option<String> {
        match technology {
            Technology::Fiber => self.fiber.max_speed.clone(),
            Technology::Adsl => self.adsl.max_speed.clone(),
            Technology::Mobile => self.mobile.technologies.last().cloned(),
        }
    }
}

/// Source of infrastructure availability for a location
#[async_trait]
pub trait InfrastructureProvider: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    async fn availability(&self, location: &Location) -> Result<Infrastructure>;
}

/// Randomized stand-in for a real network inventory lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomInfrastructureProvider;

#[async_trait]
impl InfrastructureProvider for RandomInfrastructureProvider {
    fn name(&self) -> &'static str {
        "random"
    }

    async fn availability(&self, location: &Location) -> Result<Infrastructure> {
        Ok(generate(location, &mut rand::rng()))
    }
}

pub fn is_urban_district(district: &str) -> bool {
    let district = district.trim();
    URBAN_DISTRICTS
        .iter()
        .any(|urban| urban.eq_ignore_ascii_case(district))
}

fn is_western_province(province: &str) -> bool {
    province.trim().eq_ignore_ascii_case("Western")
}

/// Draw an availability profile for `location` from `rng`.
pub fn generate<R: Rng + ?Sized>(location: &Location, rng: &mut R) -> Infrastructure {
    let urban = is_urban_district(&location.district);

    let fiber_probability = if urban {
        FIBER_PROBABILITY_URBAN
    } else {
        FIBER_PROBABILITY_RURAL
    };
    let fiber = if rng.random_bool(fiber_probability) {
        let (speed, fee) = if is_western_province(&location.province) {
            (FIBER_SPEEDS[0], FIBER_FEE_WESTERN)
        } else {
            (FIBER_SPEEDS[1], FIBER_FEE_OTHER)
        };
        FiberAvailability {
            available: true,
            max_speed: Some(speed.to_string()),
            monthly_fee: Some(fee),
        }
    } else {
        FiberAvailability {
            available: false,
            max_speed: None,
            monthly_fee: None,
        }
    };

    let adsl = if rng.random_bool(ADSL_PROBABILITY) {
        AdslAvailability {
            available: true,
            line_quality: LineQuality::ALL.choose(rng).copied(),
            max_speed: Some(ADSL_MAX_SPEED.to_string()),
            monthly_fee: Some(ADSL_FEE),
        }
    } else {
        AdslAvailability {
            available: false,
            line_quality: None,
            max_speed: None,
            monthly_fee: None,
        }
    };

    let technologies = if urban {
        vec!["4G".to_string(), "5G".to_string()]
    } else {
        vec!["4G".to_string()]
    };
    let mobile = MobileAvailability {
        available: true,
        technologies,
        monthly_fee: Some(MOBILE_FEE),
    };

    Infrastructure {
        fiber,
        adsl,
        mobile,
    }
}
