//! Input validation for API requests.
//!
//! Validators return `Err(message)`; handlers collect them with
//! `ValidationErrorBuilder::check`.

use lazy_static::lazy_static;
use regex::Regex;

use crate::db::{Location, UserStatus};

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex");

    /// Sri Lankan numbers: 0XXXXXXXXX or +94XXXXXXXXX
    static ref PHONE_REGEX: Regex =
        Regex::new(r"^(\+94|0)[0-9]{9}$").expect("valid phone regex");
}

const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_email(email: &str) -> Result<(), String> {
    if email.trim().is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email.trim()) {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Empty numbers are allowed; anything else must be a Sri Lankan number.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let compact: String = phone.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
    if compact.is_empty() || PHONE_REGEX.is_match(&compact) {
        Ok(())
    } else {
        Err("Phone number must look like 0771234567 or +94771234567".to_string())
    }
}

pub fn validate_name(name: &str, label: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    if name.len() > 100 {
        return Err(format!("{} is too long (max 100 characters)", label));
    }
    Ok(())
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        ));
    }
    Ok(())
}

pub fn validate_status(status: &str) -> Result<(), String> {
    match UserStatus::from_str(status) {
        Some(_) => Ok(()),
        None => Err("Status must be one of unverified, active, pending".to_string()),
    }
}

/// Per-field errors for a qualification location, keyed by JSON path
pub fn validate_location(location: &Location) -> Vec<(&'static str, String)> {
    let mut errors = Vec::new();
    if location.address.trim().is_empty() {
        errors.push(("location.address", "Address is required".to_string()));
    }
    if location.district.trim().is_empty() {
        errors.push(("location.district", "District is required".to_string()));
    }
    if location.province.trim().is_empty() {
        errors.push(("location.province", "Province is required".to_string()));
    }
    errors
}
