//! Input validation utilities

use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;

/// Validate that a login form carries both fields
pub fn validate_login_request<'a>(
    username: Option<&'a str>,
    password: Option<&'a str>,
) -> Result<(&'a str, &'a str), String> {
    let username = username.map(str::trim).filter(|u| !u.is_empty());
    let password = password.filter(|p| !p.is_empty());

    match (username, password) {
        (Some(username), Some(password)) => Ok((username, password)),
        _ => Err("Username and password are required".to_string()),
    }
}

/// Validate a Tunisian phone number
///
/// Eight digits, the first between 2 and 9, optionally prefixed with `+216`
/// or `00216`. Spaces, dots and dashes are ignored.
pub fn validate_phone(phone: &str) -> Result<(), String> {
    let compact: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '.' | '-'))
        .collect();

    if compact.is_empty() {
        return Err("Phone number is required".to_string());
    }

    static PHONE_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = PHONE_REGEX.get_or_init(|| {
        Regex::new(r"^(?:\+216|00216)?[2-9][0-9]{7}$").expect("Failed to compile phone regex")
    });

    if !regex.is_match(&compact) {
        return Err("Phone number must be 8 digits, optionally prefixed with +216".to_string());
    }

    Ok(())
}

/// Delivery address submitted at checkout
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub name: String,
    pub address: String,
    pub gouvernorat: String,
    pub ville: String,
    pub phone: String,
}

/// Validate an address against the villes known for its gouvernorat
pub fn validate_shipping_address(address: &ShippingAddress, villes: &[String]) -> Result<(), String> {
    if address.name.trim().is_empty() {
        return Err("Recipient name is required".to_string());
    }

    if address.name.len() > 100 {
        return Err("Recipient name must be at most 100 characters long".to_string());
    }

    if address.address.trim().is_empty() {
        return Err("Street address is required".to_string());
    }

    if address.address.len() > 250 {
        return Err("Street address must be at most 250 characters long".to_string());
    }

    if address.gouvernorat.trim().is_empty() {
        return Err("Gouvernorat is required".to_string());
    }

    let ville = address.ville.trim();
    if ville.is_empty() {
        return Err("Ville is required".to_string());
    }

    if !villes.iter().any(|known| known.eq_ignore_ascii_case(ville)) {
        return Err(format!(
            "{} is not a delivery location in {}",
            ville, address.gouvernorat
        ));
    }

    validate_phone(&address.phone)
}
