//! Validation utilities for the FahamPesa platform
//!
//! Includes Kenya-specific validations for phone numbers and tax PINs.

use uuid::Uuid;

use crate::models::DayHours;

// ============================================================================
// Domain Validations
// ============================================================================

/// Validate that a movement/transfer/order quantity is positive
pub fn validate_positive_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity <= 0 {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate a transfer's endpoints before anything is written
pub fn validate_transfer_branches(from: Uuid, to: Uuid) -> Result<(), &'static str> {
    if from == to {
        return Err("Source and destination branch must differ");
    }
    Ok(())
}

/// Validate a branch or supplier display name
pub fn validate_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name cannot be empty");
    }
    if trimmed.len() > 120 {
        return Err("Name must be at most 120 characters");
    }
    Ok(())
}

/// Validate a product SKU (2-32 chars, uppercase alphanumeric with dashes)
pub fn validate_sku(sku: &str) -> Result<(), &'static str> {
    if sku.len() < 2 || sku.len() > 32 {
        return Err("SKU must be 2-32 characters");
    }
    if !sku
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-')
    {
        return Err("SKU must be uppercase alphanumeric, dashes allowed");
    }
    Ok(())
}

/// Validate weekly opening hours: exactly seven entries, and when a day is
/// open both times must be well-formed with opening before closing.
pub fn validate_opening_hours(hours: &[DayHours]) -> Result<(), &'static str> {
    if hours.len() != 7 {
        return Err("Opening hours must cover exactly seven days");
    }
    for day in hours {
        match (&day.opens_at, &day.closes_at) {
            (None, None) => continue,
            (Some(open), Some(close)) => {
                if !is_valid_hhmm(open) || !is_valid_hhmm(close) {
                    return Err("Times must be in HH:MM 24-hour format");
                }
                if open >= close {
                    return Err("Opening time must be before closing time");
                }
            }
            _ => return Err("A day must set both opening and closing time, or neither"),
        }
    }
    Ok(())
}

fn is_valid_hhmm(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != 5 || bytes[2] != b':' {
        return false;
    }
    let (Ok(h), Ok(m)) = (s[..2].parse::<u8>(), s[3..].parse::<u8>()) else {
        return false;
    };
    h < 24 && m < 60
}

/// Validate branch capacity
pub fn validate_capacity(capacity: i32) -> Result<(), &'static str> {
    if capacity <= 0 {
        return Err("Capacity must be positive");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

// ============================================================================
// Kenya-Specific Validations
// ============================================================================

/// Validate Kenyan phone number format
/// Accepts: 0712345678, 0112345678, +254712345678, 254712345678
pub fn validate_kenyan_phone(phone: &str) -> Result<(), &'static str> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    // Local format: 10 digits starting 07 or 01
    if digits.len() == 10 && (digits.starts_with("07") || digits.starts_with("01")) {
        return Ok(());
    }
    // International format with 254 country code: 12 digits
    if digits.len() == 12
        && digits.starts_with("254")
        && (digits[3..].starts_with('7') || digits[3..].starts_with('1'))
    {
        return Ok(());
    }

    Err("Invalid Kenyan phone number format")
}

/// Validate KRA PIN format: a letter, nine digits, a letter (e.g. A012345678Z)
pub fn validate_kra_pin(pin: &str) -> Result<(), &'static str> {
    let chars: Vec<char> = pin.chars().collect();
    if chars.len() != 11 {
        return Err("KRA PIN must be 11 characters");
    }
    if !chars[0].is_ascii_uppercase() || !chars[10].is_ascii_uppercase() {
        return Err("KRA PIN must start and end with an uppercase letter");
    }
    if !chars[1..10].iter().all(|c| c.is_ascii_digit()) {
        return Err("KRA PIN must contain nine digits between the letters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_positive_quantity() {
        assert!(validate_positive_quantity(1).is_ok());
        assert!(validate_positive_quantity(0).is_err());
        assert!(validate_positive_quantity(-5).is_err());
    }

    #[test]
    fn test_validate_transfer_branches() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_transfer_branches(a, b).is_ok());
        assert!(validate_transfer_branches(a, a).is_err());
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Westlands Branch").is_ok());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(121)).is_err());
    }

    #[test]
    fn test_validate_sku() {
        assert!(validate_sku("SKU-001").is_ok());
        assert!(validate_sku("AB").is_ok());
        assert!(validate_sku("a-1").is_err()); // lowercase
        assert!(validate_sku("X").is_err()); // too short
        assert!(validate_sku("SKU 1").is_err()); // space
    }

    #[test]
    fn test_validate_opening_hours_valid() {
        let mut week = vec![DayHours::open("08:00", "17:30"); 6];
        week.push(DayHours::closed());
        assert!(validate_opening_hours(&week).is_ok());
    }

    #[test]
    fn test_validate_opening_hours_wrong_length() {
        let week = vec![DayHours::closed(); 6];
        assert!(validate_opening_hours(&week).is_err());
    }

    #[test]
    fn test_validate_opening_hours_inverted() {
        let mut week = vec![DayHours::closed(); 6];
        week.push(DayHours::open("18:00", "09:00"));
        assert!(validate_opening_hours(&week).is_err());
    }

    #[test]
    fn test_validate_opening_hours_half_set() {
        let mut week = vec![DayHours::closed(); 6];
        week.push(DayHours {
            opens_at: Some("08:00".to_string()),
            closes_at: None,
        });
        assert!(validate_opening_hours(&week).is_err());
    }

    #[test]
    fn test_validate_opening_hours_bad_format() {
        let mut week = vec![DayHours::closed(); 6];
        week.push(DayHours::open("8am", "5pm"));
        assert!(validate_opening_hours(&week).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("test@example.com").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("no@domain").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("password123").is_ok());
        assert!(validate_password("short").is_err());
    }

    #[test]
    fn test_validate_kenyan_phone_valid() {
        assert!(validate_kenyan_phone("0712345678").is_ok());
        assert!(validate_kenyan_phone("0112345678").is_ok());
        assert!(validate_kenyan_phone("+254712345678").is_ok());
        assert!(validate_kenyan_phone("254112345678").is_ok());
        assert!(validate_kenyan_phone("0712-345-678").is_ok());
    }

    #[test]
    fn test_validate_kenyan_phone_invalid() {
        assert!(validate_kenyan_phone("12345").is_err());
        assert!(validate_kenyan_phone("0812345678").is_err());
        assert!(validate_kenyan_phone("255712345678").is_err());
        assert!(validate_kenyan_phone("abcdefghij").is_err());
    }

    #[test]
    fn test_validate_kra_pin_valid() {
        assert!(validate_kra_pin("A012345678Z").is_ok());
        assert!(validate_kra_pin("P051234567M").is_ok());
    }

    #[test]
    fn test_validate_kra_pin_invalid() {
        assert!(validate_kra_pin("A01234567Z").is_err()); // too short
        assert!(validate_kra_pin("0123456789Z").is_err()); // no leading letter
        assert!(validate_kra_pin("A01234567eZ").is_err()); // letter in digits
        assert!(validate_kra_pin("a012345678z").is_err()); // lowercase
    }
}
