//! Validation utilities for the Store Management System

use rust_decimal::Decimal;
use uuid::Uuid;

// ============================================================================
// Inventory Validations
// ============================================================================

/// Transfers must move stock between two different branches
pub fn validate_transfer_branches(from_branch: Uuid, to_branch: Uuid) -> Result<(), &'static str> {
    if from_branch == to_branch {
        return Err("Source and destination branches must differ");
    }
    Ok(())
}

/// Prices and costs cannot be negative
pub fn validate_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount < Decimal::ZERO {
        return Err("Amount cannot be negative");
    }
    Ok(())
}

/// Payments and expenses must be strictly positive
pub fn validate_positive_amount(amount: Decimal) -> Result<(), &'static str> {
    if amount <= Decimal::ZERO {
        return Err("Amount must be greater than zero");
    }
    Ok(())
}

/// Vehicle registration: letters, digits and spaces, 3-20 characters
pub fn validate_registration_number(registration: &str) -> Result<(), &'static str> {
    let trimmed = registration.trim();
    if trimmed.len() < 3 || trimmed.len() > 20 {
        return Err("Registration number must be 3-20 characters");
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-')
    {
        return Err("Registration number may only contain letters, digits, spaces and dashes");
    }
    Ok(())
}

// ============================================================================
// General Validations
// ============================================================================

/// Validate email format (basic check). Empty is allowed for optional fields.
pub fn validate_optional_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        return Ok(());
    }
    validate_email(email)
}

/// Validate email format (basic check)
pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.contains('@') && email.contains('.') && email.len() >= 5 {
        Ok(())
    } else {
        Err("Invalid email format")
    }
}

/// Validate phone number: 7-15 digits, optionally with +, spaces or dashes
pub fn validate_phone(phone: &str) -> Result<(), &'static str> {
    if phone.is_empty() {
        return Ok(());
    }
    if !phone
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'))
    {
        return Err("Invalid phone number format");
    }
    let digits = phone.chars().filter(|c| c.is_ascii_digit()).count();
    if !(7..=15).contains(&digits) {
        return Err("Phone number must have 7-15 digits");
    }
    Ok(())
}

/// Validate username: 3-150 characters of letters, digits and @.+-_
pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.len() < 3 || username.len() > 150 {
        return Err("Username must be 3-150 characters");
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        return Err("Username may only contain letters, digits and @/./+/-/_");
    }
    Ok(())
}

/// Validate password strength
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.len() < 8 {
        return Err("Password must be at least 8 characters");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    // ========================================================================
    // Inventory Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_transfer_branches() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(validate_transfer_branches(a, b).is_ok());
        assert!(validate_transfer_branches(a, a).is_err());
    }

    #[test]
    fn test_validate_amounts() {
        assert!(validate_amount(Decimal::ZERO).is_ok());
        assert!(validate_amount(Decimal::from_str("-0.01").unwrap()).is_err());
        assert!(validate_positive_amount(Decimal::ZERO).is_err());
        assert!(validate_positive_amount(Decimal::from(50)).is_ok());
    }

    #[test]
    fn test_validate_registration_number() {
        assert!(validate_registration_number("T 123 ABC").is_ok());
        assert!(validate_registration_number("KBX-901A").is_ok());
        assert!(validate_registration_number("T1").is_err());
        assert!(validate_registration_number("T 123 / ABC").is_err());
    }

    // ========================================================================
    // General Validation Tests
    // ========================================================================

    #[test]
    fn test_validate_email() {
        assert!(validate_email("user@example.com").is_ok());
        assert!(validate_email("invalid").is_err());
        assert!(validate_email("@.").is_err());
        assert!(validate_optional_email("").is_ok());
    }

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+255 712 345 678").is_ok());
        assert!(validate_phone("0712-345678").is_ok());
        assert!(validate_phone("").is_ok());
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("07l2345678").is_err());
    }

    #[test]
    fn test_validate_username() {
        assert!(validate_username("store.keeper_1").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username("has space").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("12345678").is_ok());
        assert!(validate_password("1234567").is_err());
    }
}
