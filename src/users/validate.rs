use lazy_static::lazy_static;
use regex::Regex;

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Name rules, shared by registration and the rename operation.
pub fn validate_name(name: &str) -> Vec<String> {
    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push("Name is required".to_string());
    } else if name.len() < 3 {
        errors.push("Name must be at least 3 characters long".to_string());
    }
    errors
}

/// Collect every rule violation for a registration attempt; an empty vec
/// means the fields are acceptable. A missing field suppresses only that
/// field's more specific checks.
pub fn validate_registration(name: &str, email: &str, password: &str) -> Vec<String> {
    let mut errors = validate_name(name);

    if email.is_empty() {
        errors.push("Email is required".to_string());
    } else if !is_valid_email(email) {
        errors.push("Invalid email format".to_string());
    }

    if password.is_empty() {
        errors.push("Password is required".to_string());
    } else {
        if password.len() < 8 {
            errors.push("Password must be at least 8 characters long".to_string());
        }
        if !password.chars().any(|c| c.is_ascii_digit()) {
            errors.push("Password must contain at least one number".to_string());
        }
    }

    errors
}

pub fn validate_sign_in(email: &str, password: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if email.is_empty() || password.is_empty() {
        errors.push("Email and password are required".to_string());
    }
    if !email.is_empty() && !is_valid_email(email) {
        errors.push("Invalid email format".to_string());
    }

    errors
}
