// src/auth/validators.rs

use super::models::RegisterRequest;
use crate::common::ValidationResult;

pub fn validate_registration(data: &RegisterRequest) -> ValidationResult {
    let mut result = ValidationResult::new();

    let email = data.email.trim();
    if email.is_empty() {
        result.add_error("email", "Email is required");
    } else if !email.contains('@') || email.len() > 255 {
        result.add_error("email", "Email is not valid");
    }

    if data.password.len() < 8 {
        result.add_error("password", "Password must be at least 8 characters");
    } else if data.password.len() > 128 {
        result.add_error("password", "Password must be less than 128 characters");
    }

    if let Some(username) = &data.username {
        if username.trim().len() < 2 {
            result.add_error("username", "Username must be at least 2 characters");
        } else if username.len() > 100 {
            result.add_error("username", "Username must be less than 100 characters");
        }
    }

    result
}
