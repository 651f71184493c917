use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::AppError;

pub const MIN_PASSWORD_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password123",
    "12345678",
    "123456789",
    "1234567890",
    "qwerty123",
    "qwertyuiop",
    "iloveyou",
    "sunshine",
    "football",
    "baseball",
    "welcome1",
    "letmein1",
    "admin123",
    "abc12345",
    "trustno1",
    "princess",
    "starwars",
    "passw0rd",
];

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::InternalServerError(format!("Password hash error: {}", e)))
}

pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AppError> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| AppError::InternalServerError(format!("Hash parse error: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Strength problems with `password`; empty when it is acceptable.
pub fn password_problems(password: &str, username: &str) -> Vec<String> {
    let mut problems = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {} characters.",
            MIN_PASSWORD_LENGTH
        ));
    }
    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }
    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }
    if !username.is_empty() && lowered == username.to_lowercase() {
        problems.push("The password is too similar to the username.".to_string());
    }

    problems
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strong_password_passes() {
        assert!(password_problems("correct-horse-battery", "alice").is_empty());
    }

    #[test]
    fn short_numeric_password_reports_both() {
        let problems = password_problems("1234", "alice");
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("too short"));
        assert!(problems[1].contains("entirely numeric"));
    }

    #[test]
    fn common_and_username_like_passwords_fail() {
        assert!(password_problems("Password123", "bob")
            .iter()
            .any(|p| p.contains("too common")));
        assert!(password_problems("CharlieBrown", "charliebrown")
            .iter()
            .any(|p| p.contains("similar to the username")));
    }

    #[test]
    fn hash_round_trips() {
        let hash = hash_password("s3cure-enough").unwrap();
        assert!(verify_password("s3cure-enough", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }
}
