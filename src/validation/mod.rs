/// Input validation shared by the login, profile and report endpoints
use crate::error::{AppError, AppResult};
use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::Regex;

/// Shown when either login field is empty
pub const MSG_LOGIN_REQUIRED: &str = "Email dan Password wajib diisi";
/// Shown when the login email is malformed
pub const MSG_EMAIL_INVALID: &str = "Format email tidak valid";
/// Shown when credentials do not match an active account
pub const MSG_LOGIN_FAILED: &str = "Login gagal";

/// Minimum length for passwords set through the profile editor
pub const MIN_PASSWORD_LENGTH: usize = 8;

lazy_static! {
    static ref EMAIL_PATTERN: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid");
}

/// Check an email address is well-formed
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

/// Validate login form input before any credential lookup
///
/// Empty fields are reported before format problems, matching the order the
/// login form checks them in.
pub fn validate_login_input(email: &str, password: &str) -> AppResult<()> {
    if email.is_empty() || password.is_empty() {
        return Err(AppError::Validation(MSG_LOGIN_REQUIRED.to_string()));
    }

    if !is_valid_email(email) {
        return Err(AppError::Validation(MSG_EMAIL_INVALID.to_string()));
    }

    Ok(())
}

/// Validate a new password against the account policy
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AppError::Validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    if password.trim().is_empty() {
        return Err(AppError::Validation(
            "Password cannot be only whitespace".to_string(),
        ));
    }

    Ok(())
}

/// Parse a `HH:MM` wall-clock time
pub fn parse_clock_time(value: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| AppError::Validation(format!("Invalid time '{}', expected HH:MM", value)))
}

/// Minutes between live start and end
///
/// An end time earlier than the start means the session ran past midnight.
pub fn live_minutes(start: NaiveTime, end: NaiveTime) -> AppResult<i64> {
    if start == end {
        return Err(AppError::Validation(
            "Live end time must differ from start time".to_string(),
        ));
    }

    let minutes = (end - start).num_minutes();
    if minutes > 0 {
        Ok(minutes)
    } else {
        Ok(minutes + 24 * 60)
    }
}

/// Flatten `validator` errors into a single message
pub fn validation_errors_to_string(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => format!("{}: {}", field, message),
                None => format!("{}: invalid value", field),
            })
        })
        .collect();
    messages.sort();
    messages.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(result: AppResult<()>) -> String {
        match result {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("Expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_login_fields() {
        assert_eq!(message(validate_login_input("", "secret")), MSG_LOGIN_REQUIRED);
        assert_eq!(
            message(validate_login_input("a@b.com", "")),
            MSG_LOGIN_REQUIRED
        );
        assert_eq!(message(validate_login_input("", "")), MSG_LOGIN_REQUIRED);
    }

    #[test]
    fn test_malformed_login_email() {
        assert_eq!(message(validate_login_input("abc", "secret")), MSG_EMAIL_INVALID);
        assert_eq!(
            message(validate_login_input("abc@example", "secret")),
            MSG_EMAIL_INVALID
        );
        assert_eq!(
            message(validate_login_input("a b@example.com", "secret")),
            MSG_EMAIL_INVALID
        );
        assert!(validate_login_input("manager@example.com", "secret").is_ok());
    }

    #[test]
    fn test_password_policy() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("        ").is_err());
        assert!(validate_password("long-enough").is_ok());
    }

    #[test]
    fn test_live_minutes() {
        let start = parse_clock_time("10:00").unwrap();
        let end = parse_clock_time("12:30").unwrap();
        assert_eq!(live_minutes(start, end).unwrap(), 150);

        let late = parse_clock_time("22:00").unwrap();
        let after_midnight = parse_clock_time("01:00").unwrap();
        assert_eq!(live_minutes(late, after_midnight).unwrap(), 180);

        assert!(live_minutes(start, start).is_err());
        assert!(parse_clock_time("25:00").is_err());
        assert!(parse_clock_time("noon").is_err());
    }
}
