//! Form validation
//!
//! Each validator collects errors in field order. Handlers display the
//! first one.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref EMAIL_RE: Regex =
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid");
    static ref OTP_RE: Regex = Regex::new(r"^[0-9]{6}$").expect("otp pattern is valid");
}

pub const PASSWORD_MISMATCH: &str = "Passwords don't match";

/// Validation errors in field order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<String>);

impl ValidationErrors {
    fn push(&mut self, message: impl Into<String>) {
        self.0.push(message.into());
    }

    fn extend(&mut self, result: Result<(), String>) {
        if let Err(message) = result {
            self.push(message);
        }
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.first().unwrap_or("Invalid input"))
    }
}

pub fn validate_email(email: &str) -> Result<(), String> {
    if EMAIL_RE.is_match(email.trim()) {
        Ok(())
    } else {
        Err("Please enter a valid email address".to_string())
    }
}

pub fn validate_full_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len < 2 {
        Err("Full name must be at least 2 characters".to_string())
    } else if len > 100 {
        Err("Full name must be at most 100 characters".to_string())
    } else {
        Ok(())
    }
}

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < 8 {
        return Err("Password must be at least 8 characters".to_string());
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err("Password must contain at least one letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one number".to_string());
    }
    Ok(())
}

pub fn validate_confirmation(password: &str, confirm: &str) -> Result<(), String> {
    if password == confirm {
        Ok(())
    } else {
        Err(PASSWORD_MISMATCH.to_string())
    }
}

pub fn validate_otp(otp: &str) -> Result<(), String> {
    if OTP_RE.is_match(otp.trim()) {
        Ok(())
    } else {
        Err("Verification code must be 6 digits".to_string())
    }
}

fn required(value: &str, message: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(message.to_string())
    } else {
        Ok(())
    }
}

pub fn validate_sign_up(
    full_name: &str,
    email: &str,
    password: &str,
    confirm_password: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.extend(validate_full_name(full_name));
    errors.extend(validate_email(email));
    errors.extend(validate_password(password));
    errors.extend(validate_confirmation(password, confirm_password));
    errors.into_result()
}

pub fn validate_reset_password(password: &str, confirm_password: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.extend(validate_password(password));
    errors.extend(validate_confirmation(password, confirm_password));
    errors.into_result()
}

pub fn validate_verify_otp(email: &str, otp: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.extend(validate_email(email));
    errors.extend(validate_otp(otp));
    errors.into_result()
}

pub fn validate_contact(
    name: &str,
    email: &str,
    subject: &str,
    message: &str,
) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.extend(required(name, "Name is required"));
    errors.extend(validate_email(email));
    errors.extend(required(subject, "Subject is required"));
    if message.trim().chars().count() < 10 {
        errors.push("Message must be at least 10 characters");
    }
    errors.into_result()
}

pub fn validate_article(headline: &str, source_link: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();
    errors.extend(required(headline, "Headline is required"));

    let link_ok = url::Url::parse(source_link.trim())
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some())
        .unwrap_or(false);
    if !link_ok {
        errors.push("Source link must be a valid http(s) URL");
    }
    errors.into_result()
}
