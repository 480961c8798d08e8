use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::input::format::{DOCUMENT_DIGITS, PHONE_DIGITS, digit_count};
use crate::models::courier::VehicleKind;

static EMAIL_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

static BRANCH_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d$").expect("branch pattern compiles"));

const MIN_NAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;
const PLATE_LEN: usize = 7;
const ACCOUNT_DIGITS: std::ops::RangeInclusive<usize> = 5..=8;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("please fill in all fields")]
    MissingFields,

    #[error("enter a valid name")]
    NameTooShort,

    #[error("the document number is incomplete")]
    DocumentIncomplete,

    #[error("the phone number is incomplete")]
    PhoneIncomplete,

    #[error("enter a valid e-mail address")]
    InvalidEmail,

    #[error("the passwords do not match")]
    PasswordMismatch,

    #[error("the password must have at least 6 characters")]
    PasswordTooShort,

    #[error("select a vehicle")]
    MissingVehicleType,

    #[error("enter the vehicle model")]
    MissingModel,

    #[error("enter the motorcycle plate")]
    MissingPlate,

    #[error("the plate must have 7 characters")]
    PlateTooShort,

    #[error("enter the bicycle color")]
    MissingColor,

    #[error("the branch must use the format 0000-0")]
    BranchMalformed,

    #[error("the account must have between 5 and 8 digits")]
    AccountLength,
}

/// Fields of the account registration form, already passed through the
/// formatters.
#[derive(Debug, Clone, Default)]
pub struct RegistrationForm {
    pub first_name: String,
    pub last_name: String,
    pub document_number: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub password_confirmation: String,
}

#[derive(Debug, Clone)]
pub struct VehicleForm {
    pub kind: Option<VehicleKind>,
    pub model: String,
    pub plate: String,
    pub color: String,
}

#[derive(Debug, Clone, Default)]
pub struct BankingForm {
    pub bank: String,
    pub branch: String,
    pub account: String,
}

#[derive(Debug, Clone, Default)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    pub relationship: String,
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_SHAPE.is_match(&email.to_lowercase())
}

pub fn validate_registration(form: &RegistrationForm) -> Result<(), ValidationError> {
    let required = [
        &form.first_name,
        &form.last_name,
        &form.document_number,
        &form.email,
        &form.phone,
        &form.password,
        &form.password_confirmation,
    ];
    if required.iter().any(|field| field.is_empty()) {
        return Err(ValidationError::MissingFields);
    }

    if form.first_name.trim().chars().count() < MIN_NAME_LEN {
        return Err(ValidationError::NameTooShort);
    }

    if digit_count(&form.document_number) != DOCUMENT_DIGITS {
        return Err(ValidationError::DocumentIncomplete);
    }

    if digit_count(&form.phone) != PHONE_DIGITS {
        return Err(ValidationError::PhoneIncomplete);
    }

    if !is_valid_email(&form.email) {
        return Err(ValidationError::InvalidEmail);
    }

    if form.password != form.password_confirmation {
        return Err(ValidationError::PasswordMismatch);
    }

    if form.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort);
    }

    Ok(())
}

pub fn validate_credentials(email: &str, password: &str) -> Result<(), ValidationError> {
    if email.is_empty() || password.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    if !is_valid_email(email) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

pub fn validate_vehicle(form: &VehicleForm) -> Result<(), ValidationError> {
    let Some(kind) = form.kind else {
        return Err(ValidationError::MissingVehicleType);
    };

    if form.model.trim().is_empty() {
        return Err(ValidationError::MissingModel);
    }

    match kind {
        VehicleKind::Motorcycle => {
            let plate = form.plate.trim();
            if plate.is_empty() {
                return Err(ValidationError::MissingPlate);
            }
            if plate.chars().count() < PLATE_LEN {
                return Err(ValidationError::PlateTooShort);
            }
        }
        VehicleKind::Bicycle => {
            if form.color.trim().is_empty() {
                return Err(ValidationError::MissingColor);
            }
        }
    }

    Ok(())
}

pub fn validate_banking(form: &BankingForm) -> Result<(), ValidationError> {
    if form.bank.trim().is_empty() || form.branch.is_empty() || form.account.is_empty() {
        return Err(ValidationError::MissingFields);
    }

    if !BRANCH_SHAPE.is_match(&form.branch) {
        return Err(ValidationError::BranchMalformed);
    }

    if !ACCOUNT_DIGITS.contains(&digit_count(&form.account)) {
        return Err(ValidationError::AccountLength);
    }

    Ok(())
}

pub fn validate_contact(form: &ContactForm) -> Result<(), ValidationError> {
    if form.name.trim().is_empty()
        || form.phone.trim().is_empty()
        || form.relationship.trim().is_empty()
    {
        return Err(ValidationError::MissingFields);
    }

    Ok(())
}
