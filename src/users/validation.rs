//! Field rules for user write requests.
//!
//! Rules run in a fixed field order and every violation is collected, so a
//! rejected request reports all of its problems at once.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::users::repo_types::Role;

pub const NAME_MIN: usize = 2;
pub const NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 6;
pub const AGE_MIN: i64 = 0;
pub const AGE_MAX: i64 = 120;

const NAME_REQUIRED: &str = "Name is required";
const NAME_LENGTH: &str = "Name must be between 2 and 50 characters";
const EMAIL_REQUIRED: &str = "Email is required";
const EMAIL_INVALID: &str = "Please enter a valid email";
const PASSWORD_REQUIRED: &str = "Password is required";
const PASSWORD_LENGTH: &str = "Password must be at least 6 characters long";
const PASSWORD_COMPLEXITY: &str =
    "Password must contain at least one lowercase letter, one uppercase letter, and one number";
const AGE_RANGE: &str = "Age must be a number between 0 and 120";
const ROLE_INVALID: &str = "Role must be either user or admin";
const ACTIVE_INVALID: &str = "isActive must be a boolean value";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Create,
    Update,
}

/// Accepted fields for a new record, password still in plain text.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: Option<i32>,
    pub role: Role,
}

/// Accepted fields for a partial update; `None` means "leave untouched".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateUser {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i32>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn is_complex_password(password: &str) -> bool {
    password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
}

struct Checker<'a> {
    body: &'a Map<String, Value>,
    mode: Mode,
    errors: Vec<FieldError>,
}

impl<'a> Checker<'a> {
    fn new(body: &'a Map<String, Value>, mode: Mode) -> Self {
        Self {
            body,
            mode,
            errors: Vec::new(),
        }
    }

    /// `null` counts as absent.
    fn get(&self, key: &str) -> Option<&'a Value> {
        self.body.get(key).filter(|v| !v.is_null())
    }

    fn fail(&mut self, field: &'static str, message: &'static str) {
        self.errors.push(FieldError { field, message });
    }

    fn name(&mut self) -> Option<String> {
        let Some(value) = self.get("name") else {
            if self.mode == Mode::Create {
                self.fail("name", NAME_REQUIRED);
            }
            return None;
        };
        let Some(raw) = value.as_str() else {
            self.fail("name", NAME_LENGTH);
            return None;
        };
        let name = raw.trim();
        if name.is_empty() && self.mode == Mode::Create {
            self.fail("name", NAME_REQUIRED);
            return None;
        }
        let len = name.chars().count();
        if !(NAME_MIN..=NAME_MAX).contains(&len) {
            self.fail("name", NAME_LENGTH);
            return None;
        }
        Some(name.to_string())
    }

    fn email(&mut self) -> Option<String> {
        let Some(value) = self.get("email") else {
            if self.mode == Mode::Create {
                self.fail("email", EMAIL_REQUIRED);
            }
            return None;
        };
        let email = value.as_str().map(|s| s.trim().to_lowercase());
        match email {
            Some(email) if is_valid_email(&email) => Some(email),
            _ => {
                self.fail("email", EMAIL_INVALID);
                None
            }
        }
    }

    fn password(&mut self) -> Option<String> {
        let Some(value) = self.get("password") else {
            if self.mode == Mode::Create {
                self.fail("password", PASSWORD_REQUIRED);
            }
            return None;
        };
        let Some(password) = value.as_str() else {
            self.fail("password", PASSWORD_LENGTH);
            self.fail("password", PASSWORD_COMPLEXITY);
            return None;
        };
        let mut ok = true;
        if password.chars().count() < PASSWORD_MIN {
            self.fail("password", PASSWORD_LENGTH);
            ok = false;
        }
        if !is_complex_password(password) {
            self.fail("password", PASSWORD_COMPLEXITY);
            ok = false;
        }
        ok.then(|| password.to_string())
    }

    fn age(&mut self) -> Option<i32> {
        let value = self.get("age")?;
        let age = match value {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match age {
            Some(age) if (AGE_MIN..=AGE_MAX).contains(&age) => Some(age as i32),
            _ => {
                self.fail("age", AGE_RANGE);
                None
            }
        }
    }

    fn role(&mut self) -> Option<Role> {
        let value = self.get("role")?;
        match value.as_str().and_then(|s| s.parse::<Role>().ok()) {
            Some(role) => Some(role),
            None => {
                self.fail("role", ROLE_INVALID);
                None
            }
        }
    }

    fn is_active(&mut self) -> Option<bool> {
        let value = self.get("isActive")?;
        let active = match value {
            Value::Bool(b) => Some(*b),
            Value::String(s) if s == "true" => Some(true),
            Value::String(s) if s == "false" => Some(false),
            _ => None,
        };
        if active.is_none() {
            self.fail("isActive", ACTIVE_INVALID);
        }
        active
    }
}

/// Applies the create-mode rules to a request body.
pub fn validate_create(body: &Map<String, Value>) -> Result<CreateUser, Vec<FieldError>> {
    let mut check = Checker::new(body, Mode::Create);
    let name = check.name();
    let email = check.email();
    let password = check.password();
    let age = check.age();
    let role = check.role();

    match (name, email, password) {
        (Some(name), Some(email), Some(password)) if check.errors.is_empty() => Ok(CreateUser {
            name,
            email,
            password,
            age,
            role: role.unwrap_or_default(),
        }),
        _ => Err(check.errors),
    }
}

/// Applies the update-mode rules; only allow-listed keys are read.
pub fn validate_update(body: &Map<String, Value>) -> Result<UpdateUser, Vec<FieldError>> {
    let mut check = Checker::new(body, Mode::Update);
    let update = UpdateUser {
        name: check.name(),
        email: check.email(),
        password: check.password(),
        age: check.age(),
        role: check.role(),
        is_active: check.is_active(),
    };

    if check.errors.is_empty() {
        Ok(update)
    } else {
        Err(check.errors)
    }
}
