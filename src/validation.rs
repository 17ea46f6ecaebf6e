use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::format_description, Date};

use crate::error::FieldError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref GITHUB_LOGIN_RE: Regex = Regex::new(r"^[A-Za-z0-9-]{1,39}$").unwrap();
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub fn is_valid_github_login(name: &str) -> bool {
    GITHUB_LOGIN_RE.is_match(name)
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Option<Date> {
    Date::parse(value.trim(), format_description!("[year]-[month]-[day]")).ok()
}

/// Accumulates field errors in request order.
#[derive(Debug, Default)]
pub struct Checks {
    errors: Vec<FieldError>,
}

impl Checks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, ok: bool, param: &str, msg: &str) -> &mut Self {
        if !ok {
            self.errors.push(FieldError::new(param, msg));
        }
        self
    }

    pub fn required(&mut self, value: &str, param: &str, msg: &str) -> &mut Self {
        self.check(!value.trim().is_empty(), param, msg)
    }

    /// `from` must parse and, when `to` is given, come strictly before it.
    pub fn date_range(&mut self, from: &str, to: Option<&str>, msg: &str) -> &mut Self {
        let ok = match (parse_date(from), to.filter(|t| !t.trim().is_empty())) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(from), Some(to)) => parse_date(to).map(|to| from < to).unwrap_or(false),
        };
        self.check(ok, "from", msg)
    }

    pub fn into_errors(self) -> Vec<FieldError> {
        self.errors
    }
}
