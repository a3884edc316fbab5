//! Field rules shared by the create and update handlers. Every check adds to
//! a [`FieldErrors`] so one response reports all bad fields at once.

use url::Url;

use crate::error::FieldErrors;

pub(crate) const BLANK: &str = "This field may not be blank.";

pub(crate) const TITLE_MAX: usize = 255;
pub(crate) const ORIGIN_MAX: usize = 255;
pub(crate) const CITATION_MAX: usize = 500;
pub(crate) const CATEGORY_NAME_MAX: usize = 100;
pub(crate) const ICON_MAX: usize = 50;
pub(crate) const NAME_MAX: usize = 150;
pub(crate) const PHONE_MAX: usize = 20;
pub(crate) const LOCATION_MAX: usize = 255;
pub(crate) const LANGUAGE_MAX: usize = 10;

const URL_SCHEMES: &[&str] = &["http", "https", "ftp", "ftps"];

impl FieldErrors {
    /// Required text: not blank once trimmed, and at most `max` characters
    /// when `max` is given.
    pub(crate) fn required(&mut self, field: &'static str, value: &str, max: Option<usize>) -> &mut Self {
        if value.trim().is_empty() {
            self.add(field, BLANK);
        } else if let Some(max) = max {
            self.max_len(field, value, max);
        }
        self
    }

    pub(crate) fn max_len(&mut self, field: &'static str, value: &str, max: usize) -> &mut Self {
        if value.trim().chars().count() > max {
            self.add(field, format!("Ensure this field has no more than {max} characters."));
        }
        self
    }

    /// Empty is allowed; anything else must be an absolute URL with a host.
    pub(crate) fn url(&mut self, field: &'static str, value: &str) -> &mut Self {
        let value = value.trim();
        if value.is_empty() {
            return self;
        }
        let valid = Url::parse(value)
            .map(|u| URL_SCHEMES.contains(&u.scheme()) && u.host_str().is_some())
            .unwrap_or(false);
        if !valid {
            self.add(field, "Enter a valid URL.");
        }
        self
    }

    /// PATCH form of [`required`](Self::required): absent fields are skipped.
    pub(crate) fn required_if_set(
        &mut self,
        field: &'static str,
        value: Option<&str>,
        max: Option<usize>,
    ) -> &mut Self {
        if let Some(value) = value {
            self.required(field, value, max);
        }
        self
    }

    pub(crate) fn max_len_if_set(&mut self, field: &'static str, value: Option<&str>, max: usize) -> &mut Self {
        if let Some(value) = value {
            self.max_len(field, value, max);
        }
        self
    }

    pub(crate) fn url_if_set(&mut self, field: &'static str, value: Option<&str>) -> &mut Self {
        if let Some(value) = value {
            self.url(field, value);
        }
        self
    }
}
