use serde::{Deserialize, Serialize};

use tourdesk_core::{DomainError, DomainResult, ValueObject};

/// Billing recipient of an invoice (value object owned by the invoice).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Recipient {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub zip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub vat_number: Option<String>,
}

impl ValueObject for Recipient {}

impl Recipient {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ..Self::default()
        }
    }

    pub fn with_address(
        mut self,
        address: impl Into<String>,
        zip: impl Into<String>,
        city: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        self.address = Some(address.into());
        self.zip = Some(zip.into());
        self.city = Some(city.into());
        self.country = Some(country.into());
        self
    }

    pub fn with_vat_number(mut self, vat_number: impl Into<String>) -> Self {
        self.vat_number = Some(vat_number.into());
        self
    }

    /// Required fields: `name` and `email`, which must contain `@`.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("recipient.name", "must not be empty"));
        }
        let email = self.email.trim();
        if email.is_empty() {
            return Err(DomainError::validation("recipient.email", "must not be empty"));
        }
        if !email.contains('@') {
            return Err(DomainError::validation(
                "recipient.email",
                "must be an email address",
            ));
        }
        Ok(())
    }

    /// Trimmed copy; blank optional fields become `None`.
    pub fn normalized(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: clean(&self.phone),
            address: clean(&self.address),
            zip: clean(&self.zip),
            city: clean(&self.city),
            country: clean(&self.country),
            vat_number: clean(&self.vat_number),
        }
    }

    /// Apply a partial update. Fields absent from the patch are kept; an
    /// empty string clears an optional field.
    pub fn merge(&self, patch: &RecipientPatch) -> Self {
        let pick = |new: &Option<String>, old: &Option<String>| new.clone().or_else(|| old.clone());
        Self {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            email: patch.email.clone().unwrap_or_else(|| self.email.clone()),
            phone: pick(&patch.phone, &self.phone),
            address: pick(&patch.address, &self.address),
            zip: pick(&patch.zip, &self.zip),
            city: pick(&patch.city, &self.city),
            country: pick(&patch.country, &self.country),
            vat_number: pick(&patch.vat_number, &self.vat_number),
        }
        .normalized()
    }
}

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Partial recipient update.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecipientPatch {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub zip: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub vat_number: Option<String>,
}

impl RecipientPatch {
    /// A patch that replaces every field with the given recipient's values.
    pub fn replace_with(recipient: &Recipient) -> Self {
        let or_clear = |v: &Option<String>| Some(v.clone().unwrap_or_default());
        Self {
            name: Some(recipient.name.clone()),
            email: Some(recipient.email.clone()),
            phone: or_clear(&recipient.phone),
            address: or_clear(&recipient.address),
            zip: or_clear(&recipient.zip),
            city: or_clear(&recipient.city),
            country: or_clear(&recipient.country),
            vat_number: or_clear(&recipient.vat_number),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anna() -> Recipient {
        Recipient::new("Anna Berg", "anna@example.se")
            .with_address("Storgatan 1", "111 22", "Stockholm", "SE")
    }

    #[test]
    fn requires_name_then_email() {
        let err = Recipient::new(" ", "").validate().unwrap_err();
        assert_eq!(err.field(), Some("recipient.name"));

        let err = Recipient::new("Anna", "").validate().unwrap_err();
        assert_eq!(err.field(), Some("recipient.email"));

        let err = Recipient::new("Anna", "anna.example.se").validate().unwrap_err();
        assert_eq!(err.field(), Some("recipient.email"));

        assert!(anna().validate().is_ok());
    }

    #[test]
    fn partial_merge_keeps_untouched_fields() {
        let patch = RecipientPatch {
            email: Some("billing@example.se".to_string()),
            phone: Some("+46 8 123 45".to_string()),
            ..RecipientPatch::default()
        };
        let merged = anna().merge(&patch);
        assert_eq!(merged.name, "Anna Berg");
        assert_eq!(merged.email, "billing@example.se");
        assert_eq!(merged.phone.as_deref(), Some("+46 8 123 45"));
        assert_eq!(merged.city.as_deref(), Some("Stockholm"));
    }

    #[test]
    fn empty_string_clears_optional_field() {
        let patch = RecipientPatch {
            city: Some(String::new()),
            ..RecipientPatch::default()
        };
        assert_eq!(anna().merge(&patch).city, None);
    }

    #[test]
    fn wholesale_replacement() {
        let other = Recipient::new("Nordic Tours AB", "ap@nordic.example").with_vat_number("SE556677889901");
        let merged = anna().merge(&RecipientPatch::replace_with(&other));
        assert_eq!(merged, other);
    }
}
