//! Engine configuration loading and representation.

use std::time::Duration;

use tourdesk_invoicing::OverpaymentPolicy;

pub const ENV_CURRENCY: &str = "TOURDESK_CURRENCY";
pub const ENV_PAYMENT_TERMS_DAYS: &str = "TOURDESK_PAYMENT_TERMS_DAYS";
pub const ENV_OVERPAYMENT_POLICY: &str = "TOURDESK_OVERPAYMENT_POLICY";
pub const ENV_OVERDUE_SWEEP_SECS: &str = "TOURDESK_OVERDUE_SWEEP_SECS";
pub const ENV_SENDER_NAME: &str = "TOURDESK_SENDER_NAME";

/// Settings for the invoice engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Currency for invoices created without one.
    pub default_currency: String,
    /// Days from issue date to due date when no due date is given.
    pub payment_terms_days: u32,
    pub overpayment_policy: OverpaymentPolicy,
    pub overdue_sweep_interval: Duration,
    /// Signature used in delivered invoices and reminders.
    pub sender_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_currency: "SEK".to_string(),
            payment_terms_days: 30,
            overpayment_policy: OverpaymentPolicy::Accept,
            overdue_sweep_interval: Duration::from_secs(3600),
            sender_name: "Tourdesk Billing".to_string(),
        }
    }
}

impl EngineConfig {
    /// Load from `TOURDESK_*` environment variables. Missing variables take
    /// the default; malformed ones take the default with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let default_currency = lookup(ENV_CURRENCY)
            .map(|v| v.trim().to_ascii_uppercase())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.default_currency);

        let payment_terms_days =
            parse_or(&lookup, ENV_PAYMENT_TERMS_DAYS, defaults.payment_terms_days);

        let overpayment_policy =
            parse_or(&lookup, ENV_OVERPAYMENT_POLICY, defaults.overpayment_policy);

        let overdue_sweep_interval = match parse_or(&lookup, ENV_OVERDUE_SWEEP_SECS, 0u64) {
            0 => defaults.overdue_sweep_interval,
            secs => Duration::from_secs(secs),
        };

        let sender_name = lookup(ENV_SENDER_NAME)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.sender_name);

        Self {
            default_currency,
            payment_terms_days,
            overpayment_policy,
            overdue_sweep_interval,
            sender_name,
        }
    }

    pub fn with_default_currency(mut self, currency: impl Into<String>) -> Self {
        self.default_currency = currency.into();
        self
    }

    pub fn with_payment_terms_days(mut self, days: u32) -> Self {
        self.payment_terms_days = days;
        self
    }

    pub fn with_overpayment_policy(mut self, policy: OverpaymentPolicy) -> Self {
        self.overpayment_policy = policy;
        self
    }

    pub fn with_overdue_sweep_interval(mut self, interval: Duration) -> Self {
        self.overdue_sweep_interval = interval;
        self
    }

    pub fn with_sender_name(mut self, name: impl Into<String>) -> Self {
        self.sender_name = name.into();
        self
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: core::str::FromStr + core::fmt::Debug,
{
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, default = ?default, "malformed config value; using default");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(EngineConfig::from_lookup(lookup(&[])), EngineConfig::default());
    }

    #[test]
    fn reads_every_variable() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_CURRENCY, "eur"),
            (ENV_PAYMENT_TERMS_DAYS, "14"),
            (ENV_OVERPAYMENT_POLICY, "Reject"),
            (ENV_OVERDUE_SWEEP_SECS, "60"),
            (ENV_SENDER_NAME, "Fjällturer AB"),
        ]));

        assert_eq!(config.default_currency, "EUR");
        assert_eq!(config.payment_terms_days, 14);
        assert_eq!(config.overpayment_policy, OverpaymentPolicy::Reject);
        assert_eq!(config.overdue_sweep_interval, Duration::from_secs(60));
        assert_eq!(config.sender_name, "Fjällturer AB");
    }

    #[test]
    fn malformed_values_fall_back() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_PAYMENT_TERMS_DAYS, "thirty"),
            (ENV_OVERPAYMENT_POLICY, "clamp"),
            (ENV_OVERDUE_SWEEP_SECS, "0"),
            (ENV_CURRENCY, "  "),
        ]));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn builders_override() {
        let config = EngineConfig::default()
            .with_payment_terms_days(10)
            .with_overpayment_policy(OverpaymentPolicy::Reject);
        assert_eq!(config.payment_terms_days, 10);
        assert_eq!(config.overpayment_policy, OverpaymentPolicy::Reject);
    }
}
