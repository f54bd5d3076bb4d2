//! Internal helpers for input validation and storage mapping.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation so every operation enforces the same rules.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, Money, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::Internal(format!("invalid {label} id")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|v| parse_uuid(v, label)).transpose()
}

/// Every mutating operation records who performed it.
pub(crate) fn require_actor(user_id: &str) -> ResultEngine<String> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Unauthorized(
            "an actor id is required for this operation".to_string(),
        ));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_required(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::Validation(format!("{label} must not be empty")));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Quantities moved into or out of stock must be finite and strictly positive.
pub(crate) fn ensure_positive_quantity(quantity: f64, label: &str) -> ResultEngine<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(EngineError::Validation(format!("{label} must be > 0")));
    }
    Ok(())
}

pub(crate) fn ensure_multiplier(multiplier: f64) -> ResultEngine<()> {
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(EngineError::Validation(
            "multiplier must be a finite number >= 0".to_string(),
        ));
    }
    Ok(())
}

pub(crate) fn ensure_positive_amount(amount: Money, label: &str) -> ResultEngine<()> {
    if !amount.is_positive() {
        return Err(EngineError::Validation(format!("{label} must be > 0")));
    }
    Ok(())
}

/// URL-friendly item key: lowercase, accents stripped, words joined by `-`.
pub(crate) fn slugify(name: &str) -> Option<String> {
    let mut out = String::new();
    let mut pending_dash = false;
    for ch in name.trim().nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            for lower in ch.to_lowercase() {
                out.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }
    if out.is_empty() { None } else { Some(out) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_joins_words_and_strips_accents() {
        assert_eq!(slugify("Kain Katun").as_deref(), Some("kain-katun"));
        assert_eq!(slugify("  Benang  Jahit  ").as_deref(), Some("benang-jahit"));
        assert_eq!(slugify("Crème Brûlée").as_deref(), Some("creme-brulee"));
        assert_eq!(slugify("Kancing (besar)").as_deref(), Some("kancing-besar"));
        assert_eq!(slugify(" -- ").as_deref(), None);
    }

    #[test]
    fn blank_actor_is_unauthorized() {
        let err = require_actor("   ").unwrap_err();
        assert!(matches!(err, EngineError::Unauthorized(_)));
        assert_eq!(require_actor(" admin ").unwrap(), "admin");
    }

    #[test]
    fn quantity_rules() {
        assert!(ensure_positive_quantity(1.5, "quantity").is_ok());
        assert!(ensure_positive_quantity(0.0, "quantity").is_err());
        assert!(ensure_positive_quantity(f64::NAN, "quantity").is_err());
        assert!(ensure_multiplier(0.0).is_ok());
        assert!(ensure_multiplier(-1.0).is_err());
    }

    #[test]
    fn amounts_must_be_positive() {
        assert!(ensure_positive_amount(Money::new(1), "amount").is_ok());
        assert!(ensure_positive_amount(Money::ZERO, "amount").is_err());
        assert!(ensure_positive_amount(Money::new(-500), "amount").is_err());
    }
}
