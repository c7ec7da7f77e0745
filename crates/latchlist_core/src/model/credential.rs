//! Credential domain model and PIN digest encoding.
//!
//! # Responsibility
//! - Define the stored credential shape and its input validation rules.
//! - Provide the canonical PIN digest encoding used for equality lookup.
//!
//! # Invariants
//! - At most one credential exists per identity.
//! - `secret_digest` is deterministic and byte-stable for a given PIN.
//! - The digest is a reversible encoding, not a one-way hash. It exists
//!   only so stored values can be compared for equality and offers no
//!   confidentiality. Swapping it for a real hash would orphan every
//!   previously stored digest, so an upgrade needs a versioned migration.

use crate::model::identity::Identity;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Minimum accepted PIN length in digits.
pub const MIN_PIN_DIGITS: usize = 4;

/// Stored access credential for one identity.
///
/// Immutable after creation. There is no change-PIN or delete path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub identity: Identity,
    /// Byte-stable encoding of the raw PIN. See module notes.
    pub secret_digest: String,
    /// Minutes an unlock session stays open before relocking.
    pub auto_lock_minutes: u32,
    /// Optional alias usable for name-first verification. Unique across
    /// all credentials when present.
    pub display_name: Option<String>,
}

/// Input validation error for credential creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialInputError {
    PinTooShort,
    PinNotNumeric,
    EmptyDisplayName,
    ZeroAutoLock,
}

impl Display for CredentialInputError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PinTooShort => write!(f, "PIN must be at least {MIN_PIN_DIGITS} digits"),
            Self::PinNotNumeric => write!(f, "PIN must contain only digits"),
            Self::EmptyDisplayName => write!(f, "display name must not be empty"),
            Self::ZeroAutoLock => write!(f, "auto-lock duration must be at least one minute"),
        }
    }
}

impl Error for CredentialInputError {}

/// Validates raw PIN input.
///
/// Callers are expected to pre-validate in their own forms; this check is
/// authoritative and runs again on every create path.
pub fn validate_pin(raw_pin: &str) -> Result<(), CredentialInputError> {
    if raw_pin.chars().count() < MIN_PIN_DIGITS {
        return Err(CredentialInputError::PinTooShort);
    }
    if !raw_pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(CredentialInputError::PinNotNumeric);
    }
    Ok(())
}

/// Encodes a raw PIN into its stored digest form.
///
/// Deterministic: the same PIN always yields the same digest, which the
/// credential lookup relies on.
pub fn pin_digest(raw_pin: &str) -> String {
    BASE64_STANDARD.encode(raw_pin.as_bytes())
}

/// Returns the trimmed display name, or `None` when nothing remains.
pub fn normalize_display_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        normalize_display_name, pin_digest, validate_pin, Credential, CredentialInputError,
        MIN_PIN_DIGITS,
    };
    use std::collections::HashSet;
    use uuid::Uuid;

    #[test]
    fn pin_digest_is_deterministic() {
        assert_eq!(pin_digest("1234"), pin_digest("1234"));
        assert_eq!(pin_digest("00420042"), pin_digest("00420042"));
    }

    #[test]
    fn pin_digest_does_not_collide_over_four_digit_space() {
        let mut seen = HashSet::new();
        for pin in 0..10_000u32 {
            assert!(seen.insert(pin_digest(&format!("{pin:04}"))));
        }
    }

    #[test]
    fn pin_digest_distinguishes_leading_zeros_and_lengths() {
        assert_ne!(pin_digest("0042"), pin_digest("42"));
        assert_ne!(pin_digest("1234"), pin_digest("01234"));
    }

    #[test]
    fn validate_pin_accepts_four_or_more_digits() {
        validate_pin("1234").expect("four digits should pass");
        validate_pin("12345678").expect("eight digits should pass");
    }

    #[test]
    fn validate_pin_rejects_short_and_non_numeric_input() {
        assert_eq!(validate_pin("123"), Err(CredentialInputError::PinTooShort));
        assert_eq!(validate_pin(""), Err(CredentialInputError::PinTooShort));
        assert_eq!(
            validate_pin("12a4"),
            Err(CredentialInputError::PinNotNumeric)
        );
        assert_eq!(
            validate_pin("１２３４"),
            Err(CredentialInputError::PinNotNumeric)
        );
    }

    #[test]
    fn normalize_display_name_trims_and_rejects_blank() {
        assert_eq!(normalize_display_name("  alice "), Some("alice".to_string()));
        assert_eq!(normalize_display_name("   "), None);
        assert_eq!(normalize_display_name(""), None);
    }

    #[test]
    fn min_pin_digits_matches_documented_floor() {
        assert_eq!(MIN_PIN_DIGITS, 4);
    }

    #[test]
    fn credential_serde_shape_is_stable() {
        let credential = Credential {
            identity: Uuid::nil(),
            secret_digest: pin_digest("1234"),
            auto_lock_minutes: 15,
            display_name: None,
        };

        let value = serde_json::to_value(&credential).expect("credential should serialize");
        assert_eq!(value["secret_digest"], "MTIzNA==");
        assert_eq!(value["auto_lock_minutes"], 15);
        assert!(value["display_name"].is_null());
    }
}
