//! Promo-code validation boundary.
//!
//! Whether a code may be used, and what it is worth, is decided remotely.
//! Usage limits in particular are enforced server-side because the client
//! cannot be trusted to report its own prior usage.

use async_trait::async_trait;
use barshop_core::{DiscountPercentage, PromoCodeError, PromoCodeText, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::supabase::SupabaseError;

/// A promo code that has been validated and applied to a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedPromo {
    /// Normalized code.
    pub code: PromoCodeText,
    /// Discount granted at apply time.
    pub discount_percentage: DiscountPercentage,
}

/// Remote authority over promo codes.
#[async_trait]
pub trait PromoAuthority: Send + Sync {
    /// Whether `user_id` may still redeem `code` (usage limits, eligibility).
    async fn can_use_code(
        &self,
        code: &PromoCodeText,
        user_id: &UserId,
    ) -> Result<bool, SupabaseError>;

    /// Current terms of `code`, or `None` if it does not exist or is inactive.
    async fn lookup_active_code(
        &self,
        code: &PromoCodeText,
    ) -> Result<Option<AppliedPromo>, SupabaseError>;
}

/// How promo codes are handled for customers who are not signed in.
///
/// Usage limits are tracked per user, so a guest cannot be checked against
/// them. `Deny` refuses guest codes outright; `Allow` skips the usage check
/// and only verifies the code is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuestPromoPolicy {
    #[default]
    Deny,
    Allow,
}

impl std::str::FromStr for GuestPromoPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "deny" => Ok(Self::Deny),
            "allow" => Ok(Self::Allow),
            other => Err(format!("expected 'deny' or 'allow', got '{other}'")),
        }
    }
}

/// Reasons a promo code could not be applied.
///
/// None of these mutate the cart; all are recoverable by retrying.
#[derive(Debug, Error)]
pub enum PromoError {
    /// The entered text is not a well-formed code.
    #[error("invalid promo code: {0}")]
    InvalidCode(#[from] PromoCodeError),

    /// The authority refused the code for this customer.
    #[error("promo code {0} cannot be used by this customer")]
    UsageLimitExceeded(PromoCodeText),

    /// The code does not exist or is inactive.
    #[error("promo code {0} not found or inactive")]
    NotFound(PromoCodeText),

    /// Guests may not apply codes under the configured policy.
    #[error("sign in to use promo code {0}")]
    GuestNotAllowed(PromoCodeText),

    /// The cart was cleared, the promo removed, or another code applied
    /// while this one was being validated.
    #[error("promo code {0} was superseded before validation finished")]
    Superseded(PromoCodeText),

    /// The authority could not be reached or answered garbage.
    #[error("promo validation failed: {0}")]
    Remote(#[from] SupabaseError),
}

impl PromoError {
    /// Message safe to show a customer.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCode(_) | Self::NotFound(_) => "Invalid promo code".to_string(),
            Self::UsageLimitExceeded(_) => {
                "Invalid promo code or usage limit exceeded".to_string()
            }
            Self::GuestNotAllowed(_) => "Please sign in to use a promo code".to_string(),
            Self::Superseded(_) => "Promo code was not applied, please try again".to_string(),
            Self::Remote(_) => "Failed to apply promo code".to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_guest_policy_from_str() {
        assert_eq!(
            "ALLOW".parse::<GuestPromoPolicy>().unwrap(),
            GuestPromoPolicy::Allow
        );
        assert_eq!(
            " deny ".parse::<GuestPromoPolicy>().unwrap(),
            GuestPromoPolicy::Deny
        );
        assert!("maybe".parse::<GuestPromoPolicy>().is_err());
        assert_eq!(GuestPromoPolicy::default(), GuestPromoPolicy::Deny);
    }

    #[test]
    fn test_user_messages_hide_transport_details() {
        let err = PromoError::Remote(SupabaseError::RateLimited(30));
        assert_eq!(err.user_message(), "Failed to apply promo code");

        let code = PromoCodeText::parse("gone").unwrap();
        assert_eq!(
            PromoError::NotFound(code.clone()).user_message(),
            "Invalid promo code"
        );
        assert_eq!(
            PromoError::UsageLimitExceeded(code).user_message(),
            "Invalid promo code or usage limit exceeded"
        );
    }

    #[test]
    fn test_applied_promo_json_layout() {
        let promo = AppliedPromo {
            code: PromoCodeText::parse("save10").unwrap(),
            discount_percentage: DiscountPercentage::new(Decimal::from(10)).unwrap(),
        };
        let json = serde_json::to_value(&promo).unwrap();
        assert_eq!(json["code"], "SAVE10");

        let legacy: AppliedPromo =
            serde_json::from_str(r#"{"code":"save10","discount_percentage":10}"#).unwrap();
        assert_eq!(legacy, promo);
    }
}
