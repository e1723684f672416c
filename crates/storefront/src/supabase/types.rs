//! `PostgREST` request and row types.

use barshop_core::{DiscountPercentage, OrderId, PromoCodeId, PromoCodeText, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::SupabaseError;
use crate::promo::AppliedPromo;

/// Body of `rpc/can_use_promo_code`.
#[derive(Debug, Serialize)]
pub struct CanUsePromoCodeArgs<'a> {
    pub promo_code_text: &'a str,
    pub user_id: &'a UserId,
}

/// Row of `promo_codes` selected as `code,discount_percentage`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromoCodeRow {
    pub code: String,
    pub discount_percentage: Decimal,
}

impl TryFrom<PromoCodeRow> for AppliedPromo {
    type Error = SupabaseError;

    fn try_from(row: PromoCodeRow) -> Result<Self, Self::Error> {
        let code = PromoCodeText::parse(&row.code)
            .map_err(|e| SupabaseError::InvalidRow(format!("promo code {:?}: {e}", row.code)))?;
        let discount_percentage = DiscountPercentage::new(row.discount_percentage)
            .map_err(|e| SupabaseError::InvalidRow(format!("promo code {code}: {e}")))?;

        Ok(Self {
            code,
            discount_percentage,
        })
    }
}

/// Row of `promo_codes` selected as `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct PromoCodeIdRow {
    pub id: PromoCodeId,
}

/// Insert into `promo_code_usage`.
#[derive(Debug, Serialize)]
pub struct PromoCodeUsageInsert<'a> {
    pub promo_code_id: &'a PromoCodeId,
    pub order_id: &'a OrderId,
    pub user_id: &'a UserId,
}
