use crate::entities::coupon_entity as coupons;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CouponResponse {
    pub id: i32,
    pub coupon_type: String,
    pub name: Option<String>,
    pub code: String,
    pub amount: i64,
    pub over_amount: i64,
    pub start_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
    pub status: i32,
    pub user_id: Option<i32>,
    pub available: bool,
    pub can_redeem: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<coupons::Model> for CouponResponse {
    fn from(coupon: coupons::Model) -> Self {
        let now = Utc::now();
        Self {
            available: coupon.available(now),
            can_redeem: coupon.can_redeem(now) && !coupon.is_redeemed(),
            id: coupon.id,
            coupon_type: coupon.coupon_type,
            name: coupon.name,
            code: coupon.code,
            amount: coupon.amount,
            over_amount: coupon.over_amount,
            start_time: coupon.start_time,
            expire_time: coupon.expire_time,
            status: coupon.status,
            user_id: coupon.user_id,
            created_at: coupon.created_at,
            updated_at: coupon.updated_at,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct CouponsQuery {
    pub page: Option<u64>,
    pub page_size: Option<u64>,
    /// Exact match on code or name.
    pub q: Option<String>,
    pub order_by: Option<String>,
    pub order_sort: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCouponRequest {
    /// `coupon` (default) or `promo`.
    pub coupon_type: Option<String>,
    pub name: Option<String>,
    /// Cents.
    pub amount: i64,
    pub over_amount: Option<i64>,
    /// How many coupons to generate, 1..=1000.
    pub quantity: i32,
    /// Normalised to 00:00:00 of its day.
    pub start_time: Option<DateTime<Utc>>,
    /// Normalised to 23:59:59 of its day.
    pub expire_time: Option<DateTime<Utc>>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub name: Option<String>,
    pub amount: Option<i64>,
    pub over_amount: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
    pub status: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RedeemCouponRequest {
    #[schema(example = "C1A2B3C4D5E6F7A8")]
    pub code: String,
    /// Redeem on behalf of another user; honoured only with
    /// `coupon.item-redeem--to-all-user-id`.
    pub user_id: Option<i32>,
}
