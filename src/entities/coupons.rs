use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    /// `coupon` or `promo`
    pub coupon_type: String,
    pub name: Option<String>,
    #[sea_orm(unique)]
    pub code: String,
    /// Face value in cents.
    pub amount: i64,
    /// Minimum order amount (cents) the coupon applies to.
    pub over_amount: i64,
    pub quantity: i32,
    pub start_time: Option<DateTime<Utc>>,
    pub expire_time: Option<DateTime<Utc>>,
    pub status: i32,
    /// Set exactly once, on redemption.
    pub user_id: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Enabled and not past its expiry.
    pub fn available(&self, now: DateTime<Utc>) -> bool {
        if self.status != 1 {
            return false;
        }

        match self.expire_time {
            Some(expire_time) => now <= expire_time,
            None => true,
        }
    }

    /// Inside the `start_time ..= expire_time` window.
    pub fn can_redeem(&self, now: DateTime<Utc>) -> bool {
        let started = self.start_time.is_none_or(|start| now >= start);
        let not_expired = self.expire_time.is_none_or(|expire| now <= expire);

        started && not_expired
    }

    pub fn is_redeemed(&self) -> bool {
        self.user_id.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(status: i32, start_offset_days: i64, expire_offset_days: i64) -> Model {
        let now = Utc::now();
        Model {
            id: 1,
            coupon_type: "coupon".to_string(),
            name: None,
            code: "CABCDEF012345678".to_string(),
            amount: 500,
            over_amount: 0,
            quantity: 1,
            start_time: Some(now + Duration::days(start_offset_days)),
            expire_time: Some(now + Duration::days(expire_offset_days)),
            status,
            user_id: None,
            created_at: now,
            updated_at: None,
        }
    }

    #[test]
    fn test_available() {
        let now = Utc::now();
        assert!(coupon(1, -1, 1).available(now));
        assert!(!coupon(0, -1, 1).available(now));
        assert!(!coupon(1, -3, -1).available(now));
        // not started yet still counts as available
        assert!(coupon(1, 1, 3).available(now));
    }

    #[test]
    fn test_can_redeem() {
        let now = Utc::now();
        assert!(coupon(1, -1, 1).can_redeem(now));
        assert!(!coupon(1, 1, 3).can_redeem(now));
        assert!(!coupon(1, -3, -1).can_redeem(now));
    }

    #[test]
    fn test_open_ended_window() {
        let now = Utc::now();
        let mut c = coupon(1, 0, 0);
        c.start_time = None;
        c.expire_time = None;
        assert!(c.available(now));
        assert!(c.can_redeem(now));
    }
}
