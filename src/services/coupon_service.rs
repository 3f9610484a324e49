use crate::authorization::{AuthUser, Permission, can};
use crate::entities::coupon_entity as coupons;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::crud::{apply_order, common_update, paginate};
use crate::utils::{COUPON_CODE_PREFIX, generate_coupon_code, normalize_optional};
use chrono::{DateTime, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter, Select,
    Set, TransactionTrait,
};

pub const MAX_BATCH_QUANTITY: i32 = 1000;

const COUPON_UNAVAILABLE: &str = "Coupon Unavailable";
const COUPON_IRREDEEMABLE: &str = "Coupon Irredeemable";
const COUPON_ALREADY_REDEEMED: &str = "Coupon Already redeemed";

#[derive(Clone)]
pub struct CouponService {
    pool: DatabaseConnection,
}

/// Move `start` to 00:00:00 and `expire` to 23:59:59 of their days.
fn normalize_date_range(
    start: Option<DateTime<Utc>>,
    expire: Option<DateTime<Utc>>,
) -> (Option<DateTime<Utc>>, Option<DateTime<Utc>>) {
    let at = |time: DateTime<Utc>, h, m, s| {
        NaiveTime::from_hms_opt(h, m, s).map(|t| time.date_naive().and_time(t).and_utc())
    };

    (
        start.and_then(|t| at(t, 0, 0, 0)),
        expire.and_then(|t| at(t, 23, 59, 59)),
    )
}

/// Restrict `select` to what the caller may see: enabled coupons only without `all_status`,
/// the caller's own coupons only without `all_user_id`. Anonymous callers see nothing.
fn scope_for_caller(
    select: Select<coupons::Entity>,
    caller: Option<&AuthUser>,
    all_status: Permission,
    all_user_id: Permission,
) -> Select<coupons::Entity> {
    let mut select = select;

    if !can(caller, all_status) {
        select = select.filter(coupons::Column::Status.eq(1));
    }

    if !can(caller, all_user_id) {
        select = match caller {
            Some(user) => select.filter(coupons::Column::UserId.eq(user.id())),
            None => select.filter(Expr::val(1).eq(0)),
        };
    }

    select
}

impl CouponService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn coupons(
        &self,
        query: &CouponsQuery,
        caller: Option<&AuthUser>,
    ) -> AppResult<PaginatedResponse<CouponResponse>> {
        let params = PaginationParams::new(query.page, query.page_size);
        let mut select = coupons::Entity::find();

        if let Some(q) = normalize_optional(query.q.clone()) {
            select = select.filter(
                Condition::any()
                    .add(coupons::Column::Code.eq(q.as_str()))
                    .add(coupons::Column::Name.eq(q.as_str())),
            );
        }

        let select = scope_for_caller(
            select,
            caller,
            Permission::CouponListReadAllStatus,
            Permission::CouponListReadAllUserId,
        );
        let select = apply_order(
            select,
            query.order_by.as_deref(),
            query.order_sort.as_deref(),
            coupons::Column::Id,
        )?;

        Ok(paginate(&self.pool, select, &params)
            .await?
            .map(CouponResponse::from))
    }

    /// NOT_FOUND both when the row is missing and when the caller may not see it.
    pub async fn coupon(&self, id: i32, caller: Option<&AuthUser>) -> AppResult<CouponResponse> {
        let select = scope_for_caller(
            coupons::Entity::find_by_id(id),
            caller,
            Permission::CouponItemReadAllStatus,
            Permission::CouponItemReadAllUserId,
        );

        select
            .one(&self.pool)
            .await?
            .map(Into::into)
            .ok_or_else(|| AppError::not_found("Coupon"))
    }

    pub async fn coupon_by_code(
        &self,
        code: &str,
        caller: Option<&AuthUser>,
    ) -> AppResult<CouponResponse> {
        let coupon = self.find_by_code(code).await?;
        self.coupon(coupon.id, caller).await
    }

    /// Create `quantity` coupons sharing the request's fields, each with its own code.
    /// Returns the first one.
    pub async fn create_coupon(&self, request: CreateCouponRequest) -> AppResult<CouponResponse> {
        if !(1..=MAX_BATCH_QUANTITY).contains(&request.quantity) {
            return Err(AppError::ValidationError(format!(
                "Quantity must be between 1 and {MAX_BATCH_QUANTITY}"
            )));
        }
        if request.amount < 0 || request.over_amount.is_some_and(|a| a < 0) {
            return Err(AppError::ValidationError(
                "Amounts must not be negative".to_string(),
            ));
        }

        let coupon_type = request.coupon_type.unwrap_or_else(|| "coupon".to_string());
        if !matches!(coupon_type.as_str(), "coupon" | "promo") {
            return Err(AppError::ValidationError(format!(
                "Unknown coupon type: {coupon_type}"
            )));
        }

        let (start_time, expire_time) =
            normalize_date_range(request.start_time, request.expire_time);
        let now = Utc::now();

        let txn = self.pool.begin().await?;
        let mut first = None;
        for _ in 0..request.quantity {
            let coupon = coupons::ActiveModel {
                coupon_type: Set(coupon_type.clone()),
                name: Set(normalize_optional(request.name.clone())),
                code: Set(generate_coupon_code(COUPON_CODE_PREFIX)),
                amount: Set(request.amount),
                over_amount: Set(request.over_amount.unwrap_or(0)),
                quantity: Set(request.quantity),
                start_time: Set(start_time),
                expire_time: Set(expire_time),
                status: Set(request.status.unwrap_or(1)),
                user_id: Set(None),
                created_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;

            first.get_or_insert(coupon);
        }
        txn.commit().await?;

        let first = first.ok_or_else(|| AppError::InternalError("Empty coupon batch".to_string()))?;
        log::info!(
            "Created {} coupon(s) starting at #{}",
            request.quantity,
            first.id
        );

        Ok(first.into())
    }

    pub async fn update_coupon(
        &self,
        id: i32,
        request: UpdateCouponRequest,
    ) -> AppResult<CouponResponse> {
        let (start_time, expire_time) =
            normalize_date_range(request.start_time, request.expire_time);

        let coupon = common_update::<coupons::Entity, _, _, _>(&self.pool, id, "Coupon", |am| {
            if let Some(name) = request.name {
                am.name = Set(normalize_optional(Some(name)));
            }
            if let Some(amount) = request.amount {
                am.amount = Set(amount);
            }
            if let Some(over_amount) = request.over_amount {
                am.over_amount = Set(over_amount);
            }
            if start_time.is_some() {
                am.start_time = Set(start_time);
            }
            if expire_time.is_some() {
                am.expire_time = Set(expire_time);
            }
            if let Some(status) = request.status {
                am.status = Set(status);
            }
            am.updated_at = Set(Some(Utc::now()));
        })
        .await?;

        Ok(coupon.into())
    }

    /// Coupons are never removed; deleting one disables it.
    pub async fn delete_coupon(&self, id: i32) -> AppResult<CouponResponse> {
        let coupon = common_update::<coupons::Entity, _, _, _>(&self.pool, id, "Coupon", |am| {
            am.status = Set(0);
            am.updated_at = Set(Some(Utc::now()));
        })
        .await?;

        log::info!("Coupon #{id} disabled");
        Ok(coupon.into())
    }

    /// Bind the coupon with `request.code` to the caller, or to `request.user_id` when the
    /// caller may redeem on behalf of others. No failure leaves the row modified.
    pub async fn redeem_coupon(
        &self,
        request: RedeemCouponRequest,
        caller: &AuthUser,
    ) -> AppResult<CouponResponse> {
        let coupon = self.find_by_code(request.code.trim()).await?;
        let now = Utc::now();

        if !coupon.available(now) {
            return Err(AppError::error(COUPON_UNAVAILABLE));
        }
        if !coupon.can_redeem(now) {
            return Err(AppError::error(COUPON_IRREDEEMABLE));
        }
        if coupon.is_redeemed() {
            return Err(AppError::error(COUPON_ALREADY_REDEEMED));
        }

        let user_id = match request.user_id {
            Some(target) if can(Some(caller), Permission::CouponItemRedeemToAllUserId) => target,
            _ => caller.id(),
        };

        // The `user_id IS NULL` guard makes the loser of a concurrent redemption match no row.
        let result = coupons::Entity::update_many()
            .col_expr(coupons::Column::UserId, Expr::value(user_id))
            .col_expr(coupons::Column::UpdatedAt, Expr::value(Some(now)))
            .filter(coupons::Column::Id.eq(coupon.id))
            .filter(coupons::Column::UserId.is_null())
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            log::warn!("Coupon {} was redeemed concurrently", coupon.code);
            return Err(AppError::error(COUPON_ALREADY_REDEEMED));
        }

        log::info!("Coupon {} redeemed for user {}", coupon.code, user_id);
        let redeemed = coupons::Entity::find_by_id(coupon.id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Coupon"))?;

        Ok(redeemed.into())
    }

    async fn find_by_code(&self, code: &str) -> AppResult<coupons::Model> {
        coupons::Entity::find()
            .filter(coupons::Column::Code.eq(code))
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found("Coupon"))
    }
}
