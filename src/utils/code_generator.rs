use uuid::Uuid;

pub const COUPON_CODE_PREFIX: &str = "C";
pub const COUPON_CODE_BODY_LEN: usize = 15;

/// `prefix` followed by the first 15 hex digits of a v4 UUID, upper-cased.
pub fn generate_coupon_code(prefix: &str) -> String {
    let body: String = Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(COUPON_CODE_BODY_LEN)
        .collect();

    format!("{prefix}{body}").to_uppercase()
}
