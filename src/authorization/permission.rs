//! The capability set understood by the API.
//!
//! Permissions are persisted as slugs (`<module>.<action>[--<scope>]`). Only slugs listed here
//! can ever grant access; anything else found in the database is ignored.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

macro_rules! permissions {
    ($($variant:ident => $slug:literal,)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Permission {
            $($variant,)+
        }

        impl Permission {
            pub const ALL: &'static [Permission] = &[$(Permission::$variant,)+];

            pub fn slug(&self) -> &'static str {
                match self {
                    $(Permission::$variant => $slug,)+
                }
            }
        }

        impl FromStr for Permission {
            type Err = UnknownPermission;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($slug => Ok(Permission::$variant),)+
                    other => Err(UnknownPermission(other.to_string())),
                }
            }
        }
    };
}

permissions! {
    UserListRead => "user.list-read",
    UserListReadAllStatus => "user.list-read--all-status",
    UserItemRead => "user.item-read",
    UserItemCreate => "user.item-create",
    UserItemUpdate => "user.item-update",
    UserItemDelete => "user.item-delete",

    RoleListRead => "role.list-read",
    RoleItemRead => "role.item-read",
    RoleItemCreate => "role.item-create",
    RoleItemUpdate => "role.item-update",
    RoleItemDelete => "role.item-delete",

    PermissionListRead => "permission.list-read",
    PermissionItemRead => "permission.item-read",
    PermissionItemCreate => "permission.item-create",
    PermissionItemUpdate => "permission.item-update",
    PermissionItemDelete => "permission.item-delete",

    CouponListRead => "coupon.list-read",
    CouponListReadAllStatus => "coupon.list-read--all-status",
    CouponListReadAllUserId => "coupon.list-read--all-user-id",
    CouponItemRead => "coupon.item-read",
    CouponItemReadAllStatus => "coupon.item-read--all-status",
    CouponItemReadAllUserId => "coupon.item-read--all-user-id",
    CouponItemCreate => "coupon.item-create",
    CouponItemUpdate => "coupon.item-update",
    CouponItemDelete => "coupon.item-delete",
    CouponItemRedeem => "coupon.item-redeem",
    CouponItemRedeemToAllUserId => "coupon.item-redeem--to-all-user-id",

    ProductListReadAllStatus => "product.list-read--all-status",
    ProductItemReadAllStatus => "product.item-read--all-status",
    ProductItemCreate => "product.item-create",
    ProductItemUpdate => "product.item-update",
    ProductItemDelete => "product.item-delete",

    CategoryItemCreate => "category.item-create",
    CategoryItemUpdate => "category.item-update",
    CategoryItemDelete => "category.item-delete",

    AttachmentListRead => "attachment.list-read",
    AttachmentItemRead => "attachment.item-read",
    AttachmentItemCreate => "attachment.item-create",
    AttachmentItemUpdate => "attachment.item-update",
    AttachmentItemDelete => "attachment.item-delete",

    AxListReadAllStatus => "ax.list-read--all-status",
    AxItemReadAllStatus => "ax.item-read--all-status",
    AxItemCreate => "ax.item-create",
    AxItemUpdate => "ax.item-update",
    AxItemDelete => "ax.item-delete",
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown permission slug: {0}")]
pub struct UnknownPermission(pub String);

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl serde::Serialize for Permission {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_slug_round_trip_for_every_permission() {
        for p in Permission::ALL {
            assert_eq!(p.slug().parse::<Permission>(), Ok(*p));
        }
    }

    #[test]
    fn test_slugs_are_unique() {
        let slugs: HashSet<&str> = Permission::ALL.iter().map(|p| p.slug()).collect();
        assert_eq!(slugs.len(), Permission::ALL.len());
    }

    #[test]
    fn test_unknown_slug() {
        let err = "coupon.fly".parse::<Permission>().unwrap_err();
        assert_eq!(err, UnknownPermission("coupon.fly".to_string()));
        assert_eq!(err.to_string(), "unknown permission slug: coupon.fly");
    }
}
