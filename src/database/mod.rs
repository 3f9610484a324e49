pub mod connection;
pub mod seed;

pub use connection::*;
pub use seed::{ADMIN_ROLE, MEMBER_ROLE, seed_defaults};
