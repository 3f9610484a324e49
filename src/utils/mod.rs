pub mod code_generator;
pub mod crud;
pub mod jwt;
pub mod password;
pub mod validation;

pub use code_generator::*;
pub use jwt::*;
pub use password::*;
pub use validation::*;
