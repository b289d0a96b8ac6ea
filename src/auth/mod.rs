pub mod claims;
pub mod extractors;
pub mod jwt;
pub mod password;

pub use claims::{Claims, Identity};
pub use extractors::{AuthUser, MaybeAuthUser};
pub use jwt::JwtKeys;
