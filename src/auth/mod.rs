pub mod guard;
pub mod password;
pub mod role;
pub mod token;

pub use guard::{authorize, Denial, RoleSet, RoleSetError};
pub use password::{hash_password, verify_password};
pub use role::{ParseRoleError, Role};
pub use token::{inspect, Claims, IssuedToken, JwtError, TokenService, MAX_EXPIRY_HOURS};
