pub mod assignment;
pub mod tenant;
pub mod user;

pub use assignment::{Assignment, SecurityContext};
pub use tenant::{RoleTemplate, Tenant};
pub use user::{User, UserSearch, MASKED_CREDENTIAL};
