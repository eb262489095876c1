pub mod id;
pub mod role;
pub mod user;

pub use id::{generate_id, UserId};
pub use role::{Role, RoleSpec};
pub use user::{User, UserSpec};
