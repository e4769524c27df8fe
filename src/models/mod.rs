pub mod contact;
pub mod tag;
pub mod user;

pub use contact::*;
pub use tag::*;
pub use user::*;
