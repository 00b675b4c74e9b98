mod content;
mod user;

pub use content::*;
pub use user::*;
