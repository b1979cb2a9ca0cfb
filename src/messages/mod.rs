pub mod store;
pub mod visibility;

pub use store::{MessageStore, parse_limit};
pub use visibility::is_visible;
