pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock, format_clock_time};
pub use error::{ChatError, Result};
pub use types::{BROADCAST, Message, MessageDraft, MessageKind, Participant};
