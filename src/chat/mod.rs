pub mod error;
pub mod session;

pub use error::ChatError;
pub use session::{ChatExchange, ChatSession, FALLBACK_REPLY};
