//! Reporter (§4.G): review-comment and chat-channel dispatch.

pub mod messages;
pub mod reporter;
pub mod traits;

pub use reporter::Reporter;
pub use traits::{BugInfo, BugTracker, NoBugTracker, ReviewFeed};
