pub mod role;
pub mod session;
pub mod validation;

pub use role::Role;
pub use session::{DialogSession, DocKind, FileRef, FileSlot, FlowState, SESSION_TTL_SECS};
pub use validation::{RuleUpdateReply, ValidationResult};
