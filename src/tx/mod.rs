//! Transaction lifecycle.
//!
//! # Data Flow
//! ```text
//! transaction.rs (orchestration, one direction per attempt)
//!     → tapos.rs (block reference + expiration from the node)
//!     → encode.rs (consensus wire bytes → SHA-256 signing digest)
//!     → wallet.rs (canonical recoverable signature)
//!     → broadcast.rs (submit; re-preparable rejections loop back to tapos)
//! ```

pub mod broadcast;
pub mod encode;
pub mod operation;
pub mod tapos;
pub mod transaction;
