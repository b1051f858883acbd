//! Shell execution for the toolbelt `bash` tool.
//!
//! [`CommandSession`] owns one long-lived shell process and runs command
//! lines against it, detecting completion with a per-command sentinel and
//! bounding every command with a timeout. A timed-out session stays unusable
//! until the caller asks for a restart. [`run_once`] covers the one-shot case
//! with the same process-group and demotion handling.

pub mod capture;
pub mod demote;
pub mod oneshot;
pub mod process_group;
pub mod session;

pub use demote::Demotion;
pub use oneshot::{OneShotOptions, OneShotOutput, run_once};
pub use session::{CommandSession, SessionOptions};
