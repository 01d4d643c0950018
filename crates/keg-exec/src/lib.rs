//! Install-lifecycle executor for keg formulas.
//!
//! An [`Executor`](session::Executor) takes one
//! [`FormulaDescriptor`](keg_formula::FormulaDescriptor) through a strictly
//! linear state machine:
//!
//! ```text
//! Fetching -> Verifying -> Extracting -> Building -> Testing -> Succeeded
//!     \___________\____________\____________\___________\-----> Failed(reason)
//! ```
//!
//! Every session owns a scoped temporary work directory that is removed on
//! every exit path. Checksum verification is a hard gate: nothing from the
//! archive is extracted or executed unless its digest matches.

pub mod deps;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod process;
pub mod session;
pub mod state;
pub mod verify;

pub use error::{FailureReason, StepFailure};
pub use session::{Executor, Interrupt, SessionObserver, SessionReport};
pub use state::{SessionState, Stage};
