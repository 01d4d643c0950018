//! Command handlers, one module per subcommand.

pub mod checksum;
pub mod completion;
pub mod info;
pub mod install;
pub mod lint;
pub mod test_cmd;
pub mod version;

use std::fmt;

use keg_exec::SessionReport;

/// A session ended in `Failed`.
///
/// The failure has already been reported through stage lines or JSON, so
/// `main` only turns this into the exit code.
#[derive(Debug)]
pub struct SessionFailed {
    pub exit_code: i32,
    pub kind: &'static str,
}

impl fmt::Display for SessionFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session failed ({})", self.kind)
    }
}

impl std::error::Error for SessionFailed {}

/// `Ok` for a succeeded session, [`SessionFailed`] otherwise.
pub(crate) fn session_outcome(report: &SessionReport) -> anyhow::Result<()> {
    match report.failure() {
        None => Ok(()),
        Some(reason) => Err(SessionFailed {
            exit_code: report.exit_code(),
            kind: reason.kind(),
        }
        .into()),
    }
}
