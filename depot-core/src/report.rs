use std::fmt;

/// Outcome of one materialize pass.
///
/// `failed` is in completion order, which varies between runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailureReport {
    pub attempted: usize,
    pub failed: Vec<String>,
}

impl FailureReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn attempted(&self) -> usize {
        self.attempted
    }

    pub fn failed(&self) -> &[String] {
        &self.failed
    }

    pub fn succeeded(&self) -> usize {
        self.attempted.saturating_sub(self.failed.len())
    }
}

impl fmt::Display for FailureReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_success() {
            return write!(f, "all {} files downloaded", self.attempted);
        }
        writeln!(f, "failed files:")?;
        for name in &self.failed {
            writeln!(f, "  {name}")?;
        }
        write!(
            f,
            "{} of {} files failed",
            self.failed.len(),
            self.attempted
        )
    }
}
