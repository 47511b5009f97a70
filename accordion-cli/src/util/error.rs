use thiserror::Error;

use crate::copy::CopyReport;

pub fn is_error_silent(err: &anyhow::Error) -> bool {
    err.is::<CopyFailed>()
}

/// Some files of a copy task failed. Each failure was already reported as it happened.
#[derive(Clone, Copy, Error, Debug)]
#[error("{errors} file(s) failed to copy")]
pub struct CopyFailed {
    pub errors: usize,
}

pub trait CopyReportExt {
    fn copied_ok(&self) -> Result<(), CopyFailed>;
}

impl CopyReportExt for CopyReport {
    fn copied_ok(&self) -> Result<(), CopyFailed> {
        if self.is_ok() {
            Ok(())
        } else {
            Err(CopyFailed {
                errors: self.errors,
            })
        }
    }
}
