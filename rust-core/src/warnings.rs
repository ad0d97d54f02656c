//! Non-fatal precision diagnostics
//!
//! Warnings go to the `log` facade at `warn` level. Callers that need to
//! observe them programmatically wrap the call in [`capture`].

use std::cell::RefCell;
use std::fmt;

/// Numerically questionable (but not incorrect) requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpectralWarning {
    /// Non-linear averaging requested for complex cross-spectra;
    /// the estimate falls back to Welch (mean) averaging.
    NonLinearCrossAverage { method: String },
}

impl fmt::Display for SpectralWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralWarning::NonLinearCrossAverage { method } => write!(
                f,
                "cannot calculate cross spectral density using the '{method}' method, using 'welch' instead"
            ),
        }
    }
}

thread_local! {
    static CAPTURED: RefCell<Option<Vec<SpectralWarning>>> = RefCell::new(None);
}

/// Emit a warning on the calling thread
pub fn emit(warning: SpectralWarning) {
    log::warn!("{warning}");
    CAPTURED.with(|captured| {
        if let Some(list) = captured.borrow_mut().as_mut() {
            list.push(warning);
        }
    });
}

/// Restores the enclosing capture scope, even on unwind
struct CaptureGuard {
    previous: Option<Option<Vec<SpectralWarning>>>,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            CAPTURED.with(|captured| *captured.borrow_mut() = previous);
        }
    }
}

/// Run `f`, returning its result and every warning it emitted on this thread
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, Vec<SpectralWarning>) {
    let previous = CAPTURED.with(|captured| captured.borrow_mut().replace(Vec::new()));
    let mut guard = CaptureGuard {
        previous: Some(previous),
    };

    let result = f();

    let collected = CAPTURED
        .with(|captured| captured.borrow_mut().take())
        .unwrap_or_default();
    if let Some(previous) = guard.previous.take() {
        CAPTURED.with(|captured| *captured.borrow_mut() = previous);
    }

    (result, collected)
}
