mod diagnostics;

pub use diagnostics::DiagnosticsTask;
