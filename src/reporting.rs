//! Optional reporting context threaded through engine construction.
//!
//! Avoids a process-wide reporter or thread-id registry singleton in favor
//! of an explicit, optional parameter. This module is that parameter: a
//! thin wrapper around a `tracing::Span` that engines enter for the
//! lifetime of a `run()` call. Its absence is the default — engines still
//! emit `tracing` events on the ambient subscriber, they just aren't
//! grouped under a named span.

use tracing::Span;

/// Carries the tracing span an engine should run inside, plus the human
/// label used in its events (e.g. `"knuth-bendix"`, `"todd-coxeter"`).
#[derive(Clone)]
pub struct ReportingContext {
    span: Span,
    label: &'static str,
}

impl ReportingContext {
    pub fn new(label: &'static str) -> Self {
        ReportingContext {
            span: tracing::info_span!("engine", label),
            label,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }
}

impl Default for ReportingContext {
    fn default() -> Self {
        ReportingContext::new("engine")
    }
}

impl std::fmt::Debug for ReportingContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportingContext")
            .field("label", &self.label)
            .finish()
    }
}
