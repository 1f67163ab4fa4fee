//! Editor-facing helpers built on `drools-core`.
//!
//! Converts parse diagnostics into LSP diagnostics, answers hover requests
//! from the parsed tree, and caches parse results per open document. The
//! transport and session wiring of a language server live with the host.

pub mod diagnostics;
pub mod document;
pub mod hover;

pub use diagnostics::to_lsp_diagnostics;
pub use document::DocumentCache;
pub use hover::compute_hover;

/// Convert a core range into an LSP range. Columns are character offsets
/// on both sides.
pub(crate) fn lsp_range(range: drools_core::Range) -> lsp_types::Range {
    lsp_types::Range::new(
        lsp_types::Position::new(range.start.line, range.start.column),
        lsp_types::Position::new(range.end.line, range.end.column),
    )
}
