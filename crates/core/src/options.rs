use serde::{Deserialize, Serialize};

/// Default cap on the number of diagnostics collected per parse.
pub const DEFAULT_MAX_ERRORS: usize = 100;
/// Default cap on keyword-pattern nesting before content is kept flat.
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 50;

/// Tuning knobs for a single parse call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ParseOptions {
    /// Diagnostics beyond this count are dropped; parsing continues.
    pub max_errors: usize,
    /// Keyword patterns nested deeper than this are not recursed into.
    pub max_nesting_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            max_errors: DEFAULT_MAX_ERRORS,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}
