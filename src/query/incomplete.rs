//! Caller-side check for half-typed directives.
//!
//! Search-as-you-type callers use this to hold off submitting `ext:` or
//! `contents:` before a value has been typed. The parser itself accepts
//! such input and treats it as a literal filename.

use super::{tokenize, DirectiveType};

/// True when the last token is a known directive name followed by a bare `:`.
///
/// `recursive:` and its aliases are complete on their own and never count.
pub fn is_incomplete(raw: &str) -> bool {
    if raw.ends_with(char::is_whitespace) {
        return false;
    }

    let tokens = tokenize(raw);
    let Some(last) = tokens.last() else {
        return false;
    };
    let Some(name) = last.strip_suffix(':') else {
        return false;
    };

    matches!(
        DirectiveType::from_name(name),
        Some(directive_type) if directive_type != DirectiveType::Recursive
    )
}
