//! Query tokenizer and directive parser

use super::{
    date::parse_date, size::parse_size, Directive, DirectiveKind, DirectiveType, Query,
    DEFAULT_RECURSIVE_DEPTH,
};

/// Parse a raw search string into a query.
///
/// Never fails: tokens that are not well-formed directives become filename
/// directives on the literal token.
pub fn parse(input: &str) -> Query {
    let raw = input.trim();
    if raw.is_empty() {
        return Query::default();
    }

    let directives = tokenize(raw).into_iter().map(|token| parse_token(&token)).collect();

    Query {
        raw: raw.to_string(),
        directives,
    }
}

/// Split on whitespace, keeping quoted spans together and stripping the quotes.
///
/// A quote of the other kind inside a quoted span is ordinary text.
pub fn tokenize(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in input.chars() {
        match quote {
            Some(open) if ch == open => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => quote = Some(ch),
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }

    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

fn parse_token(token: &str) -> Directive {
    let literal = || Directive {
        value: token.to_string(),
        kind: DirectiveKind::Filename(token.to_string()),
    };

    let Some((name, value)) = token.split_once(':') else {
        return literal();
    };
    let Some(directive_type) = DirectiveType::from_name(name) else {
        return literal();
    };

    if value.is_empty() && directive_type != DirectiveType::Recursive {
        return literal();
    }

    let kind = match directive_type {
        DirectiveType::Filename => DirectiveKind::Filename(value.to_string()),
        DirectiveType::Contents => DirectiveKind::Contents(value.to_string()),
        DirectiveType::Ext => DirectiveKind::Ext(normalize_extension(value)),
        DirectiveType::Size => {
            let (op, bytes) = parse_size(value);
            DirectiveKind::Size { op, bytes }
        }
        DirectiveType::Modified => {
            let (op, time) = parse_date(value);
            DirectiveKind::Modified { op, time }
        }
        DirectiveType::Recursive => DirectiveKind::Recursive {
            depth: parse_depth(value),
        },
    };

    Directive {
        value: value.to_string(),
        kind,
    }
}

fn normalize_extension(value: &str) -> String {
    let lower = value.trim().to_lowercase();
    if lower.starts_with('.') {
        lower
    } else {
        format!(".{lower}")
    }
}

fn parse_depth(value: &str) -> u32 {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return DEFAULT_RECURSIVE_DEPTH;
    }
    trimmed.parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Operator;
    use chrono::Local;

    #[test]
    fn test_empty_query() {
        let query = parse("");
        assert!(query.is_empty());
        assert!(parse("   \t ").is_empty());
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"contents:"hello world" ext:rs"#),
            vec!["contents:hello world", "ext:rs"]
        );
        assert_eq!(tokenize("'it is' \"don't\""), vec!["it is", "don't"]);
        assert_eq!(tokenize("  a   b  "), vec!["a", "b"]);
    }

    #[test]
    fn test_unterminated_quote_keeps_rest() {
        assert_eq!(tokenize("name:\"my file"), vec!["name:my file"]);
    }

    #[test]
    fn test_ext_normalization() {
        for input in ["ext:go", "ext:.go", "EXT:GO", "extension:.Go", "type:go"] {
            let query = parse(input);
            assert_eq!(query.len(), 1, "{input}");
            assert_eq!(query.directives[0].kind, DirectiveKind::Ext(".go".to_string()));
        }
    }

    #[test]
    fn test_size_directive() {
        let query = parse("size:>1MB");
        let directive = &query.directives[0];
        assert_eq!(directive.directive_type(), DirectiveType::Size);
        assert_eq!(directive.operator(), Some(Operator::Gt));
        assert_eq!(
            directive.kind,
            DirectiveKind::Size {
                op: Operator::Gt,
                bytes: 1_048_576
            }
        );
        assert_eq!(directive.value, ">1MB");
    }

    #[test]
    fn test_modified_today() {
        let query = parse("modified:today");
        match &query.directives[0].kind {
            DirectiveKind::Modified { op, time } => {
                assert_eq!(*op, Operator::Eq);
                let time = time.as_ref().expect("today should parse");
                assert_eq!(time.date_naive(), Local::now().date_naive());
            }
            other => panic!("unexpected directive: {other:?}"),
        }
    }

    #[test]
    fn test_recursive_variants() {
        assert_eq!(parse("recursive:").recursion(), Some(DEFAULT_RECURSIVE_DEPTH));
        assert_eq!(parse("r:4").recursion(), Some(4));
        assert_eq!(parse("depth:abc").recursion(), Some(0));
        assert_eq!(parse("RECURSE:3").recursion(), Some(3));
    }

    #[test]
    fn test_unknown_prefix_is_filename() {
        let query = parse("owner:me");
        assert_eq!(
            query.directives[0].kind,
            DirectiveKind::Filename("owner:me".to_string())
        );
    }

    #[test]
    fn test_bare_prefix_is_literal_filename() {
        let query = parse("contents:");
        assert_eq!(
            query.directives[0].kind,
            DirectiveKind::Filename("contents:".to_string())
        );
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let query = parse("contents:http://localhost:8080");
        assert_eq!(
            query.directives[0].kind,
            DirectiveKind::Contents("http://localhost:8080".to_string())
        );
    }

    #[test]
    fn test_directives_keep_input_order() {
        let query = parse("main contents:func ext:go");
        let types: Vec<DirectiveType> = query
            .directives
            .iter()
            .map(Directive::directive_type)
            .collect();
        assert_eq!(
            types,
            vec![DirectiveType::Filename, DirectiveType::Contents, DirectiveType::Ext]
        );
        assert_eq!(query.raw, "main contents:func ext:go");
    }
}
