use chrono::{Duration, Local};
use dirscout::query::{parse_date, parse_size, tokenize};
use dirscout::{is_incomplete, match_glob, parse, DirectiveKind, DirectiveType, Operator};

/// 複数ディレクティブの解析テスト
#[test]
fn test_mixed_query() {
    let query = parse(r#"ext:.RS size:>1MB "contents:hello world" main*"#);
    let types: Vec<DirectiveType> = query.directives.iter().map(|d| d.directive_type()).collect();
    assert_eq!(
        types,
        vec![
            DirectiveType::Ext,
            DirectiveType::Size,
            DirectiveType::Contents,
            DirectiveType::Filename,
        ]
    );

    assert_eq!(query.directives[0].kind, DirectiveKind::Ext(".rs".to_string()));
    assert_eq!(
        query.directives[1].kind,
        DirectiveKind::Size {
            op: Operator::Gt,
            bytes: 1024 * 1024
        }
    );
    assert_eq!(query.contents_pattern(), Some("hello world"));
    assert_eq!(query.directives[3].kind, DirectiveKind::Filename("main*".to_string()));
}

/// 空白のみのクエリは空になる
#[test]
fn test_blank_query_is_empty() {
    assert!(parse("").is_empty());
    assert!(parse(" \t  ").is_empty());
    assert_eq!(parse("").max_depth(10), 1);
}

/// 未知のプレフィックスはファイル名として扱う
#[test]
fn test_unknown_prefix_is_filename() {
    let query = parse("http://example.com");
    assert_eq!(query.len(), 1);
    assert_eq!(
        query.directives[0].kind,
        DirectiveKind::Filename("http://example.com".to_string())
    );
}

/// クォートの扱い
#[test]
fn test_tokenize_quotes() {
    assert_eq!(
        tokenize(r#"a "b c" 'd "e" f'"#),
        vec!["a", "b c", r#"d "e" f"#]
    );
    assert_eq!(tokenize("  spaced   out  "), vec!["spaced", "out"]);
}

/// 再帰深度の既定値とフォールバック
#[test]
fn test_recursive_depths() {
    assert_eq!(parse("recursive:4").max_depth(10), 4);
    assert_eq!(parse("recursive:").max_depth(10), 2);
    assert_eq!(parse("recursive:deep").max_depth(10), 10);
    assert_eq!(parse("ext:go").max_depth(10), 1);
}

/// サイズ単位の解析
#[test]
fn test_size_units() {
    assert_eq!(parse_size("512"), (Operator::Eq, 512));
    assert_eq!(parse_size("<=2k"), (Operator::Lte, 2048));
    assert_eq!(parse_size(">=1.5MB"), (Operator::Gte, 1_572_864));
    assert_eq!(parse_size("1G"), (Operator::Eq, 1024 * 1024 * 1024));
    assert_eq!(parse_size("lots").1, 0);
}

/// 日付キーワードの解析
#[test]
fn test_date_keywords() {
    let (op, time) = parse_date("week");
    assert_eq!(op, Operator::Gte);
    let time = time.expect("week resolves to a time");
    let expected = Local::now() - Duration::days(7);
    assert!((time - expected).num_seconds().abs() < 5);

    let (op, time) = parse_date("<2024-03-01");
    assert_eq!(op, Operator::Lt);
    assert_eq!(
        time.map(|t| t.format("%Y-%m-%d").to_string()),
        Some("2024-03-01".to_string())
    );

    assert_eq!(parse_date("not a date").1, None);
}

/// グロブマッチング
#[test]
fn test_glob_matching() {
    assert!(match_glob("main.go", "*.go"));
    assert!(match_glob("main_test.go", "main*test*"));
    assert!(!match_glob("main.rs", "*.go"));
    assert!(match_glob("README.md", "readme"));
    assert!(!match_glob("abc", "a*bc*bc"));
}

/// 入力途中の判定
#[test]
fn test_incomplete_input() {
    assert!(is_incomplete("ext:"));
    assert!(is_incomplete("main contents:"));
    assert!(!is_incomplete("recursive:"));
    assert!(!is_incomplete("ext:go"));
    assert!(!is_incomplete("ext: "));
    assert!(!is_incomplete("foo:"));
}
