//! Size directive values.

use super::Operator;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Parse a size directive value such as `>1MB`, `<=512kb` or `100`.
///
/// The operator defaults to `=`. An unparseable magnitude becomes 0 bytes.
pub fn parse_size(raw: &str) -> (Operator, u64) {
    let (op, magnitude) = Operator::split_prefix(raw.trim());
    (op.unwrap_or(Operator::Eq), parse_magnitude(magnitude).unwrap_or(0))
}

fn parse_magnitude(raw: &str) -> Option<u64> {
    let trimmed = raw.trim();
    let split = trimmed
        .find(|ch: char| !(ch.is_ascii_digit() || ch == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);
    if number.is_empty() {
        return None;
    }

    let value: f64 = number.parse().ok()?;
    let bytes = (value * unit_multiplier(unit)? as f64).round();
    if !bytes.is_finite() || bytes < 0.0 {
        return None;
    }

    if bytes >= u64::MAX as f64 {
        Some(u64::MAX)
    } else {
        Some(bytes as u64)
    }
}

fn unit_multiplier(unit: &str) -> Option<u64> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "" | "b" => Some(1),
        "k" | "kb" => Some(KB),
        "m" | "mb" => Some(MB),
        "g" | "gb" => Some(GB),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units() {
        assert_eq!(parse_size("100"), (Operator::Eq, 100));
        assert_eq!(parse_size("100B"), (Operator::Eq, 100));
        assert_eq!(parse_size("2kb"), (Operator::Eq, 2048));
        assert_eq!(parse_size(">1MB"), (Operator::Gt, 1_048_576));
        assert_eq!(parse_size("<=1Gb"), (Operator::Lte, 1_073_741_824));
    }

    #[test]
    fn test_fractional_magnitude() {
        assert_eq!(parse_size(">=1.5k"), (Operator::Gte, 1536));
    }

    #[test]
    fn test_unparseable_magnitude_is_zero() {
        assert_eq!(parse_size(">huge"), (Operator::Gt, 0));
        assert_eq!(parse_size("10parsecs"), (Operator::Eq, 0));
        assert_eq!(parse_size("1.2.3mb"), (Operator::Eq, 0));
    }
}
