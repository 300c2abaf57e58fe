//! Canonical number text.
//!
//! The wire form and string coercion share one rendering so that every `f64`, including `NaN`,
//! both infinities and `-0`, survives a render/parse round trip.

/// Renders `n` in canonical text: `NaN`, `Infinity`, `-Infinity`, the shortest round-trip decimal
/// inside `[1e-6, 1e21)`, exponent form (`1e+21`, `1.5e-7`) outside it.
pub fn render_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    let abs = n.abs();
    if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
        let text = format!("{:e}", n);
        return match text.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => text,
        };
    }
    format!("{}", n)
}

/// Parses canonical number text. Returns `None` for anything that is not a number literal.
pub fn parse_number(text: &str) -> Option<f64> {
    match text {
        "NaN" => Some(f64::NAN),
        "Infinity" | "+Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ if text.is_empty() || text.trim() != text => None,
        _ if text.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => None,
        _ => text.parse::<f64>().ok(),
    }
}

/// String to number coercion: surrounding whitespace is ignored, empty text is `0`, anything
/// unparseable is `NaN`.
pub fn coerce_str(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return i64::from_str_radix(hex, 16)
            .map(|v| v as f64)
            .unwrap_or(f64::NAN);
    }
    parse_number(trimmed).unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_integers_without_fraction() {
        assert_eq!(render_number(42.0), "42");
        assert_eq!(render_number(-273.15), "-273.15");
        assert_eq!(render_number(9007199254740991.0), "9007199254740991");
    }

    #[test]
    fn renders_non_finite_values() {
        assert_eq!(render_number(f64::NAN), "NaN");
        assert_eq!(render_number(f64::INFINITY), "Infinity");
        assert_eq!(render_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn switches_to_exponent_form_at_the_edges() {
        assert_eq!(render_number(1e21), "1e+21");
        assert_eq!(render_number(1.5e-7), "1.5e-7");
        assert_eq!(render_number(1e20), "100000000000000000000");
        assert_eq!(render_number(0.000001), "0.000001");
    }

    #[test]
    fn parse_inverts_render() {
        for n in [0.1, -0.0, 1e300, 5e-324, 3.14159, 1e21, -1.5e-7] {
            let parsed = parse_number(&render_number(n)).unwrap();
            assert_eq!(parsed.to_bits(), n.to_bits(), "{}", n);
        }
        assert!(parse_number("NaN").unwrap().is_nan());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number(" 1"), None);
        assert_eq!(parse_number("inf"), None);
    }

    #[test]
    fn coercion_is_lenient() {
        assert_eq!(coerce_str("  12 "), 12.0);
        assert_eq!(coerce_str(""), 0.0);
        assert_eq!(coerce_str("0x1f"), 31.0);
        assert!(coerce_str("twelve").is_nan());
    }
}
