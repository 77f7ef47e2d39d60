use super::eval::EvalValue;

/// Format a number the way it round-trips as cell text (`5`, not `5.0`).
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "#NAN!".to_string()
    } else if n.is_infinite() {
        "#INF!".to_string()
    } else if n == 0.0 {
        // Covers -0.0 as well.
        "0".to_string()
    } else {
        n.to_string()
    }
}

/// Format an evaluated value for display.
pub fn format_value(value: &EvalValue) -> String {
    match value {
        EvalValue::Null => String::new(),
        EvalValue::Number(n) => format_number(*n),
        EvalValue::Text(s) => s.clone(),
        EvalValue::Error(e) => e.code().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_drops_trailing_zero() {
        assert_eq!(format_number(5.0), "5");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(f64::INFINITY), "#INF!");
    }
}
