/// Consensus prices are published with three decimals.
pub fn format_price(value: f64) -> String {
    if value.is_finite() {
        format!("{:.3}", value)
    } else {
        String::new()
    }
}

/// General format with `digits` significant figures: fixed notation for
/// moderate exponents, scientific otherwise, trailing zeros dropped.
pub fn format_significant(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return String::new();
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let digits = digits.max(1);

    // Let the formatter do the rounding so a carry (9.99995 -> 10.000) moves the exponent
    let scientific = format!("{:.*e}", digits - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((mantissa, exponent)) => (mantissa, exponent.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };

    if exponent < -4 || exponent >= digits as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        return format!("{}e{}{:02}", trim_fraction(mantissa), sign, exponent.abs());
    }

    let decimals = (digits as i32 - 1 - exponent).max(0) as usize;
    trim_fraction(&format!("{:.*}", decimals, value)).to_string()
}

fn trim_fraction(number: &str) -> &str {
    if number.contains('.') {
        number.trim_end_matches('0').trim_end_matches('.')
    } else {
        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prices_have_three_decimals() {
        assert_eq!(format_price(98.25), "98.250");
        assert_eq!(format_price(98.12345), "98.123");
        assert_eq!(format_price(f64::NAN), "");
    }

    #[test]
    fn significant_figures() {
        assert_eq!(format_significant(1.0, 5), "1");
        assert_eq!(format_significant(0.95, 5), "0.95");
        assert_eq!(format_significant(90.0 / 91.0, 5), "0.98901");
        assert_eq!(format_significant(-0.95, 5), "-0.95");
        assert_eq!(format_significant(0.000012345, 5), "1.2345e-05");
        assert_eq!(format_significant(123456.0, 5), "1.2346e+05");
        assert_eq!(format_significant(12.5, 5), "12.5");
        assert_eq!(format_significant(0.0, 5), "0");
    }
}
