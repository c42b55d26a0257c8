//! Fixed-point conversions between request decimals and stored integers
//!
//! Prices become minor units (cents) and volumes become centiliters. Both use
//! `f64::round`, which rounds half away from zero.

/// Convert a decimal currency amount to minor units
pub fn to_minor(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Convert a decimal liter amount to centiliters
pub fn to_centi(liters: f64) -> i64 {
    (liters * 100.0).round() as i64
}

pub fn minor_to_decimal(minor: i64) -> f64 {
    minor as f64 / 100.0
}

pub fn centi_to_decimal(centi: i64) -> f64 {
    centi as f64 / 100.0
}

/// Render minor units the way invoices are printed: `1.234,56 €`
pub fn format_money(minor: i64) -> String {
    format!("{} €", format_grouped(minor))
}

/// Render centiliters as liters with two decimals: `42,50`
pub fn format_liters(centi: i64) -> String {
    format_grouped(centi)
}

/// Render whole kilometres with thousands separators: `12.345`
pub fn format_km(km: i64) -> String {
    let sign = if km < 0 { "-" } else { "" };
    format!("{}{}", sign, group_thousands(km.unsigned_abs()))
}

fn format_grouped(hundredths: i64) -> String {
    let sign = if hundredths < 0 { "-" } else { "" };
    let abs = hundredths.unsigned_abs();
    format!("{}{},{:02}", sign, group_thousands(abs / 100), abs % 100)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_minor_rounds_half_away_from_zero() {
        assert_eq!(to_minor(0.125), 13);
        assert_eq!(to_minor(-0.125), -13);
        assert_eq!(to_minor(8.0), 800);
        assert_eq!(to_minor(19.99), 1999);
    }

    #[test]
    fn test_to_centi() {
        assert_eq!(to_centi(10.0), 1000);
        assert_eq!(to_centi(42.5), 4250);
        assert_eq!(to_centi(0.375), 38);
    }

    #[test]
    fn test_format_money() {
        assert_eq!(format_money(0), "0,00 €");
        assert_eq!(format_money(123456), "1.234,56 €");
        assert_eq!(format_money(500000), "5.000,00 €");
        assert_eq!(format_money(123456789), "1.234.567,89 €");
        assert_eq!(format_money(-2550), "-25,50 €");
    }

    #[test]
    fn test_format_liters() {
        assert_eq!(format_liters(4250), "42,50");
        assert_eq!(format_liters(5), "0,05");
    }

    #[test]
    fn test_format_km() {
        assert_eq!(format_km(950), "950");
        assert_eq!(format_km(123456), "123.456");
    }
}
