use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

/// Capturing group for a spoken or written quantity.
pub const NUM: &str = r"(\d+(?:\.\d+)?|one|two|three|four|five|six|seven|eight|nine|ten|eleven|twelve|fifteen|twenty|a couple of|a couple|couple of|a pair of)";

pub fn parse_number(token: &str) -> Option<Decimal> {
    let token = token.trim().to_ascii_lowercase();
    let word = match token.as_str() {
        "one" => 1,
        "two" | "a couple of" | "a couple" | "couple of" | "a pair of" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "fifteen" => 15,
        "twenty" => 20,
        digits => return Decimal::from_str(&digits.replace(',', "")).ok(),
    };
    Some(Decimal::from(word))
}

pub fn parse_count(token: &str) -> Option<u32> {
    let value = parse_number(token)?;
    if !value.fract().is_zero() {
        return None;
    }
    value.to_u32()
}

/// Formats a whole number with thousands separators (`1200` -> `1,200`).
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (position, digit) in digits.chars().enumerate() {
        if position > 0 && (digits.len() - position) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{group_thousands, parse_count, parse_number};

    #[test]
    fn spelled_out_numbers_map_to_values() {
        assert_eq!(parse_number("Three"), Some(Decimal::from(3)));
        assert_eq!(parse_number("a couple of"), Some(Decimal::from(2)));
        assert_eq!(parse_number("1.5"), Some(Decimal::new(15, 1)));
        assert_eq!(parse_number("several"), None);
    }

    #[test]
    fn counts_reject_fractions() {
        assert_eq!(parse_count("4"), Some(4));
        assert_eq!(parse_count("twelve"), Some(12));
        assert_eq!(parse_count("2.5"), None);
    }

    #[test]
    fn thousands_are_grouped() {
        assert_eq!(group_thousands(950), "950");
        assert_eq!(group_thousands(1200), "1,200");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }
}
