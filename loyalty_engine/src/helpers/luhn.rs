//! Check digit validation for order numbers.
//!
//! Order numbers carry a Luhn check digit. Walking the digits from right to left, every second digit (starting with
//! the second-from-right) is doubled, and 9 is subtracted from any doubled value above 9. The number is valid if the
//! sum of all resulting digits is a multiple of 10.

/// Returns true if `number` is a non-empty string of ASCII digits with a valid Luhn check digit.
pub fn is_valid_order_number(number: &str) -> bool {
    if number.is_empty() {
        return false;
    }
    let mut sum = 0u64;
    for (i, c) in number.bytes().rev().enumerate() {
        if !c.is_ascii_digit() {
            return false;
        }
        let mut digit = u64::from(c - b'0');
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}
