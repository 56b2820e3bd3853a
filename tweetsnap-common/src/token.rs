use crate::{
    contract::{TOKEN_RADIX, TOKEN_SCALE, TOKEN_STRIPPED_CHARS},
    model::PostId,
};
use std::f64::consts::PI;

const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// Digit for digit what `Number.prototype.toString(36)` produces upstream.
#[must_use]
pub fn derive_token(id: &PostId) -> String {
    // A digit string of bounded length always parses.
    let magnitude: f64 = id.as_str().parse().unwrap_or_default();
    let value = magnitude / TOKEN_SCALE * PI;

    to_radix_string(value, TOKEN_RADIX)
        .chars()
        .filter(|c| !TOKEN_STRIPPED_CHARS.contains(c))
        .collect()
}

/// Unbiased binary exponent of `value`, scaled so that `value = m * 2^e`
/// with an integral 53-bit significand `m`.
fn exponent(value: f64) -> i32 {
    #[allow(clippy::cast_possible_truncation)]
    let biased = ((value.to_bits() >> 52) & 0x7FF) as i32;
    if biased == 0 { -1074 } else { biased - 1075 }
}

/// Formats a finite `value` in `radix` (2..=36), emitting only as many
/// fraction digits as the input precision carries.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]
pub(crate) fn to_radix_string(value: f64, radix: u32) -> String {
    debug_assert!((2..=36).contains(&radix));
    debug_assert!(value.is_finite());

    let radix_f = f64::from(radix);
    let negative = value < 0.0;
    let value = value.abs();

    let mut integer = value.floor();
    let mut fraction = value - integer;
    // Half the distance to the next representable value.
    let mut delta = (0.5 * (value.next_up() - value)).max(0.0_f64.next_up());

    let mut fraction_digits: Vec<u32> = Vec::new();
    if fraction >= delta {
        loop {
            fraction *= radix_f;
            delta *= radix_f;

            let digit = fraction as u32;
            fraction_digits.push(digit);
            fraction -= f64::from(digit);

            // Round half to even, carrying into earlier digits when needed.
            if (fraction > 0.5 || (fraction == 0.5 && digit & 1 == 1)) && fraction + delta > 1.0 {
                loop {
                    match fraction_digits.pop() {
                        None => {
                            integer += 1.0;
                            break;
                        }
                        Some(last) if last + 1 < radix => {
                            fraction_digits.push(last + 1);
                            break;
                        }
                        Some(_) => {}
                    }
                }
                break;
            }

            if fraction < delta {
                break;
            }
        }
    }

    // Digits below the precision of `integer` are reported as zeros.
    let mut integer_digits = Vec::new();
    while exponent(integer / radix_f) > 0 {
        integer /= radix_f;
        integer_digits.push(b'0');
    }
    loop {
        let remainder = integer % radix_f;
        integer_digits.push(DIGITS[remainder as usize]);
        integer = (integer - remainder) / radix_f;
        if integer <= 0.0 {
            break;
        }
    }

    let mut out = String::with_capacity(integer_digits.len() + fraction_digits.len() + 2);
    if negative {
        out.push('-');
    }
    out.extend(integer_digits.iter().rev().map(|&digit| char::from(digit)));
    if !fraction_digits.is_empty() {
        out.push('.');
        out.extend(
            fraction_digits
                .iter()
                .map(|&digit| char::from(DIGITS[digit as usize])),
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::{
        model::PostId,
        token::{derive_token, to_radix_string},
    };
    use std::f64::consts::PI;

    fn token(id: &str) -> String {
        derive_token(&id.parse::<PostId>().unwrap())
    }

    #[test]
    fn known_tokens() {
        let vectors = [
            ("1234567890123456789", "2zqic77uqyk"),
            ("1683920951807971329", "42y6zv7ufp"),
            ("20", "6dq1a2xwd93"),
            ("1", "bhi2ay3f28n"),
            ("1000000000000000", "353i5ab8p5f"),
            ("9999999999999999999999999999999999999999", "3y3tcpnza16"),
            ("0", ""),
        ];

        for (id, expected) in vectors {
            assert_eq!(token(id), expected, "token for {id}");
        }
    }

    #[test]
    fn radix_representation_before_stripping() {
        assert_eq!(
            to_radix_string(1_234_567_890_123_456_789.0 / 1e15 * PI, 36),
            "2zq.ic77uqyk"
        );
        assert_eq!(to_radix_string(20.0 / 1e15 * PI, 36), "0.000000006dq1a2xwd93");
        assert_eq!(to_radix_string(1_683_920_951_807_971_329.0 / 1e15 * PI, 36), "42y.6z0v7ufp");
    }

    #[test]
    fn radix_of_plain_numbers() {
        assert_eq!(to_radix_string(0.0, 36), "0");
        assert_eq!(to_radix_string(255.0, 16), "ff");
        assert_eq!(to_radix_string(0.5, 2), "0.1");
        assert_eq!(to_radix_string(35.0, 36), "z");
        assert_eq!(to_radix_string(-10.25, 2), "-1010.01");
        assert_eq!(to_radix_string(2f64.powi(60), 2), format!("1{}", "0".repeat(60)));
    }

    #[test]
    fn tokens_are_deterministic_and_stripped() {
        let mut id = String::new();
        for digit in "31415926535897932384626433832795028841".chars() {
            id.push(digit);
            let first = token(&id);
            assert_eq!(first, token(&id));
            assert!(!first.contains('0'), "{id} -> {first}");
            assert!(!first.contains('.'), "{id} -> {first}");
        }
    }
}
