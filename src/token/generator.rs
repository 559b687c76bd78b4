//! Random token generation

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::{Rng, RngCore};

/// Digits in a one-time login code.
pub const OTP_LENGTH: usize = 6;

/// Random bytes behind a share token (256 bits).
pub const SHARE_TOKEN_BYTES: usize = 32;

/// Draws each digit independently and uniformly from 0-9, so leading zeros
/// occur with their natural frequency.
pub fn numeric_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..OTP_LENGTH)
        .map(|_| char::from(b'0' + rng.random_range(0..10u8)))
        .collect()
}

/// A fresh 6-digit login code.
pub fn generate_otp() -> String {
    numeric_code(&mut rand::rng())
}

/// A URL-safe, unpadded token carrying 256 bits from the thread-local CSPRNG.
pub fn generate_share_token() -> String {
    let mut bytes = [0u8; SHARE_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn otp_is_always_six_digits() {
        for _ in 0..1_000 {
            let code = generate_otp();
            assert_eq!(code.len(), OTP_LENGTH);
            assert!(code.chars().all(|c| c.is_ascii_digit()), "{}", code);
        }
    }

    #[test]
    fn otp_digits_are_uniform_in_every_position() {
        const SAMPLES: usize = 100_000;
        let mut counts = [[0usize; 10]; OTP_LENGTH];
        let mut rng = rand::rng();

        for _ in 0..SAMPLES {
            let code = numeric_code(&mut rng);
            for (position, digit) in code.bytes().enumerate() {
                counts[position][(digit - b'0') as usize] += 1;
            }
        }

        // Expected 10_000 per cell, standard deviation ~95. Chi-square with
        // 9 degrees of freedom stays far below 40 for a uniform source.
        let expected = SAMPLES as f64 / 10.0;
        for (position, row) in counts.iter().enumerate() {
            let chi_square: f64 = row
                .iter()
                .map(|&observed| {
                    let diff = observed as f64 - expected;
                    diff * diff / expected
                })
                .sum();
            assert!(
                chi_square < 40.0,
                "position {} looks biased: {:?} (chi2 {:.1})",
                position,
                row,
                chi_square
            );
            assert!(row[0] > 9_000, "leading zeros are under-represented at {}", position);
        }
    }

    #[test]
    fn share_token_is_url_safe_and_unpadded() {
        let token = generate_share_token();
        // 32 bytes -> ceil(256 / 6) = 43 base64 characters without padding
        assert_eq!(token.len(), 43);
        assert!(
            token
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'),
            "{}",
            token
        );
        assert_eq!(URL_SAFE_NO_PAD.decode(&token).unwrap().len(), SHARE_TOKEN_BYTES);
    }

    #[test]
    fn share_tokens_do_not_repeat() {
        let tokens: HashSet<String> = (0..10_000).map(|_| generate_share_token()).collect();
        assert_eq!(tokens.len(), 10_000);
    }
}
