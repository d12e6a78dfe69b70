//! Secret generation.
//!
//! Both generators draw from the operating system CSPRNG on every call and
//! keep no state between calls.

use data_encoding::BASE32_NOPAD;
use rand::RngCore;
use rand::rngs::OsRng;

use crate::error::AuthError;

/// Entropy behind an opaque token.
pub const OPAQUE_TOKEN_BYTES: usize = 16;

/// Length of an encoded opaque token (16 bytes in unpadded base32).
pub const OPAQUE_TOKEN_LEN: usize = 26;

/// Number of digits in a verification code.
pub const NUMERIC_CODE_DIGITS: usize = 6;

const CODE_SPACE: u32 = 1_000_000;

/// Returns a 26-character base32 token backed by 16 random bytes.
pub fn generate_opaque_token() -> Result<String, AuthError> {
    opaque_token_from(&mut OsRng)
}

/// Returns a uniformly distributed code in `000000..=999999`.
pub fn generate_numeric_code() -> Result<String, AuthError> {
    numeric_code_from(&mut OsRng)
}

fn opaque_token_from<R: RngCore + ?Sized>(rng: &mut R) -> Result<String, AuthError> {
    let mut bytes = [0u8; OPAQUE_TOKEN_BYTES];
    rng.try_fill_bytes(&mut bytes)?;
    Ok(BASE32_NOPAD.encode(&bytes))
}

fn numeric_code_from<R: RngCore + ?Sized>(rng: &mut R) -> Result<String, AuthError> {
    // Draws at or above the last whole multiple of CODE_SPACE are redrawn so
    // every code is equally likely.
    let zone = u32::MAX - (u32::MAX % CODE_SPACE);

    loop {
        let mut buf = [0u8; 4];
        rng.try_fill_bytes(&mut buf)?;
        let value = u32::from_le_bytes(buf);

        if value < zone {
            return Ok(format!(
                "{:0width$}",
                value % CODE_SPACE,
                width = NUMERIC_CODE_DIGITS
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct BrokenRng;

    impl RngCore for BrokenRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, _dest: &mut [u8]) {}

        fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new(std::io::Error::other(
                "entropy source unavailable",
            )))
        }
    }

    /// Yields the given words in order, little-endian.
    struct SequenceRng(Vec<u32>);

    impl RngCore for SequenceRng {
        fn next_u32(&mut self) -> u32 {
            self.0.remove(0)
        }

        fn next_u64(&mut self) -> u64 {
            self.next_u32() as u64
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            let word = self.next_u32().to_le_bytes();
            dest.copy_from_slice(&word[..dest.len()]);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    fn is_six_digits(code: &str) -> bool {
        code.len() == NUMERIC_CODE_DIGITS && code.bytes().all(|b| b.is_ascii_digit())
    }

    #[test]
    fn test_opaque_token_shape() {
        let token = generate_opaque_token().unwrap();

        assert_eq!(token.len(), OPAQUE_TOKEN_LEN);
        assert!(
            token
                .bytes()
                .all(|b| b.is_ascii_uppercase() || (b'2'..=b'7').contains(&b))
        );
        assert!(!token.contains('='));
    }

    #[test]
    fn test_opaque_tokens_differ() {
        let tokens: HashSet<String> = (0..100).map(|_| generate_opaque_token().unwrap()).collect();
        assert_eq!(tokens.len(), 100);
    }

    #[test]
    fn test_numeric_codes_are_six_digits() {
        let mut previous = String::new();
        let mut repeats = 0;

        for _ in 0..1000 {
            let code = generate_numeric_code().unwrap();
            assert!(is_six_digits(&code), "unexpected code {code}");
            if code == previous {
                repeats += 1;
            }
            previous = code;
        }

        // Expected repeats over 1000 draws is 0.001.
        assert!(repeats <= 1);
    }

    #[test]
    fn test_numeric_code_zero_padded() {
        let code = numeric_code_from(&mut SequenceRng(vec![42])).unwrap();
        assert_eq!(code, "000042");
    }

    #[test]
    fn test_numeric_code_redraws_biased_values() {
        let code = numeric_code_from(&mut SequenceRng(vec![u32::MAX, 4_294_000_000, 7])).unwrap();
        assert_eq!(code, "000007");
    }

    #[test]
    fn test_entropy_failure_is_generation_error() {
        assert!(matches!(
            opaque_token_from(&mut BrokenRng),
            Err(AuthError::Generation(_))
        ));
        assert!(matches!(
            numeric_code_from(&mut BrokenRng),
            Err(AuthError::Generation(_))
        ));
    }
}
