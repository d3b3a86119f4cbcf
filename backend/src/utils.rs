use ring::error::Unspecified;
use ring::rand::{SecureRandom, SystemRandom};
use shared::validation::{CREDENTIAL_LENGTH, OTP_LENGTH};
use time::OffsetDateTime;

const CREDENTIAL_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub trait Clock: Send + Sync {
    fn now(&self) -> OffsetDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_utc()
    }
}

/// Uniform draw from `0..bound`, rejecting the biased top of the `u32` range.
fn random_below(rng: &SystemRandom, bound: u32) -> Result<u32, Unspecified> {
    let zone = u32::MAX - (u32::MAX % bound);
    loop {
        let mut bytes = [0u8; 4];
        rng.fill(&mut bytes)?;
        let value = u32::from_le_bytes(bytes);
        if value < zone {
            return Ok(value % bound);
        }
    }
}

/// Six decimal digits without a leading zero (100000..=999999).
pub fn generate_otp(rng: &SystemRandom) -> Result<String, Unspecified> {
    let low = 10u32.pow(OTP_LENGTH as u32 - 1);
    let span = 9 * low;
    Ok((low + random_below(rng, span)?).to_string())
}

pub fn generate_credential(rng: &SystemRandom) -> Result<String, Unspecified> {
    (0..CREDENTIAL_LENGTH)
        .map(|_| {
            random_below(rng, CREDENTIAL_ALPHABET.len() as u32)
                .map(|i| CREDENTIAL_ALPHABET[i as usize] as char)
        })
        .collect()
}

/// Exact comparison that does not leak the matching prefix length.
pub fn codes_match(expected: &str, submitted: &str) -> bool {
    ring::constant_time::verify_slices_are_equal(expected.as_bytes(), submitted.as_bytes()).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn otp_is_six_digits() {
        let rng = SystemRandom::new();
        for _ in 0..500 {
            let otp = generate_otp(&rng).unwrap();
            assert_eq!(otp.len(), 6);
            assert!(otp.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(otp.as_bytes()[0], b'0');
        }
    }

    #[test]
    fn credential_is_upper_alphanumeric() {
        let rng = SystemRandom::new();
        let codes: HashSet<_> = (0..200).map(|_| generate_credential(&rng).unwrap()).collect();
        assert!(codes.len() > 190);
        for code in codes {
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
        }
    }

    #[test]
    fn code_comparison_is_exact() {
        assert!(codes_match("AB12CD", "AB12CD"));
        assert!(!codes_match("AB12CD", "ab12cd"));
        assert!(!codes_match("AB12CD", "AB12C"));
        assert!(!codes_match("123456", " 123456"));
    }
}
