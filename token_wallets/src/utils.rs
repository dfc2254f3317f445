use regex::Regex;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;

lazy_static::lazy_static! {
    static ref BASE58_ADDRESS: Regex = Regex::new(r"^[1-9A-HJ-NP-Za-km-z]{32,44}$").unwrap();
}

/// Base58 alphabet, 32-44 characters, and decodes to a 32-byte public key.
pub fn is_valid_solana_address(address: &str) -> bool {
    BASE58_ADDRESS.is_match(address) && Pubkey::from_str(address).is_ok()
}

/// First eight characters of a mint or signature, for file names and log lines.
pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_solana_address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
        assert!(is_valid_solana_address("So11111111111111111111111111111111111111112"));
        assert!(is_valid_solana_address(&Pubkey::new_unique().to_string()));
    }

    #[test]
    fn test_invalid_addresses() {
        assert!(!is_valid_solana_address(""));
        assert!(!is_valid_solana_address("short"));
        // '0', 'O', 'I' and 'l' are not base58.
        assert!(!is_valid_solana_address("0PjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
        assert!(!is_valid_solana_address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1vEPjFW"));
        // Right alphabet and length but not 32 bytes once decoded.
        assert!(!is_valid_solana_address("11111111111111111111111111111111111111111111"));
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"), "EPjFWdd5");
        assert_eq!(short_id("abc"), "abc");
    }
}
