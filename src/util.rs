//! Small helpers with no shared state.

use rand::seq::SliceRandom;

/// Alphabet used for generated client ID suffixes
pub const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Random string of `len` characters drawn from `alphabet`
///
/// Returns an empty string when the alphabet is empty.
pub fn random_string(len: usize, alphabet: &str) -> String {
    let chars: Vec<char> = alphabet.chars().collect();
    let mut rng = rand::thread_rng();

    (0..len)
        .filter_map(|_| chars.choose(&mut rng).copied())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_and_alphabet() {
        let s = random_string(32, UPPERCASE);
        assert_eq!(s.chars().count(), 32);
        assert!(s.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_custom_alphabet() {
        let s = random_string(10, "xy");
        assert!(s.chars().all(|c| c == 'x' || c == 'y'));
    }

    #[test]
    fn test_edge_cases() {
        assert_eq!(random_string(0, UPPERCASE), "");
        assert_eq!(random_string(5, ""), "");
        assert_eq!(random_string(3, "é"), "ééé");
    }
}
