use rand::Rng;
use sha2::{Digest, Sha256};

const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
const TOKEN_LEN: usize = 32;

pub(crate) fn generate_rater_token() -> String {
    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub(crate) fn hash_rater_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.trim().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_use_unambiguous_alphabet() {
        let token = generate_rater_token();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token.bytes().all(|byte| ALPHABET.contains(&byte)));
        assert_ne!(token, generate_rater_token());
    }

    #[test]
    fn hash_ignores_surrounding_whitespace() {
        let token = "AbCdEf23";
        assert_eq!(hash_rater_token(token), hash_rater_token(" AbCdEf23\n"));
        assert_eq!(hash_rater_token(token).len(), 64);
    }
}
