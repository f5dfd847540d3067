//! Opaque id generation. Identity is out of scope for this crate: these
//! are bare random strings, not accounts.

use rand::Rng;

use crate::constants::{ROOM_ID_ALPHABET, ROOM_ID_LEN};

/// A fresh opaque player id.
pub fn new_player_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// A fresh opaque fruit id.
pub fn new_fruit_id() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 8] = rng.gen();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A 6-character room id from a Crockford-like alphabet (no 0/1/I/O), so
/// it reads unambiguously over voice chat and doesn't collide visually.
pub fn new_room_id() -> String {
    let mut rng = rand::thread_rng();
    let alphabet: Vec<char> = ROOM_ID_ALPHABET.chars().collect();
    (0..ROOM_ID_LEN)
        .map(|_| alphabet[rng.gen_range(0..alphabet.len())])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_ids_use_the_restricted_alphabet() {
        for _ in 0..200 {
            let id = new_room_id();
            assert_eq!(id.chars().count(), ROOM_ID_LEN);
            assert!(id.chars().all(|c| ROOM_ID_ALPHABET.contains(c)));
        }
    }

    #[test]
    fn fruit_ids_are_hex() {
        let id = new_fruit_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
