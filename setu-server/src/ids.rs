//! Opaque id generation. No `uuid` crate in this workspace — `rand` is
//! already pulled in by `setu-vault` for nonce generation, so request/record
//! ids reuse it rather than adding a new dependency.

use rand::Rng;

pub fn random_hex_id(bytes: usize) -> String {
    let mut rng = rand::thread_rng();
    let mut buf = vec![0u8; bytes];
    rng.fill(&mut buf[..]);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

pub fn stream_id() -> String {
    random_hex_id(8)
}

pub fn record_id() -> String {
    random_hex_id(16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_id_is_sixteen_hex_chars() {
        let id = stream_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn record_id_is_thirty_two_hex_chars() {
        let id = record_id();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn ids_are_not_trivially_repeated() {
        let a = record_id();
        let b = record_id();
        assert_ne!(a, b);
    }
}
