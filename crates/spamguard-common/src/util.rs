use sha1::Digest as _;

pub fn sha1_hex(data: impl AsRef<[u8]>) -> String {
    let mut hasher = sha1::Sha1::new();
    hasher.update(data);

    hasher
        .finalize()
        .iter()
        .map(|byte| format!("{:02x}", byte))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_empty_input() {
        assert_eq!(sha1_hex(""), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn same_input_same_hash() {
        assert_eq!(sha1_hex("203.0.113.7\n"), sha1_hex(b"203.0.113.7\n"));
        assert_ne!(sha1_hex("a"), sha1_hex("b"));
    }
}
