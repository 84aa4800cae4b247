use serde::Serialize;

/// Stable hex fingerprint of any serializable value.
///
/// Field order follows the struct definition, so equal values always hash
/// the same. Values that fail to serialize hash their debug rendering.
pub fn fingerprint<T: Serialize + std::fmt::Debug>(namespace: &str, value: &T) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(namespace.as_bytes());
    hasher.update(&[0]);
    match serde_json::to_vec(value) {
        Ok(bytes) => hasher.update(&bytes),
        Err(_) => hasher.update(format!("{value:?}").as_bytes()),
    };
    hasher.finalize().to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_same_fingerprint() {
        assert_eq!(fingerprint("q", &("paris", 5)), fingerprint("q", &("paris", 5)));
    }

    #[test]
    fn namespace_separates_keys() {
        assert_ne!(fingerprint("a", &"x"), fingerprint("b", &"x"));
        assert_ne!(fingerprint("q", &("paris", 5)), fingerprint("q", &("paris", 6)));
    }
}
