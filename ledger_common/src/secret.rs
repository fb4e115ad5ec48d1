use std::{
    fmt,
    fmt::{Debug, Display},
};

/// Wraps a sensitive value so that it never leaks into logs or debug output.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone + Default
{
    value: T,
}

impl<T: Clone + Default> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }
}

impl<T: Clone + Default + AsRef<[u8]>> Secret<T> {
    /// Compares `candidate` against the secret without short-circuiting on the first differing byte.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        let expected = self.value.as_ref();
        if expected.len() != candidate.len() {
            return false;
        }
        expected.iter().zip(candidate).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
    }

    pub fn is_empty(&self) -> bool {
        self.value.as_ref().is_empty()
    }
}

impl<T: Clone + Default> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone + Default> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

#[cfg(test)]
mod test {
    use super::Secret;

    #[test]
    fn secrets_are_masked() {
        let secret = Secret::new("hunter2".to_string());
        assert_eq!(format!("{secret}"), "****");
        assert_eq!(format!("{secret:?}"), "****");
        assert_eq!(secret.reveal(), "hunter2");
    }

    #[test]
    fn matches_exact_bytes_only() {
        let secret = Secret::new("admin-key".to_string());
        assert!(secret.matches(b"admin-key"));
        assert!(!secret.matches(b"admin-kez"));
        assert!(!secret.matches(b"admin"));
        assert!(!secret.matches(b""));
        assert!(Secret::new(String::new()).is_empty());
    }
}
