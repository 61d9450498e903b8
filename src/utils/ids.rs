use uuid::Uuid;

/// Creates a new opaque unique identifier for an entity.
///
/// Identifiers are lowercase hyphenated UUID v4 strings; they are stable
/// and never reused.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod test {
    use super::generate_id;

    #[test]
    fn ids_are_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 36);
    }
}
