//! Row id generation.
//!
//! Engine-created rows (ballots, child membership requests, member settings)
//! get UUID v7 ids so they sort by creation time, which keeps "stable order of
//! the underlying rows" meaningful wherever the engine ranks them.

use uuid::Uuid;

/// Generate a new time-ordered row id.
pub fn generate_id() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_unique_ids() {
        assert_ne!(generate_id(), generate_id());
    }

    #[test]
    fn test_ids_sort_by_creation() {
        let first = generate_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = generate_id();
        assert!(first < second);
    }
}
