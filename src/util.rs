use chrono::Utc;

/// Hands out time-based identifiers that never repeat within one generator.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last: i64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next id from the current wall clock in milliseconds.
    #[must_use]
    pub fn next_id(&mut self) -> String {
        self.next_at(Utc::now().timestamp_millis())
    }

    /// Next id for a given clock reading; falls back to `last + 1` when the clock stalls.
    #[must_use]
    pub fn next_at(&mut self, now_millis: i64) -> String {
        let id = if now_millis > self.last {
            now_millis
        } else {
            self.last + 1
        };
        self.last = id;
        id.to_string()
    }
}

/// Trim a user-entered field, returning `None` when nothing is left.
#[must_use]
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_follow_the_clock() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_at(1_000), "1000");
        assert_eq!(ids.next_at(1_005), "1005");
    }

    #[test]
    fn ids_stay_unique_when_clock_stalls_or_rewinds() {
        let mut ids = IdGenerator::new();
        assert_eq!(ids.next_at(2_000), "2000");
        assert_eq!(ids.next_at(2_000), "2001");
        assert_eq!(ids.next_at(1_500), "2002");
        assert_eq!(ids.next_at(2_010), "2010");
    }

    #[test]
    fn wall_clock_ids_are_distinct() {
        let mut ids = IdGenerator::new();
        let generated: Vec<String> = (0..64).map(|_| ids.next_id()).collect();
        let mut deduped = generated.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), generated.len());
    }

    #[test]
    fn trims_user_fields() {
        assert_eq!(non_blank("  Main "), Some("Main"));
        assert_eq!(non_blank("   "), None);
        assert_eq!(non_blank(""), None);
    }
}
