//! Wall-clock helpers.

use chrono::Utc;

/// Current time as milliseconds since the Unix epoch.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_positive_and_monotonic_enough() {
        let first = now_millis();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = now_millis();
        assert!(first > 0);
        assert!(second >= first);
    }
}
