use std::cmp::Ordering;

use chrono::Duration;

const KB: u64 = 1024;
const MB: u64 = 1024 * 1024;

/// Format a byte count for the storage settings row
/// Thresholds: under 1 KiB in bytes, under 1 MiB in KB, otherwise MB
pub fn format_size(bytes: u64) -> String {
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Bucket elapsed time since the last sync into a short label
pub fn format_time_since(elapsed: Duration) -> String {
    let seconds = elapsed.num_seconds();
    if seconds < 60 {
        // Negative elapsed means clock skew; treat as fresh
        "Just now".to_string()
    } else if seconds < 3600 {
        format!("{} min ago", seconds / 60)
    } else if seconds < 86_400 {
        format!("{} hr ago", seconds / 3600)
    } else {
        format!("{} days ago", seconds / 86_400)
    }
}

/// Format a price for display, dropping cents on whole amounts
pub fn format_price(price: f64) -> String {
    if price.fract() == 0.0 {
        format!("${:.0}", price)
    } else {
        format!("${:.2}", price)
    }
}

/// Compare two strings ignoring case (Unicode lowercase, not just ASCII)
pub fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Case-insensitive substring check
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size_boundaries() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1.0 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(1_048_575), "1024.0 KB");
        assert_eq!(format_size(1_048_576), "1.0 MB");
    }

    #[test]
    fn test_format_time_since_boundaries() {
        assert_eq!(format_time_since(Duration::seconds(0)), "Just now");
        assert_eq!(format_time_since(Duration::seconds(59)), "Just now");
        assert_eq!(format_time_since(Duration::seconds(60)), "1 min ago");
        assert_eq!(format_time_since(Duration::seconds(3599)), "59 min ago");
        assert_eq!(format_time_since(Duration::seconds(3600)), "1 hr ago");
        assert_eq!(format_time_since(Duration::hours(23)), "23 hr ago");
        assert_eq!(format_time_since(Duration::hours(48)), "2 days ago");
        assert_eq!(format_time_since(Duration::seconds(-5)), "Just now");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(799.0), "$799");
        assert_eq!(format_price(1099.5), "$1099.50");
        assert_eq!(format_price(0.0), "$0");
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
    }

    #[test]
    fn test_cmp_ignore_case_unicode() {
        assert_eq!(cmp_ignore_case("Énergie", "énergie"), Ordering::Equal);
        assert_eq!(cmp_ignore_case("apple", "Banana"), Ordering::Less);
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Galaxy S24 Ultra", "s24"));
        assert!(!contains_ignore_case("Galaxy S24 Ultra", "pixel"));
    }
}
