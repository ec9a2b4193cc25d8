//! Utilities module for logging, error types and small formatting helpers

pub mod error;
pub mod logging;

// Re-export main types for convenience
pub use error::{LeafError, Result, ResultExt};
pub use logging::init_logging;

/// Format a probability in `[0, 1]` as a percentage string with two decimals
/// and a trailing `%` (e.g. `0.7` -> `"70.00%"`).
pub fn format_percentage(probability: f32) -> String {
    format!("{:.2}%", probability as f64 * 100.0)
}

/// Format a duration in a human-readable way
pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{:.1}ms", seconds * 1000.0)
    } else if seconds < 60.0 {
        format!("{:.1}s", seconds)
    } else {
        let minutes = (seconds / 60.0).floor();
        let secs = seconds % 60.0;
        format!("{}m {:.0}s", minutes as u32, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.7), "70.00%");
        assert_eq!(format_percentage(0.1), "10.00%");
        assert_eq!(format_percentage(0.0), "0.00%");
        assert_eq!(format_percentage(1.0), "100.00%");
        assert_eq!(format_percentage(0.123456), "12.35%");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0425), "42.5ms");
        assert_eq!(format_duration(30.5), "30.5s");
        assert_eq!(format_duration(90.0), "1m 30s");
    }
}
