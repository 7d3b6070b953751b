//! Column helpers for the summary table.

use std::fmt::Display;

/// Quote `value` and right-align it in `width` columns; longer values are
/// never truncated.
pub fn format_field<T: Display>(value: T, width: usize) -> String {
    format!("{:>width$}", format!("\"{value}\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_format_field_pads() {
        assert_eq!(format_field("full", 10), "    \"full\"");
        assert_eq!(format_field(253, 6), " \"253\"");
    }

    #[test]
    fn test_format_field_never_truncates() {
        let addr = Ipv4Addr::new(10, 128, 0, 0);
        assert_eq!(format_field(addr, 5), "\"10.128.0.0\"");
    }
}
