//! Human-readable byte counts for diagnostics.

const UNITS: [&str; 4] = ["KiB", "MiB", "GiB", "TiB"];

/// Formats a byte count with binary units, e.g. `"512 B"` or `"1.5 KiB"`.
pub fn bytes_to_string(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_counts_stay_in_bytes() {
        assert_eq!(bytes_to_string(0), "0 B");
        assert_eq!(bytes_to_string(1023), "1023 B");
    }

    #[test]
    fn larger_counts_use_binary_units() {
        assert_eq!(bytes_to_string(1024), "1.0 KiB");
        assert_eq!(bytes_to_string(1536), "1.5 KiB");
        assert_eq!(bytes_to_string(3 * 1024 * 1024), "3.0 MiB");
        assert_eq!(bytes_to_string(2 * 1024 * 1024 * 1024 * 1024 * 1024), "2048.0 TiB");
    }
}
