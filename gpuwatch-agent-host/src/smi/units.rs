//! Unit normalization for nvidia-smi magnitude strings
//!
//! nvidia-smi reports every reading as text with a unit suffix
//! (`"1024 MiB"`, `"250.00 W"`, `"45 C"`, `"37 %"`). These helpers turn them
//! into fixed units:
//! - memory -> bytes
//! - power -> milliwatts
//! - utilization -> percent (f64, clamped to 0..=100)
//! - temperature -> whole degrees Celsius
//!
//! None of them fail: `N/A`, empty and malformed values all become zero, so a
//! single odd field never sinks a whole GPU record.

const KIB: f64 = 1024.0;
const MIB: f64 = 1024.0 * 1024.0;
const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Strips `unit` from the end of `value` and parses the remaining number.
fn magnitude(value: &str, unit: &str) -> Option<f64> {
    let number = value.trim().strip_suffix(unit)?.trim();
    number.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// `"1024 MiB"` -> 1073741824. Accepts B, KiB, MiB and GiB.
pub fn memory_bytes(value: &str) -> u64 {
    let value = value.trim();

    let bytes = if let Some(n) = magnitude(value, "GiB") {
        n * GIB
    } else if let Some(n) = magnitude(value, "MiB") {
        n * MIB
    } else if let Some(n) = magnitude(value, "KiB") {
        n * KIB
    } else if !value.contains("iB") {
        // plain bytes, e.g. "512 B"
        magnitude(value, "B").unwrap_or(0.0)
    } else {
        0.0
    };

    // float -> int casts saturate, negatives land on 0
    bytes as u64
}

/// `"250.00 W"` -> 250000. A bare number is taken as watts.
pub fn power_milliwatts(value: &str) -> u64 {
    power_reading(value).unwrap_or(0)
}

/// Like [`power_milliwatts`], but `None` when the field holds no reading
/// (`N/A`, `[Not Supported]`, empty), so callers can try the next field.
pub fn power_reading(value: &str) -> Option<u64> {
    let value = value.trim();
    let watts = magnitude(value, "W")
        .or_else(|| value.parse::<f64>().ok().filter(|n| n.is_finite()))?;

    Some((watts * 1000.0).round() as u64)
}

/// `"37 %"` -> 37.0
pub fn percent(value: &str) -> f64 {
    magnitude(value, "%")
        .map(|p| p.clamp(0.0, 100.0))
        .unwrap_or(0.0)
}

/// `"45 C"` -> 45
pub fn celsius(value: &str) -> u32 {
    value
        .trim()
        .strip_suffix('C')
        .and_then(|n| n.trim().parse::<u32>().ok())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_units() {
        assert_eq!(memory_bytes("1024 MiB"), 1_073_741_824);
        assert_eq!(memory_bytes("1 GiB"), 1_073_741_824);
        assert_eq!(memory_bytes("4 KiB"), 4096);
        assert_eq!(memory_bytes("512 B"), 512);
        assert_eq!(memory_bytes("  81920 MiB \n"), 85_899_345_920);
        assert_eq!(memory_bytes("0.5 GiB"), 536_870_912);
    }

    #[test]
    fn test_memory_malformed_is_zero() {
        assert_eq!(memory_bytes(""), 0);
        assert_eq!(memory_bytes("N/A"), 0);
        assert_eq!(memory_bytes("lots MiB"), 0);
        assert_eq!(memory_bytes("12 TiB"), 0);
        assert_eq!(memory_bytes("-5 MiB"), 0);
    }

    #[test]
    fn test_power() {
        assert_eq!(power_milliwatts("250.00 W"), 250_000);
        assert_eq!(power_milliwatts("21.37 W"), 21_370);
        assert_eq!(power_milliwatts("300"), 300_000);
        assert_eq!(power_milliwatts("N/A"), 0);
        assert_eq!(power_milliwatts(""), 0);
        assert_eq!(power_milliwatts("[Not Supported]"), 0);
    }

    #[test]
    fn test_power_reading_tells_missing_from_zero() {
        assert_eq!(power_reading("0.00 W"), Some(0));
        assert_eq!(power_reading(" 68.12 W "), Some(68_120));
        assert_eq!(power_reading("N/A"), None);
        assert_eq!(power_reading("[Not Supported]"), None);
        assert_eq!(power_reading(""), None);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent("37 %"), 37.0);
        assert_eq!(percent("0 %"), 0.0);
        assert_eq!(percent("140 %"), 100.0);
        assert_eq!(percent("37"), 0.0);
        assert_eq!(percent("N/A"), 0.0);
    }

    #[test]
    fn test_celsius() {
        assert_eq!(celsius("45 C"), 45);
        assert_eq!(celsius("N/A"), 0);
        assert_eq!(celsius("hot C"), 0);
        assert_eq!(celsius(""), 0);
    }
}
