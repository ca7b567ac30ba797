// SPDX-FileCopyrightText: 2026 Memebot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Read the process RSS in bytes from /proc/self/statm (Linux only).
///
/// Returns None on non-Linux platforms or if the file cannot be read.
pub fn read_rss_bytes() -> Option<u64> {
    #[cfg(target_os = "linux")]
    {
        let statm = std::fs::read_to_string("/proc/self/statm").ok()?;
        parse_statm(&statm)
    }
    #[cfg(not(target_os = "linux"))]
    {
        None
    }
}

fn parse_statm(statm: &str) -> Option<u64> {
    let rss_pages = statm.split_whitespace().nth(1)?.parse::<u64>().ok()?;
    Some(rss_pages * 4096)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_field_is_resident_pages() {
        assert_eq!(parse_statm("5000 1200 300 10 0 900 0\n"), Some(1200 * 4096));
        assert_eq!(parse_statm(""), None);
        assert_eq!(parse_statm("5000 lots"), None);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn own_rss_is_nonzero() {
        assert!(read_rss_bytes().unwrap() > 0);
    }
}
