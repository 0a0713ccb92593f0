use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;

/// Decimal or `0x`-prefixed hex; `_` digit separators are allowed.
pub fn parse_seed(raw: &str) -> Result<u32> {
    let cleaned: String = raw.trim().chars().filter(|c| *c != '_').collect();
    let (digits, radix) = match cleaned.get(..2) {
        Some("0x" | "0X") => (&cleaned[2..], 16),
        _ => (cleaned.as_str(), 10),
    };
    if digits.is_empty() {
        return Err(anyhow!("empty seed '{raw}'"));
    }
    u32::from_str_radix(digits, radix)
        .with_context(|| format!("invalid seed '{raw}': expected decimal or 0x-prefixed hex"))
}

/// Fixed-width hex, the form seeds are printed and named in.
pub fn format_seed(seed: u32) -> String {
    format!("{seed:#010x}")
}

pub fn parse_seed_csv(input: &str) -> Result<Vec<u32>> {
    let seeds = input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_seed)
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        return Err(anyhow!("no seeds parsed from --seeds"));
    }
    Ok(seeds)
}

/// One seed per line; blank lines and `#` comments are skipped.
pub fn parse_seed_file(path: &Path) -> Result<Vec<u32>> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed reading seed file {}", path.display()))?;
    let seeds = data
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(parse_seed)
        .collect::<Result<Vec<_>>>()?;
    if seeds.is_empty() {
        return Err(anyhow!("seed file {} had no seeds", path.display()));
    }
    Ok(seeds)
}

pub fn seed_range(start: u32, count: u32) -> Vec<u32> {
    (0..count).map(|offset| start.wrapping_add(offset)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_and_hex_seeds() {
        assert_eq!(parse_seed("42").expect("decimal"), 42);
        assert_eq!(parse_seed(" 0xC0FFEE ").expect("hex"), 0xC0FFEE);
        assert_eq!(parse_seed("0XFF").expect("upper hex"), 0xFF);
        assert_eq!(parse_seed("0xDEAD_BEEF").expect("separated"), 0xDEAD_BEEF);
        assert_eq!(parse_seed("1_000").expect("separated"), 1_000);
        assert!(parse_seed("0x").is_err());
        assert!(parse_seed("").is_err());
        assert!(parse_seed("0xZZ").is_err());
        assert!(parse_seed("-1").is_err());
    }

    #[test]
    fn csv_skips_blank_tokens() {
        assert_eq!(parse_seed_csv("1, ,0x10,").expect("csv"), vec![1, 16]);
        assert!(parse_seed_csv(" , ").is_err());
    }

    #[test]
    fn seed_file_skips_comments() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("seeds.txt");
        fs::write(&path, "# smoke seeds\n0\n\n0xdeadbeef\n7\n").expect("write seeds");
        assert_eq!(
            parse_seed_file(&path).expect("seed file"),
            vec![0, 0xDEAD_BEEF, 7]
        );
    }

    #[test]
    fn seed_range_wraps() {
        assert_eq!(seed_range(u32::MAX, 2), vec![u32::MAX, 0]);
        assert_eq!(format_seed(0xBEEF), "0x0000beef");
    }
}
