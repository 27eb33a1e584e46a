//! Plain-text problem files:
//!
//! ```text
//! LX=100
//! LY=40
//! m=2
//! 10 20 500
//! 12.5 8 120
//! ```
//!
//! Sheet width, sheet height, item type count, then one `width height min`
//! line per item type. Every other setting keeps its default.

use crate::config::{Config, ItemTypeConfig};
use crate::error::{Error, Result};

pub fn parse_problem(text: &str) -> Result<Config> {
    let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line.trim()));
    let end = text.lines().count() + 1;
    let mut config = Config::default();

    config.sheet.width = header(lines.next(), "LX", end)? as f64;
    config.sheet.height = header(lines.next(), "LY", end)? as f64;
    let count = header(lines.next(), "m", end)? as usize;

    for _ in 0..count {
        let (line, content) = lines.next().ok_or_else(|| Error::Input {
            line: end,
            message: format!("expected {count} item lines"),
        })?;
        config.item_types.push(item_line(line, content)?);
    }

    Ok(config)
}

/// Parses `KEY=<integer>`, case-insensitive on the key.
fn header(line: Option<(usize, &str)>, key: &str, end: usize) -> Result<u64> {
    let (line, content) = line.ok_or_else(|| Error::Input {
        line: end,
        message: format!("missing {key}= line"),
    })?;
    let invalid = || Error::Input {
        line,
        message: format!("expected {key}=<integer>, got '{content}'"),
    };

    let (name, value) = content.split_once('=').ok_or_else(invalid)?;
    if !name.trim().eq_ignore_ascii_case(key) {
        return Err(invalid());
    }
    value.trim().parse::<u64>().map_err(|_| invalid())
}

fn item_line(line: usize, content: &str) -> Result<ItemTypeConfig> {
    let invalid = |message: String| Error::Input { line, message };

    let fields: Vec<&str> = content.split_whitespace().collect();
    if fields.len() != 3 {
        return Err(invalid(format!(
            "expected '<width> <height> <min>', got '{content}'"
        )));
    }
    let width = fields[0]
        .parse::<f64>()
        .map_err(|_| invalid(format!("invalid width '{}'", fields[0])))?;
    let height = fields[1]
        .parse::<f64>()
        .map_err(|_| invalid(format!("invalid height '{}'", fields[1])))?;
    let min_count = fields[2]
        .parse::<u32>()
        .map_err(|_| invalid(format!("invalid minimum count '{}'", fields[2])))?;

    Ok(ItemTypeConfig {
        width,
        height,
        min_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_problem() {
        let text = "LX=100\nLY=40\nm=2\n10 20 500\n12.5   8 120\n";
        let config = parse_problem(text).unwrap();
        assert_eq!(config.sheet.width, 100.0);
        assert_eq!(config.sheet.height, 40.0);
        assert_eq!(config.item_types.len(), 2);
        assert_eq!(config.item_types[1].width, 12.5);
        assert_eq!(config.item_types[1].min_count, 120);
        // Untouched settings keep their defaults.
        assert_eq!(config.sheet.max_pattern_count, 999);
        assert_eq!(config.genetic.population_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_windows_line_endings_and_case() {
        let config = parse_problem("lx=50\r\nly=30\r\nM=1\r\n5 5 3\r\n").unwrap();
        assert_eq!(config.sheet.width, 50.0);
        assert_eq!(config.item_types[0].min_count, 3);
    }

    #[test]
    fn test_bad_header() {
        let err = parse_problem("LX=100\nLZ=40\nm=1\n1 1 1").unwrap_err();
        assert!(matches!(err, Error::Input { line: 2, .. }));
    }

    #[test]
    fn test_bad_item_line() {
        let err = parse_problem("LX=100\nLY=40\nm=2\n10 20 5\n10 x 5").unwrap_err();
        assert!(matches!(err, Error::Input { line: 5, .. }));

        let err = parse_problem("LX=100\nLY=40\nm=1\n10 20").unwrap_err();
        assert!(matches!(err, Error::Input { line: 4, .. }));
    }

    #[test]
    fn test_truncated_header() {
        let err = parse_problem("LX=100\n").unwrap_err();
        assert!(matches!(err, Error::Input { line: 2, .. }));
    }

    #[test]
    fn test_missing_item_lines() {
        let err = parse_problem("LX=100\nLY=40\nm=3\n10 20 5\n").unwrap_err();
        assert!(matches!(err, Error::Input { line: 5, .. }));
    }
}
