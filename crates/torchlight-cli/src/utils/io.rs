//! Reading inputs and writing outputs, with `-` meaning stdin.

use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

use anyhow::{Context, Result};

/// Read `path` to a string, or stdin when `path` is `-`.
pub fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }

    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Write `content` to `path`, or stdout when `path` is `None`.
pub fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    match path {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
        },
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(content.as_bytes())?;
            if !content.ends_with('\n') {
                stdout.write_all(b"\n")?;
            }
            stdout.flush()?;
            Ok(())
        },
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_through_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("out.html");

        write_output(Some(&path), "<pre></pre>").unwrap();
        assert_eq!(read_input(&path).unwrap(), "<pre></pre>");
    }

    #[test]
    fn test_missing_file_names_the_path() {
        let err = read_input(Path::new("/definitely/not/here.md")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.md"));
    }
}
