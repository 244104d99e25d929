use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Pretty-print `value` as JSON to `path`, or to stdout when `path` is `None`.
///
/// Errors come back as the message the commands print after `Error: `.
pub fn emit_json<T: Serialize>(value: &T, path: Option<&str>) -> Result<(), String> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .map_err(|e| format!("Failed to create output file '{}': {}", path, e))?;
            write_pretty(BufWriter::new(file), value)
                .map_err(|e| format!("Failed to write output file '{}': {}", path, e))
        }
        None => write_pretty(io::stdout().lock(), value)
            .map_err(|e| format!("Failed to write to stdout: {}", e)),
    }
}

fn write_pretty<W: Write, T: Serialize>(mut writer: W, value: &T) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_json_to_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out.json");

        emit_json(&serde_json::json!({"streams": 2}), path.to_str()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["streams"], 2);
    }

    #[test]
    fn test_emit_json_unwritable_path() {
        let err = emit_json(&1, Some("/nonexistent_dir_12345/out.json")).unwrap_err();
        assert!(err.contains("out.json"));
    }
}
