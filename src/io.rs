use crate::profile_scope;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use crate::doe::Scenario;
use crate::error::Result;

fn is_gzip_path(path: &Path) -> bool {
    path.extension().is_some_and(|e| e.eq_ignore_ascii_case("gz"))
}

/// Write a scenario batch as a JSON array, gzip-compressed when the file
/// name ends in `.gz`.
pub fn save_scenarios<P: AsRef<Path>>(path: P, scenarios: &[Scenario]) -> Result<()> {
    profile_scope!("save_scenarios");
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    // Write to a temporary file first to avoid truncation on crash/interruption
    let tmp_path = path.with_extension({
        let mut os = path.extension().map(|e| e.to_os_string()).unwrap_or_default();
        os.push(".tmp");
        os
    });
    {
        let file = std::fs::File::create(&tmp_path)?;
        let writer = BufWriter::new(file);
        if is_gzip_path(path) {
            let mut encoder = GzEncoder::new(writer, Compression::fast());
            serde_json::to_writer_pretty(&mut encoder, scenarios)?;
            let mut writer = encoder.finish()?;
            writer.flush()?;
        } else {
            let mut writer = writer;
            serde_json::to_writer_pretty(&mut writer, scenarios)?;
            writer.flush()?;
        }
    }
    std::fs::rename(&tmp_path, path)?;
    tracing::debug!(path = %path.display(), count = scenarios.len(), "saved scenarios");
    Ok(())
}

/// Read a scenario batch written by `save_scenarios` or by hand.
/// Compression is detected from the content, not the file name.
pub fn load_scenarios<P: AsRef<Path>>(path: P) -> Result<Vec<Scenario>> {
    profile_scope!("load_scenarios");
    let data = std::fs::read(path.as_ref())?;
    let scenarios = match maybe_decompress_gzip(&data)? {
        Some(decoded) => serde_json::from_slice(&decoded)?,
        None => serde_json::from_slice(&data)?,
    };
    Ok(scenarios)
}

fn maybe_decompress_gzip(data: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    if data.len() < 2 || data[0] != 0x1f || data[1] != 0x8b {
        return Ok(None);
    }

    let mut decoder = GzDecoder::new(Cursor::new(data));
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(Some(decoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dedup::FeatureTable;
    use crate::error::ErrorKind;

    fn batch() -> Vec<Scenario> {
        vec![
            Scenario::from_flat([("Mat_E", 2000.0), ("Mat_w", 15.0)], "Push"),
            Scenario::from_flat([("Mat_E", 3000.5), ("Pier_h", 4.25)], "Push"),
        ]
    }

    #[test]
    fn plain_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/scenarios.json");
        save_scenarios(&path, &batch()).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"Materials\""));
        assert_eq!(load_scenarios(&path).unwrap(), batch());
        assert!(!dir.path().join("out/scenarios.json.tmp").exists());
    }

    #[test]
    fn gz_extension_compresses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scenarios.json.gz");
        save_scenarios(&path, &batch()).unwrap();
        let raw = std::fs::read(&path).unwrap();
        assert_eq!(&raw[..2], &[0x1f, 0x8b]);
        assert_eq!(load_scenarios(&path).unwrap(), batch());
    }

    #[test]
    fn loads_hand_written_records_skipping_non_numeric_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("legacy.json");
        std::fs::write(
            &path,
            r#"[{"Materials": [{"Key": 3, "Name": "Mat", "E": 2500, "Grade": "C30"}], "Analysis": ["Push"]}]"#,
        )
        .unwrap();
        let loaded = load_scenarios(&path).unwrap();
        assert_eq!(loaded[0].flatten(), vec![("Mat_E".to_string(), 2500.0)]);
    }

    #[test]
    fn results_written_back_survive_load_flatten_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        std::fs::write(
            &path,
            r#"[
                {"Materials": [{"Name": "Mat", "E": 2000.0}], "Analysis": ["Vert"],
                 "Output": {"Vert": {"Uz": -0.012, "Reactions": {"Rz": 10.0}, "Exit": "ok"}},
                 "Geometry": {"span": 12.5, "piers": 2}},
                {"Materials": [{"Name": "Mat", "E": 3000.0}], "Analysis": ["Vert"],
                 "Output": {"Vert": {"Uz": -0.009}}}
            ]"#,
        )
        .unwrap();

        let loaded = load_scenarios(&path).unwrap();
        let table = FeatureTable::from_scenarios(&loaded);
        assert_eq!(table.columns(), &["Uz".to_string(), "Mat_E".to_string()][..]);
        assert_eq!(table.row(1), &[-0.009, 3000.0]);

        let copy = dir.path().join("copy.json.gz");
        save_scenarios(&copy, &loaded).unwrap();
        let reloaded = load_scenarios(&copy).unwrap();
        assert_eq!(reloaded, loaded);
        assert_eq!(reloaded[0].extra["Geometry"]["piers"], 2);
        assert_eq!(reloaded[0].outputs["Vert"]["Reactions"]["Rz"], 10.0);
        assert_eq!(reloaded[0].outputs["Vert"]["Exit"], "ok");
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = load_scenarios(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
    }
}
