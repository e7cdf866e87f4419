use pricing_engine_core::RuleBook;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Load the rule book from `path`, or the bundled tables when no path is
/// given or the file does not exist yet.
pub fn load(path: Option<&Path>) -> Result<RuleBook, Box<dyn std::error::Error>> {
    match path {
        Some(p) if p.exists() => {
            let contents = fs::read_to_string(p)
                .map_err(|e| format!("Failed to read '{}': {}", p.display(), e))?;
            let book = RuleBook::from_json_str(&contents)
                .map_err(|e| format!("Failed to load rules from '{}': {}", p.display(), e))?;
            debug!(path = %p.display(), "Loaded rule book");
            Ok(book)
        }
        Some(p) => {
            info!(path = %p.display(), "Rules file not found, starting from bundled tables");
            Ok(RuleBook::seeded())
        }
        None => Ok(RuleBook::seeded()),
    }
}

/// Write the rule book as pretty JSON, creating parent directories.
pub fn save(book: &RuleBook, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, book.to_json_pretty()?)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;
    info!(path = %path.display(), "Rule book saved");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricing_engine_core::rules::RuleStore;

    #[test]
    fn test_missing_file_falls_back_to_bundled_tables() {
        let path = std::env::temp_dir().join("pricer-no-such-rules.json");
        let book = load(Some(&path)).unwrap();
        assert!(book.get_classification("85171231").is_some());
    }

    #[test]
    fn test_save_then_load() {
        let dir = std::env::temp_dir().join(format!("pricer-rules-{}", std::process::id()));
        let path = dir.join("rules.json");
        let book = RuleBook::seeded();

        save(&book, &path).unwrap();
        let loaded = load(Some(&path)).unwrap();
        assert_eq!(loaded.to_data(), book.to_data());

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_corrupt_file_reports_path() {
        let dir = std::env::temp_dir().join(format!("pricer-bad-rules-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("rules.json");
        fs::write(&path, "{ nope").unwrap();

        let err = load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("rules.json"));

        let _ = fs::remove_dir_all(dir);
    }
}
