pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Resolve a command's input document: `--input` file first, then piped
/// stdin. `None` means the caller should build the input from flags.
pub fn read_document<T: DeserializeOwned>(
    path: Option<&str>,
) -> Result<Option<T>, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        return Ok(Some(file::read_structured(path)?));
    }
    match stdin::read_stdin()? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}
