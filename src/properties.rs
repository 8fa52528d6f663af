//! Android-style property file parsing (`key=value` lines)

use std::collections::HashMap;
use std::io;
use std::path::Path;

/// Read every property from a `key=value` file.
///
/// Blank lines and `#` comments are ignored; later keys win.
pub fn read_property_file(path: &Path) -> io::Result<HashMap<String, String>> {
    let contents = std::fs::read_to_string(path)?;
    Ok(parse_properties(&contents))
}

/// Parse property lines from an in-memory string.
#[must_use]
pub fn parse_properties(contents: &str) -> HashMap<String, String> {
    let mut props = HashMap::new();
    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, value)) = line.split_once('=') {
            props.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    props
}

/// Write properties back out, one `key=value` per line in sorted order.
pub fn write_property_file(path: &Path, props: &HashMap<String, String>) -> io::Result<()> {
    let mut keys: Vec<&String> = props.keys().collect();
    keys.sort();
    let mut out = String::new();
    for key in keys {
        out.push_str(key);
        out.push('=');
        out.push_str(&props[key]);
        out.push('\n');
    }
    std::fs::write(path, out)
}

/// Read one property from a file; `None` if the file or key is missing.
#[must_use]
pub fn get_property(path: &Path, key: &str) -> Option<String> {
    read_property_file(path).ok()?.remove(key)
}
