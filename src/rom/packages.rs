//! Package census from `packages.xml`
//!
//! Counts installed packages by provenance without pulling in an XML parser:
//! the file is machine-written with one `<package ...>` element per install,
//! so scanning for the element and its `flags`/`publicFlags` attribute is
//! enough.

use std::io;
use std::path::Path;

/// `ApplicationInfo.FLAG_SYSTEM`
const FLAG_SYSTEM: u64 = 1;
/// `ApplicationInfo.FLAG_UPDATED_SYSTEM_APP`
const FLAG_UPDATED_SYSTEM_APP: u64 = 1 << 7;

/// Package totals split by origin.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackageCounts {
    pub system: u32,
    pub system_update: u32,
    pub other: u32,
}

fn attr_value<'a>(element: &'a str, attr: &str) -> Option<&'a str> {
    let pattern = format!("{attr}=\"");
    let start = element.find(&pattern)? + pattern.len();
    let end = element[start..].find('"')? + start;
    Some(&element[start..end])
}

fn package_flags(element: &str) -> Option<u64> {
    // Newer dumps use publicFlags/privateFlags; older ones just flags
    let value = attr_value(element, "publicFlags").or_else(|| attr_value(element, "flags"))?;
    value.parse::<i64>().ok().map(|v| v as u64)
}

/// Count packages in the given `packages.xml` contents.
#[must_use]
pub fn count_packages_in(contents: &str) -> PackageCounts {
    let mut counts = PackageCounts::default();

    let mut rest = contents;
    while let Some(start) = rest.find("<package ") {
        rest = &rest[start..];
        let end = rest.find('>').unwrap_or(rest.len());
        let element = &rest[..end];
        rest = &rest[end..];

        let flags = package_flags(element).unwrap_or(0);
        if flags & FLAG_UPDATED_SYSTEM_APP != 0 {
            counts.system_update += 1;
        } else if flags & FLAG_SYSTEM != 0 {
            counts.system += 1;
        } else {
            counts.other += 1;
        }
    }

    counts
}

/// Count packages recorded in a ROM's `system/packages.xml`.
pub fn count_packages(packages_xml: &Path) -> io::Result<PackageCounts> {
    let contents = std::fs::read_to_string(packages_xml)?;
    Ok(count_packages_in(&contents))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_flags() {
        let xml = r#"<?xml version='1.0' encoding='utf-8'?>
<packages>
  <package name="com.android.settings" codePath="/system/priv-app/Settings" publicFlags="1074298437" />
  <package name="com.example.game" codePath="/data/app/com.example.game-1" publicFlags="940097094" />
  <package name="com.android.webview" codePath="/data/app/com.android.webview-2" flags="129" />
  <package name="com.example.tool" codePath="/data/app/com.example.tool-1" />
</packages>
"#;
        let counts = count_packages_in(xml);
        // 1074298437 has bit 0 set; 940097094 has neither; 129 has bit 7
        assert_eq!(counts.system, 1);
        assert_eq!(counts.system_update, 1);
        assert_eq!(counts.other, 2);
    }

    #[test]
    fn empty_file_counts_nothing() {
        assert_eq!(count_packages_in(""), PackageCounts::default());
    }
}
