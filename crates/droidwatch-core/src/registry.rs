//! Vendor/product name registry parsed from the `usb.ids` text format
//!
//! The file is a tab-indented outline:
//! - `vvvv  Vendor Name` at column zero starts a vendor
//! - `\tpppp  Product Name` adds a product under the last vendor
//! - `\t\tiiii  Interface Name` lines are interfaces and are ignored
//!
//! Lookups use lowercase hex keys: the 4-digit vendor ID maps to the vendor
//! name, and the 8-digit vendor+product ID maps to "vendor product".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Vendor ID that every intact copy of the registry contains
pub const SENTINEL_VENDOR_ID: &str = "0001";

/// Description used when neither the product nor the vendor is known
pub const NOT_FOUND_DESCRIPTION: &str = "Error: Not found";

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read USB ID registry: {0}")]
    IoError(#[from] std::io::Error),
    #[error("USB ID registry at {} is corrupt (vendor 0001 missing)", .path.display())]
    Corrupt { path: PathBuf },
}

/// Lookup table built from a `usb.ids` file
#[derive(Debug, Clone, Default)]
pub struct VendorRegistry {
    entries: HashMap<String, String>,
}

impl VendorRegistry {
    /// Parse registry text. Lines that cannot be classified are skipped.
    pub fn parse(content: &str) -> Self {
        let mut entries = HashMap::new();
        let mut vendor: Option<(String, String)> = None;

        for line in content.lines() {
            if line.trim().is_empty() || line.starts_with('#') {
                continue;
            }

            if line.starts_with("\t\t") {
                // interface
                continue;
            }

            if let Some(rest) = line.strip_prefix('\t') {
                let Some((vendor_id, vendor_name)) = &vendor else {
                    continue;
                };
                if let Some((product_id, product_name)) = split_id_line(rest) {
                    entries.insert(
                        format!("{}{}", vendor_id, product_id),
                        format!("{} {}", vendor_name, product_name),
                    );
                }
                continue;
            }

            // Class and language sections ("C 00  ...", "L 0001  ...") end the vendor list
            vendor = split_id_line(line);
            if let Some((vendor_id, vendor_name)) = &vendor {
                entries.insert(vendor_id.clone(), vendor_name.clone());
            }
        }

        debug!(entries = entries.len(), "Parsed USB ID registry");
        Self { entries }
    }

    /// Read and parse a registry file
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let bytes = std::fs::read(path)?;
        Ok(Self::parse(&String::from_utf8_lossy(&bytes)))
    }

    /// Read a registry file and check it is intact.
    ///
    /// A copy without the sentinel vendor is deleted (best effort) so the
    /// next run downloads a fresh one.
    pub fn load_validated(path: &Path) -> Result<Self, RegistryError> {
        let registry = Self::from_file(path)?;
        if registry.is_intact() {
            return Ok(registry);
        }

        warn!(path = %path.display(), "USB ID registry is corrupt, removing cached copy");
        if let Err(e) = std::fs::remove_file(path) {
            debug!(path = %path.display(), error = %e, "Could not remove corrupt registry");
        }
        Err(RegistryError::Corrupt {
            path: path.to_path_buf(),
        })
    }

    /// Whether the sentinel vendor is present
    pub fn is_intact(&self) -> bool {
        self.entries.contains_key(SENTINEL_VENDOR_ID)
    }

    pub fn vendor(&self, vendor_id: &str) -> Option<&str> {
        self.entries
            .get(&vendor_id.to_ascii_lowercase())
            .map(|s| s.as_str())
    }

    pub fn product(&self, vendor_id: &str, product_id: &str) -> Option<&str> {
        let key = format!("{}{}", vendor_id, product_id).to_ascii_lowercase();
        self.entries.get(&key).map(|s| s.as_str())
    }

    /// Describe a device: "vendor product", then vendor alone, then the
    /// not-found placeholder.
    pub fn describe(&self, vendor_id: &str, product_id: &str) -> String {
        self.product(vendor_id, product_id)
            .or_else(|| self.vendor(vendor_id))
            .unwrap_or(NOT_FOUND_DESCRIPTION)
            .to_string()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Split `abcd  Some Name` into a lowercase 4-digit hex ID and a name
fn split_id_line(line: &str) -> Option<(String, String)> {
    let id = line.get(..4)?;
    if !id.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let rest = &line[4..];
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    Some((id.to_ascii_lowercase(), rest.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = "\
# List of USB ID's
#
#\tvendor  vendor_name
#\t\tdevice  device_name

0001  Fry's Electronics
\t7778  Counterfeit flash drive [Kingston]
04e8  Samsung Electronics Co., Ltd
\t6860  Galaxy series, misc. (MTP mode)
\t\t00  Interface that must be ignored
18d1  Google Inc.
\t4ee1  Nexus
\t4ee2  Nexus Device (debug)

C 00  (Defined at Interface level)
\t01  Audio
";

    #[test]
    fn test_vendor_and_product_entries() {
        let registry = VendorRegistry::parse(SAMPLE);

        assert_eq!(registry.vendor("18d1"), Some("Google Inc."));
        assert_eq!(registry.product("18d1", "4ee1"), Some("Google Inc. Nexus"));
        assert_eq!(
            registry.product("04e8", "6860"),
            Some("Samsung Electronics Co., Ltd Galaxy series, misc. (MTP mode)")
        );
        assert!(registry.is_intact());
    }

    #[test]
    fn test_product_attaches_to_nearest_vendor() {
        let registry = VendorRegistry::parse(SAMPLE);

        assert_eq!(registry.product("18d1", "4ee2"), Some("Google Inc. Nexus Device (debug)"));
        assert!(registry.product("04e8", "4ee1").is_none());
        assert!(registry.product("0001", "6860").is_none());
    }

    #[test]
    fn test_product_order_within_vendor() {
        let forward = VendorRegistry::parse("18d1  Google Inc.\n\t4ee1  Nexus\n\t4ee2  Debug\n");
        let reversed = VendorRegistry::parse("18d1  Google Inc.\n\t4ee2  Debug\n\t4ee1  Nexus\n");

        assert_eq!(forward.product("18d1", "4ee1"), reversed.product("18d1", "4ee1"));
        assert_eq!(forward.product("18d1", "4ee2"), reversed.product("18d1", "4ee2"));
    }

    #[test]
    fn test_interfaces_and_classes_ignored() {
        let registry = VendorRegistry::parse(SAMPLE);

        // Class section does not create a vendor nor attach its subclasses
        assert!(registry.vendor("C 00").is_none());
        assert!(registry.product("18d1", "0001").is_none());
        assert_eq!(registry.len(), 7);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let registry = VendorRegistry::parse("zz\n\tab\n18d1\n0001  Ok\n\tx\n");
        assert_eq!(registry.vendor("0001"), Some("Ok"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_describe_fallback() {
        let registry = VendorRegistry::parse(SAMPLE);

        assert_eq!(registry.describe("18d1", "4ee1"), "Google Inc. Nexus");
        assert_eq!(registry.describe("18d1", "9999"), "Google Inc.");
        assert_eq!(registry.describe("ffff", "0000"), NOT_FOUND_DESCRIPTION);
        assert_eq!(registry.describe("18D1", "4EE1"), "Google Inc. Nexus");
    }

    #[test]
    fn test_load_validated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("usb.ids");
        std::fs::write(&path, SAMPLE).unwrap();

        let registry = VendorRegistry::load_validated(&path).unwrap();
        assert_eq!(registry.vendor("0001"), Some("Fry's Electronics"));
        assert!(path.exists());
    }

    #[test]
    fn test_corrupt_registry_is_removed() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("usb.ids");
        std::fs::write(&path, "<html>503 Service Unavailable</html>\n").unwrap();

        let err = VendorRegistry::load_validated(&path).unwrap_err();
        assert!(matches!(err, RegistryError::Corrupt { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let err = VendorRegistry::load_validated(&temp_dir.path().join("absent")).unwrap_err();
        assert!(matches!(err, RegistryError::IoError(_)));
    }

    #[test]
    fn test_non_utf8_content() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("usb.ids");
        let mut content = b"0001  Fry's Electronics\n1234  Caf".to_vec();
        content.extend_from_slice(&[0xe9, b'\n']);
        std::fs::write(&path, content).unwrap();

        let registry = VendorRegistry::from_file(&path).unwrap();
        assert!(registry.vendor("1234").unwrap().starts_with("Caf"));
    }
}
