//! USB topology dump parsing
//!
//! The dump (`system_profiler SPUSBDataType`) is an indented outline of
//! `Field: value` lines grouped in blank-line separated blocks:
//!
//! ```text
//! USB:
//!
//!     USB 3.1 Bus:
//!
//!       Host Controller Driver: AppleT8103USBXHCI
//!
//!         Pixel 7:
//!
//!           Product ID: 0x4ee7
//!           Vendor ID: 0x18d1  (Google Inc.)
//!           Serial Number: 2A111FDH200BXY
//! ```
//!
//! A block made of a single line (`Pixel 7:`) is a title, not a node. It is
//! never emitted; the name it carries is given to the block that follows.

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, trace};

/// Vendor ID of the host's built-in controllers and hubs
pub const BUILTIN_VENDOR_ID: &str = "05ac";

/// Lines at the top of the dump that precede the first block
const HEADER_LINES: usize = 2;

pub const VENDOR_ID_FIELD: &str = "Vendor ID";
pub const PRODUCT_ID_FIELD: &str = "Product ID";
pub const SERIAL_NUMBER_FIELD: &str = "Serial Number";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Device {serial} has no {field} field")]
    MissingField { serial: String, field: &'static str },
    #[error("Device {serial} has malformed {field} field: {value:?}")]
    MalformedField {
        serial: String,
        field: &'static str,
        value: String,
    },
}

/// One node of the dump: a bus, hub or device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyBlock {
    /// Title line of the block, if any
    pub name: Option<String>,
    /// Raw field values, keyed by field name. Values keep their leading space.
    pub fields: HashMap<String, String>,
}

impl TopologyBlock {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(|s| s.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.fields.is_empty()
    }
}

/// A USB device that may be a phone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidatePhone {
    pub vendor_id: String,
    pub product_id: String,
    pub serial: String,
    pub name: Option<String>,
}

/// Split the dump into blocks
pub fn parse_blocks(dump: &str) -> Vec<TopologyBlock> {
    let mut blocks = Vec::new();
    let mut current = TopologyBlock::default();
    let mut lines_in_block = 0usize;

    for line in dump.lines().skip(HEADER_LINES) {
        let line = line.trim();

        if line.is_empty() {
            if lines_in_block == 1 {
                // Only a title survives a single-line block
                current.fields.clear();
            } else {
                blocks.push(std::mem::take(&mut current));
            }
            lines_in_block = 0;
            continue;
        }

        lines_in_block += 1;
        match line.rsplit_once(':') {
            Some((field, value)) if !value.is_empty() => {
                current.fields.insert(field.to_string(), value.to_string());
            }
            Some((title, _)) if lines_in_block == 1 => {
                current.name = Some(title.to_string());
            }
            None if lines_in_block == 1 => {
                current.name = Some(line.to_string());
            }
            _ => trace!(line, "Ignoring topology line without value"),
        }
    }

    if lines_in_block != 1 && !current.is_empty() {
        blocks.push(current);
    }

    blocks
}

/// Extract the `0x`-prefixed 4-digit hex ID at the start of a raw value.
///
/// Values look like ` 0x18d1  (Google Inc.)`: leading whitespace, `0x`,
/// four hex digits, then anything.
pub fn parse_hex_id(value: &str) -> Option<String> {
    if !value.starts_with(char::is_whitespace) {
        return None;
    }
    let digits = value.trim_start().strip_prefix("0x")?.get(..4)?;
    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(digits.to_ascii_lowercase())
}

/// Resolve a vendor ID value, accepting the symbolic Apple form newer
/// dumps print instead of `0x05ac`.
fn parse_vendor_id(value: &str) -> Option<String> {
    if value.trim() == "apple_vendor_id" {
        return Some(BUILTIN_VENDOR_ID.to_string());
    }
    parse_hex_id(value)
}

fn id_field(
    block: &TopologyBlock,
    serial: &str,
    field: &'static str,
    parse: fn(&str) -> Option<String>,
) -> Result<String, TopologyError> {
    let value = block.field(field).ok_or_else(|| TopologyError::MissingField {
        serial: serial.to_string(),
        field,
    })?;
    parse(value).ok_or_else(|| TopologyError::MalformedField {
        serial: serial.to_string(),
        field,
        value: value.to_string(),
    })
}

impl CandidatePhone {
    /// Build a candidate from a block.
    ///
    /// Returns `Ok(None)` for blocks without a serial number and for the
    /// host's built-in devices.
    pub fn from_block(block: &TopologyBlock) -> Result<Option<Self>, TopologyError> {
        let Some(serial) = block.field(SERIAL_NUMBER_FIELD) else {
            return Ok(None);
        };
        let serial = serial.trim().to_string();

        let vendor_id = id_field(block, &serial, VENDOR_ID_FIELD, parse_vendor_id)?;
        if vendor_id == BUILTIN_VENDOR_ID {
            trace!(serial = %serial, "Skipping built-in device");
            return Ok(None);
        }
        let product_id = id_field(block, &serial, PRODUCT_ID_FIELD, parse_hex_id)?;

        Ok(Some(Self {
            vendor_id,
            product_id,
            serial,
            name: block.name.clone(),
        }))
    }
}

/// Parse a topology dump into phone candidates
pub fn parse_phones(dump: &str) -> Result<Vec<CandidatePhone>, TopologyError> {
    let blocks = parse_blocks(dump);
    let mut phones = Vec::new();

    for block in &blocks {
        if let Some(phone) = CandidatePhone::from_block(block)? {
            phones.push(phone);
        }
    }

    debug!(blocks = blocks.len(), phones = phones.len(), "Parsed USB topology");
    Ok(phones)
}
