//! The `SymbolRef` string grammar used by external tools.
//!
//! A reference has the shape `<file_path>:<start_line>#<name>`. File paths
//! may themselves contain colons (Windows drive letters), so parsing splits
//! on the last `:` before the `#`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IndexError;

/// A parsed `<file_path>:<start_line>#<name>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolRef {
    pub file_path: String,
    pub start_line: u32,
    pub name: String,
}

impl SymbolRef {
    pub fn new(file_path: impl Into<String>, start_line: u32, name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            start_line,
            name: name.into(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, IndexError> {
        let invalid = || IndexError::InvalidSymbolRef {
            input: input.to_string(),
        };

        let hash = input.rfind('#').ok_or_else(invalid)?;
        let (prefix, name) = input.split_at(hash);
        let name = &name[1..];
        if name.is_empty() {
            return Err(invalid());
        }

        let colon = prefix.rfind(':').ok_or_else(invalid)?;
        let (file_path, line) = prefix.split_at(colon);
        let start_line: u32 = line[1..].parse().map_err(|_| invalid())?;
        if file_path.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            file_path: file_path.to_string(),
            start_line,
            name: name.to_string(),
        })
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}#{}", self.file_path, self.start_line, self.name)
    }
}

impl FromStr for SymbolRef {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_ref() {
        let r = SymbolRef::parse("src/app.ts:42#main").unwrap();
        assert_eq!(r.file_path, "src/app.ts");
        assert_eq!(r.start_line, 42);
        assert_eq!(r.name, "main");
    }

    #[test]
    fn parse_windows_drive_letter() {
        let r = SymbolRef::parse("C:\\proj\\src\\app.ts:7#run").unwrap();
        assert_eq!(r.file_path, "C:\\proj\\src\\app.ts");
        assert_eq!(r.start_line, 7);
        assert_eq!(r.name, "run");
    }

    #[test]
    fn round_trip() {
        let original = SymbolRef::new("lib/util.py", 13, "helper");
        let parsed = SymbolRef::parse(&original.to_string()).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn rejects_malformed_input() {
        assert!(SymbolRef::parse("no-separators").is_err());
        assert!(SymbolRef::parse("file.ts:#name").is_err());
        assert!(SymbolRef::parse("file.ts:12#").is_err());
        assert!(SymbolRef::parse(":12#name").is_err());
        assert!(SymbolRef::parse("file.ts:abc#name").is_err());
    }
}
