// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Fast entity scanner using SIMD-accelerated byte searching
//!
//! Finds entity boundaries in the DATA section without decoding attributes,
//! and checks the overall ISO-10303-21 envelope.

use crate::tokenizer::parse_record;
use ifc_frag_model::{AttributeValue, EntityId, IfcType, ParseError, Result};
use memchr::{memchr, memmem};
use rustc_hash::FxHashMap;

/// Entity index mapping ID to byte offsets
pub type EntityIndex = FxHashMap<u32, (usize, usize)>;

/// Type index mapping each entity type to its IDs, in file order
pub type TypeIndex = FxHashMap<IfcType, Vec<EntityId>>;

const PREAMBLE: &str = "ISO-10303-21;";
const TERMINATOR: &str = "END-ISO-10303-21;";

/// Fast entity scanner for IFC files
///
/// Uses memchr for SIMD-accelerated scanning to quickly find entity
/// boundaries without full parsing.
pub struct EntityScanner<'a> {
    content: &'a str,
    pos: usize,
}

impl<'a> EntityScanner<'a> {
    /// Create a scanner positioned after the `DATA;` marker
    pub fn new(content: &'a str) -> Self {
        let pos = memmem::find(content.as_bytes(), b"DATA;")
            .map(|p| p + 5)
            .unwrap_or(content.len());

        Self { content, pos }
    }

    /// Scan to find the next entity
    ///
    /// Returns (id, type_name, start_byte, end_byte)
    pub fn next_entity(&mut self) -> Option<(u32, &'a str, usize, usize)> {
        let bytes = self.content.as_bytes();

        while self.pos < bytes.len() {
            let hash_pos = memchr(b'#', &bytes[self.pos..])?;
            self.pos += hash_pos;

            // Definitions start a line or follow the previous record's ';'.
            // Anything else is a reference inside an attribute list.
            let is_entity_start = self.pos == 0
                || matches!(bytes[self.pos - 1], b'\n' | b'\r' | b';' | b' ' | b'\t')
                    && self.at_line_start();

            if !is_entity_start {
                self.pos += 1;
                continue;
            }

            let start = self.pos;
            self.pos += 1;
            let id_start = self.pos;
            self.skip_while(|b| b.is_ascii_digit());
            if self.pos == id_start {
                continue;
            }
            let id: u32 = match self.content[id_start..self.pos].parse() {
                Ok(id) => id,
                Err(_) => continue,
            };

            self.skip_while(|b| b == b' ' || b == b'\t');
            if bytes.get(self.pos) != Some(&b'=') {
                continue;
            }
            self.pos += 1;
            self.skip_while(|b| b == b' ' || b == b'\t');

            let type_start = self.pos;
            self.skip_while(|b| b.is_ascii_alphanumeric() || b == b'_');
            if self.pos == type_start {
                continue;
            }
            let type_name = &self.content[type_start..self.pos];

            let end = self.find_entity_end()?;
            return Some((id, type_name, start, end));
        }

        None
    }

    /// Whether only blanks separate the current position from a line or record start
    fn at_line_start(&self) -> bool {
        let bytes = self.content.as_bytes();
        bytes[..self.pos]
            .iter()
            .rev()
            .find(|b| !matches!(b, b' ' | b'\t'))
            .map_or(true, |b| matches!(b, b'\n' | b'\r' | b';'))
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) {
        let bytes = self.content.as_bytes();
        while self.pos < bytes.len() && pred(bytes[self.pos]) {
            self.pos += 1;
        }
    }

    /// Find the end of an entity (semicolon), handling quoted strings
    fn find_entity_end(&mut self) -> Option<usize> {
        let bytes = self.content.as_bytes();
        let mut in_string = false;

        while self.pos < bytes.len() {
            match bytes[self.pos] {
                b'\'' => {
                    if in_string && bytes.get(self.pos + 1) == Some(&b'\'') {
                        self.pos += 2;
                        continue;
                    }
                    in_string = !in_string;
                }
                b';' if !in_string => {
                    self.pos += 1;
                    return Some(self.pos);
                }
                _ => {}
            }
            self.pos += 1;
        }

        None
    }

    /// Build the id and type indexes in a single pass
    pub fn build_indexes(content: &'a str) -> (EntityIndex, TypeIndex) {
        let mut scanner = Self::new(content);
        let mut index = EntityIndex::default();
        let mut types = TypeIndex::default();

        while let Some((id, type_name, start, end)) = scanner.next_entity() {
            index.insert(id, (start, end));
            types
                .entry(IfcType::parse(type_name))
                .or_default()
                .push(EntityId(id));
        }

        (index, types)
    }

    /// Get total entity count
    pub fn entity_count(content: &'a str) -> usize {
        let mut scanner = Self::new(content);
        let mut count = 0;

        while scanner.next_entity().is_some() {
            count += 1;
        }

        count
    }
}

/// Check the ISO-10303-21 envelope: preamble, DATA section and terminator.
///
/// A buffer cut short anywhere fails here before any entity is decoded.
pub fn check_envelope(content: &str) -> Result<()> {
    let trimmed = content.trim();
    if !trimmed.starts_with(PREAMBLE) {
        return Err(ParseError::format(format!(
            "missing {PREAMBLE} preamble, not a STEP file"
        )));
    }
    if memmem::find(trimmed.as_bytes(), b"DATA;").is_none() {
        return Err(ParseError::format("missing DATA section"));
    }
    if !trimmed.ends_with(TERMINATOR) {
        return Err(ParseError::format(format!(
            "truncated file, missing {TERMINATOR}"
        )));
    }
    Ok(())
}

/// Parse the header section to extract metadata
pub fn parse_header(content: &str) -> HeaderInfo {
    let mut info = HeaderInfo::default();

    let header_start = content.find("HEADER;").map(|p| p + 7).unwrap_or(0);
    let header_end = content[header_start..]
        .find("ENDSEC;")
        .map(|p| header_start + p)
        .unwrap_or(content.len());
    let header = &content[header_start..header_end];

    if let Some(args) = header_record(header, "FILE_SCHEMA") {
        // FILE_SCHEMA(('IFC4'))
        info.schema_version = args
            .first()
            .and_then(|v| v.as_list())
            .and_then(|schemas| schemas.first())
            .and_then(|s| s.as_string())
            .unwrap_or_default()
            .to_string();
    }

    if let Some(args) = header_record(header, "FILE_NAME") {
        // FILE_NAME(name, time_stamp, (author), (organization), preprocessor, originating_system, authorization)
        let text = |i: usize| {
            args.get(i)
                .and_then(|v| v.as_string())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let first_of = |i: usize| {
            args.get(i)
                .and_then(|v| v.as_list())
                .and_then(|l| l.iter().find_map(|v| v.as_string().filter(|s| !s.is_empty())))
                .map(str::to_string)
        };

        info.file_name = text(0);
        info.timestamp = text(1);
        info.author = first_of(2);
        info.organization = first_of(3);
        info.preprocessor_version = text(4);
        info.originating_system = text(5);
    }

    info
}

fn header_record(header: &str, keyword: &str) -> Option<Vec<AttributeValue>> {
    let at = header.find(keyword)?;
    let (_, args) = parse_record(&header[at..])?;
    Some(args)
}

/// Header information extracted from IFC file
#[derive(Clone, Debug, Default)]
pub struct HeaderInfo {
    pub schema_version: String,
    pub file_name: Option<String>,
    pub timestamp: Option<String>,
    pub author: Option<String>,
    pub organization: Option<String>,
    pub preprocessor_version: Option<String>,
    pub originating_system: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_IFC: &str = r#"ISO-10303-21;
HEADER;
FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');
FILE_NAME('test.ifc','2024-01-01T00:00:00',('Author'),('Org'),'Preprocessor','App','');
FILE_SCHEMA(('IFC2X3'));
ENDSEC;
DATA;
#1=IFCPROJECT('guid',$,'Project',$,$,$,$,$,#2);
#2=IFCUNITASSIGNMENT((#3));
#3=IFCSIUNIT(*,.LENGTHUNIT.,.MILLI.,.METRE.);
#4=IFCWALL('guid;with;semicolons',$,'Wall 1',$,$,#5,#6,$);
#5=IFCWALL('other',$,'Wall 2',$,$,$,$,$);
ENDSEC;
END-ISO-10303-21;
"#;

    #[test]
    fn test_scanner_finds_entities() {
        let mut scanner = EntityScanner::new(TEST_IFC);
        let mut entities = Vec::new();

        while let Some((id, type_name, _, _)) = scanner.next_entity() {
            entities.push((id, type_name.to_string()));
        }

        assert_eq!(entities.len(), 5);
        assert_eq!(entities[0], (1, "IFCPROJECT".to_string()));
        assert_eq!(entities[3], (4, "IFCWALL".to_string()));
    }

    #[test]
    fn test_semicolons_inside_strings() {
        let (index, _) = EntityScanner::build_indexes(TEST_IFC);
        let (start, end) = index[&4];
        assert!(TEST_IFC[start..end].ends_with("$,#5,#6,$);"));
    }

    #[test]
    fn test_build_indexes() {
        let (index, types) = EntityScanner::build_indexes(TEST_IFC);
        assert_eq!(index.len(), 5);
        assert_eq!(
            types.get(&IfcType::IfcWall),
            Some(&vec![EntityId(4), EntityId(5)])
        );
        assert_eq!(EntityScanner::entity_count(TEST_IFC), 5);
    }

    #[test]
    fn test_parse_header() {
        let info = parse_header(TEST_IFC);
        assert_eq!(info.schema_version, "IFC2X3");
        assert_eq!(info.file_name.as_deref(), Some("test.ifc"));
        assert_eq!(info.author.as_deref(), Some("Author"));
        assert_eq!(info.organization.as_deref(), Some("Org"));
        assert_eq!(info.originating_system.as_deref(), Some("App"));
    }

    #[test]
    fn test_envelope() {
        assert!(check_envelope(TEST_IFC).is_ok());

        let truncated = &TEST_IFC[..TEST_IFC.len() / 2];
        assert!(matches!(
            check_envelope(truncated),
            Err(ParseError::InvalidFormat(_))
        ));
        assert!(check_envelope("hello world").is_err());
    }
}
