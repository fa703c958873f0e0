//! Streaming parser for clrmamepro/Logiqx XML checksum databases.
//!
//! A DAT document contains one `<game>` (or `<machine>`) node per title, each
//! with one or more `<rom>` children:
//!
//! ```xml
//! <datafile>
//!   <game name="Game (USA)">
//!     <rom name="Game (USA).bin" size="1024" crc="0a1b2c3d" md5="..." sha1="..."/>
//!   </game>
//! </datafile>
//! ```

use crate::error::{DatError, Result};
use crate::record::ChecksumRecord;
use camino::Utf8Path;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};

/// Records read from one DAT document.
#[derive(Debug, Default)]
pub struct ParsedDat {
    pub records: Vec<ChecksumRecord>,
    /// `<rom>` entries that could not be turned into a record.
    pub malformed: Vec<DatError>,
}

/// Parse the DAT file at `path`.
pub fn parse_dat_file(path: &Utf8Path) -> Result<ParsedDat> {
    let file = File::open(path.as_std_path())?;
    parse_dat(BufReader::new(file), path)
}

/// Parse a DAT document. `path` is only used for error messages.
///
/// Malformed `<rom>` entries are collected in [`ParsedDat::malformed`]; only
/// a document that is not well-formed XML fails as a whole.
pub fn parse_dat<R: BufRead>(input: R, path: &Utf8Path) -> Result<ParsedDat> {
    let mut reader = Reader::from_reader(input);
    reader.config_mut().trim_text(true);

    let xml_error = |source: quick_xml::Error| DatError::Xml {
        path: path.to_path_buf(),
        source,
    };

    let mut parsed = ParsedDat::default();
    // Some(Ok(name)) inside a named game node, Some(Err(())) inside one without a name
    let mut current_game: Option<std::result::Result<String, ()>> = None;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) if is_game_node(&e) => {
                let attrs = read_attributes(&e).map_err(xml_error)?;
                current_game = Some(attrs.get("name").cloned().ok_or(()));
            }
            Event::Empty(e) if is_game_node(&e) => {
                // A game without files describes nothing we can match
            }
            Event::End(e) if matches!(e.name().as_ref(), b"game" | b"machine") => {
                current_game = None;
            }
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"rom" => {
                let Some(game) = &current_game else {
                    continue;
                };
                let attrs = read_attributes(&e).map_err(xml_error)?;
                let record = match game {
                    Ok(game) => build_record(game, &attrs),
                    Err(()) => Err(DatError::MalformedRecord {
                        game: "<unnamed>".to_string(),
                        reason: "game node has no name".to_string(),
                    }),
                };
                match record {
                    Ok(record) => parsed.records.push(record),
                    Err(e) => {
                        tracing::warn!("Skipping record in {}: {}", path, e);
                        parsed.malformed.push(e);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    tracing::debug!(
        "Parsed {} records ({} malformed) from {}",
        parsed.records.len(),
        parsed.malformed.len(),
        path
    );
    Ok(parsed)
}

fn is_game_node(e: &BytesStart) -> bool {
    matches!(e.name().as_ref(), b"game" | b"machine")
}

fn read_attributes(e: &BytesStart) -> std::result::Result<HashMap<String, String>, quick_xml::Error> {
    let mut attrs = HashMap::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn build_record(game: &str, attrs: &HashMap<String, String>) -> Result<ChecksumRecord> {
    let malformed = |reason: String| DatError::MalformedRecord {
        game: game.to_string(),
        reason,
    };
    let required = |key: &str| {
        attrs
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
            .ok_or_else(|| malformed(format!("missing attribute '{}'", key)))
    };

    let file = required("name")?;
    let md5 = required("md5")?;

    let size = match attrs.get("size") {
        Some(size) => Some(
            size.parse::<u64>()
                .map_err(|_| malformed(format!("invalid size '{}'", size)))?,
        ),
        None => None,
    };
    let optional = |key: &str| attrs.get(key).map(|v| v.to_ascii_lowercase());

    let mut record = ChecksumRecord::new(game, file, md5);
    record.size = size;
    record.crc = optional("crc");
    record.sha1 = optional("sha1");
    record.sha256 = optional("sha256");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5_A: &str = "0123456789abcdef0123456789abcdef";
    const MD5_B: &str = "fedcba9876543210fedcba9876543210";

    fn parse(xml: &str) -> ParsedDat {
        parse_dat(xml.as_bytes(), Utf8Path::new("test.dat")).unwrap()
    }

    #[test]
    fn test_parse_games_and_roms() {
        let parsed = parse(&format!(
            r#"<?xml version="1.0"?>
            <!DOCTYPE datafile PUBLIC "-//Logiqx//DTD ROM Management Datafile//EN" "http://www.logiqx.com/Dats/datafile.dtd">
            <datafile>
              <header><name>Test</name></header>
              <game name="Game &amp; Watch (USA)">
                <description>Game &amp; Watch (USA)</description>
                <rom name="Game &amp; Watch (USA) (Track 1).bin" size="1024" crc="0A1B2C3D" md5="{MD5_A}" sha1="aa"/>
                <rom name="Game &amp; Watch (USA) (Track 2).bin" size="2048" crc="00000000" md5="{MD5_B}"></rom>
              </game>
            </datafile>"#
        ));

        assert!(parsed.malformed.is_empty());
        assert_eq!(parsed.records.len(), 2);
        let first = &parsed.records[0];
        assert_eq!(first.game, "Game & Watch (USA)");
        assert_eq!(first.file, "Game & Watch (USA) (Track 1).bin");
        assert_eq!(first.size, Some(1024));
        assert_eq!(first.crc.as_deref(), Some("0a1b2c3d"));
        assert_eq!(first.sha1.as_deref(), Some("aa"));
        assert_eq!(first.sha256, None);
        assert_eq!(parsed.records[1].md5, MD5_B);
    }

    #[test]
    fn test_machine_nodes_accepted() {
        let parsed = parse(&format!(
            r#"<datafile><machine name="arcade"><rom name="a.rom" md5="{MD5_A}"/></machine></datafile>"#
        ));
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].game, "arcade");
    }

    #[test]
    fn test_malformed_records_skipped() {
        let parsed = parse(&format!(
            r#"<datafile>
              <game name="Good"><rom name="good.bin" md5="{MD5_A}"/></game>
              <game name="NoMd5"><rom name="nomd5.bin" size="1"/></game>
              <game name="BadSize"><rom name="bad.bin" size="big" md5="{MD5_B}"/></game>
              <game><rom name="orphan.bin" md5="{MD5_B}"/></game>
            </datafile>"#
        ));
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].file, "good.bin");
        assert_eq!(parsed.malformed.len(), 3);
        assert!(parsed
            .malformed
            .iter()
            .all(|e| e.kind() == gvault_core::ErrorKind::Parse));
    }

    #[test]
    fn test_roms_outside_games_ignored() {
        let parsed = parse(&format!(r#"<datafile><rom name="x.bin" md5="{MD5_A}"/></datafile>"#));
        assert!(parsed.records.is_empty());
        assert!(parsed.malformed.is_empty());
    }

    #[test]
    fn test_broken_document_fails() {
        let err = parse_dat(
            "<datafile><game name=\"x\"></datafile>".as_bytes(),
            Utf8Path::new("broken.dat"),
        )
        .unwrap_err();
        assert!(matches!(err, DatError::Xml { .. }));
    }
}
