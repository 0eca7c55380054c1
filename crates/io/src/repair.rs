//! Styles-part repair for XLSX archives.
//!
//! Some inventory systems export workbooks whose `xl/styles.xml` carries a
//! misspelled attribute name. Readers that validate styles reject the whole
//! file even though the cell data is intact. The repair rewrites only the
//! styles part (byte-level find/replace); every other entry is copied raw so
//! its compressed bytes are untouched.

use std::io::{Cursor, Read, Write};

use quick_xml::events::Event;
use quick_xml::Reader;
use stockfeed_recon::config::TokenRepair;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Result of a successful repair pass.
#[derive(Debug, Clone)]
pub struct RepairedArchive {
    pub bytes: Vec<u8>,
    /// Archive path of the rewritten styles part.
    pub styles_part: String,
    /// Total token substitutions made.
    pub replacements: usize,
}

/// Rewrite the styles part of an XLSX archive, applying each repair in order.
///
/// Fails when the input is not a ZIP archive, has no styles part, or the
/// repaired styles part is not well-formed XML.
pub fn repair_styles(bytes: &[u8], repairs: &[TokenRepair]) -> Result<RepairedArchive, String> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not an XLSX archive: {e}"))?;

    let (styles_part, mut styles) = read_styles(&mut archive)?;

    let mut replacements = 0;
    for repair in repairs {
        let (patched, count) = replace_all(&styles, repair.find.as_bytes(), repair.replace.as_bytes());
        if count > 0 {
            log::debug!("repair: {count} x '{}' -> '{}' in {styles_part}", repair.find, repair.replace);
        }
        styles = patched;
        replacements += count;
    }

    check_well_formed(&styles).map_err(|e| format!("'{styles_part}' is still malformed after repair: {e}"))?;

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let name = archive
            .by_index_raw(i)
            .map_err(|e| format!("failed to read archive entry {i}: {e}"))?
            .name()
            .to_string();

        if name == styles_part {
            writer
                .start_file(name.as_str(), options)
                .and_then(|_| writer.write_all(&styles).map_err(Into::into))
                .map_err(|e| format!("failed to write '{name}': {e}"))?;
            continue;
        }

        let entry = archive
            .by_index_raw(i)
            .map_err(|e| format!("failed to read archive entry '{name}': {e}"))?;
        writer
            .raw_copy_file(entry)
            .map_err(|e| format!("failed to copy '{name}': {e}"))?;
    }

    let bytes = writer
        .finish()
        .map_err(|e| format!("failed to finish repaired archive: {e}"))?
        .into_inner();

    Ok(RepairedArchive { bytes, styles_part, replacements })
}

/// Whether the styles part carries any of the repair tokens.
///
/// False for input that is not a ZIP archive or has no styles part; the normal
/// read path reports those.
pub fn needs_repair(bytes: &[u8], repairs: &[TokenRepair]) -> bool {
    let Ok(mut archive) = ZipArchive::new(Cursor::new(bytes)) else {
        return false;
    };
    let Ok((_, styles)) = read_styles(&mut archive) else {
        return false;
    };
    repairs.iter().any(|r| contains(&styles, r.find.as_bytes()))
}

fn read_styles<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Result<(String, Vec<u8>), String> {
    let styles_part = find_styles_part(archive).ok_or_else(|| "archive has no styles part".to_string())?;

    let mut styles = Vec::new();
    archive
        .by_name(&styles_part)
        .and_then(|mut f| f.read_to_end(&mut styles).map_err(Into::into))
        .map_err(|e| format!("failed to read '{styles_part}': {e}"))?;
    Ok((styles_part, styles))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    !needle.is_empty() && haystack.windows(needle.len()).any(|w| w == needle)
}

/// Locate the workbook styles part. Normally `xl/styles.xml`; matched
/// case-insensitively because some writers capitalize part names.
fn find_styles_part<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>) -> Option<String> {
    let names: Vec<String> = archive.file_names().map(|s| s.to_string()).collect();
    names
        .iter()
        .find(|n| n.as_str() == "xl/styles.xml")
        .or_else(|| names.iter().find(|n| n.eq_ignore_ascii_case("xl/styles.xml")))
        .cloned()
}

/// Replace every non-overlapping occurrence of `find`. Returns the new buffer
/// and the number of substitutions.
pub fn replace_all(haystack: &[u8], find: &[u8], replace: &[u8]) -> (Vec<u8>, usize) {
    if find.is_empty() {
        return (haystack.to_vec(), 0);
    }

    let mut out = Vec::with_capacity(haystack.len());
    let mut count = 0;
    let mut i = 0;
    while i < haystack.len() {
        if haystack[i..].starts_with(find) {
            out.extend_from_slice(replace);
            i += find.len();
            count += 1;
        } else {
            out.push(haystack[i]);
            i += 1;
        }
    }
    (out, count)
}

fn check_well_formed(xml: &[u8]) -> Result<(), String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Eof) => return Ok(()),
            Err(e) => return Err(format!("XML parse error at byte {}: {e}", reader.buffer_position())),
            _ => {}
        }
        buf.clear();
    }
}
