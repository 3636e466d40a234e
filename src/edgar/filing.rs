use anyhow::{anyhow, Context, Result};
use chardet::detect;
use encoding_rs::Encoding;
use encoding_rs_io::DecodeReaderBytesBuilder;
use std::fs;
use std::io::Read;
use std::path::Path;

use super::parsing::header;
use super::parsing::types::{FilingDocument, ParseOutcome, ParsedFiling, Section};
use super::report::ReportType;
use crate::core::config::DEFAULT_SECTION_MARKER;

pub const SECTION_MARKER: char = DEFAULT_SECTION_MARKER;

/// Charset detection only looks at the head of the submission.
const DETECT_WINDOW: usize = 64 * 1024;

/// Reads a submission from disk, transcoding from whatever charset it was
/// written in.
pub fn read_filing_text(path: &Path) -> Result<String> {
    log::debug!("Reading file: {}", path.display());
    let raw = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let charenc = detect(&raw[..raw.len().min(DETECT_WINDOW)]).0;
    log::debug!("Detected character encoding: {}", charenc);

    let mut reader = DecodeReaderBytesBuilder::new()
        .encoding(Encoding::for_label(charenc.as_bytes()))
        .build(raw.as_slice());
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .with_context(|| format!("Failed to decode {}", path.display()))?;
    Ok(text)
}

/// Loads one filing. Without an explicit form, the submission header's
/// declared type is used.
pub fn load_filing(path: &Path, report_type: Option<ReportType>) -> Result<FilingDocument> {
    let raw_text = read_filing_text(path)?;
    let report_type = match report_type {
        Some(rt) => rt,
        None => header::declared_report_type(&raw_text).ok_or_else(|| {
            anyhow!(
                "No form type given and {} declares none (expected one of {})",
                path.display(),
                ReportType::list_types()
            )
        })?,
    };
    Ok(FilingDocument::new(raw_text, report_type))
}

/// Flat section stream: one metadata JSON line, then `marker` + code + newline
/// + text + newline per section.
pub fn render_sections(parsed: &ParsedFiling, marker: char) -> Result<String> {
    let mut out = serde_json::to_string(&parsed.metadata)?;
    out.push('\n');
    for section in &parsed.sections {
        out.push(marker);
        out.push_str(&section.code);
        out.push('\n');
        out.push_str(&section.text.replace(marker, " "));
        out.push('\n');
    }
    Ok(out)
}

/// Writes the section stream for a parsed filing, or the JSON failure record.
pub fn write_outcome(outcome: &ParseOutcome, path: &Path, marker: char) -> Result<()> {
    let content = match outcome {
        ParseOutcome::Parsed(parsed) => render_sections(parsed, marker)?,
        ParseOutcome::Failed(failure) => serde_json::to_string_pretty(failure)?,
    };
    fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Reads a section stream back into its metadata line and sections. Spans are
/// not part of the stream and come back empty.
pub fn parse_section_stream(stream: &str, marker: char) -> Result<(serde_json::Value, Vec<Section>)> {
    let (head, body) = stream.split_once('\n').unwrap_or((stream, ""));
    let metadata: serde_json::Value =
        serde_json::from_str(head).context("Section stream does not start with a metadata record")?;

    let sections = body
        .split(marker)
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| {
            let (code, text) = chunk.split_once('\n').unwrap_or((chunk, ""));
            Section {
                code: code.trim().to_string(),
                text: text.strip_suffix('\n').unwrap_or(text).to_string(),
                span: 0..0,
            }
        })
        .collect();
    Ok((metadata, sections))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::types::{DiscoveryStrategy, FilingMetadata};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn parsed() -> ParsedFiling {
        ParsedFiling {
            metadata: FilingMetadata {
                cik: Some("0000123456".to_string()),
                ..Default::default()
            },
            report_type: ReportType::Form10K,
            strategy: DiscoveryStrategy::Pattern,
            sections: vec![
                Section {
                    code: "item1".to_string(),
                    text: "Business\nWe sell 90\u{b0} elbows.".to_string(),
                    span: 10..50,
                },
                Section {
                    code: "item1a".to_string(),
                    text: "Risk Factors".to_string(),
                    span: 51..70,
                },
            ],
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_render_sections() {
        let stream = render_sections(&parsed(), SECTION_MARKER).unwrap();
        let mut lines = stream.lines();
        let metadata: serde_json::Value = serde_json::from_str(lines.next().unwrap()).unwrap();
        assert_eq!(metadata["cik"], "0000123456");
        assert!(stream.contains("\u{b0}item1\nBusiness\nWe sell 90  elbows.\n\u{b0}item1a\n"));
    }

    #[test]
    fn test_parse_section_stream() {
        let stream = render_sections(&parsed(), SECTION_MARKER).unwrap();
        let (metadata, sections) = parse_section_stream(&stream, SECTION_MARKER).unwrap();
        assert_eq!(metadata["cik"], "0000123456");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, "Business\nWe sell 90  elbows.");
        assert_eq!(sections[1].code, "item1a");
        assert_eq!(sections[1].text, "Risk Factors");
    }

    #[test]
    fn test_load_filing_uses_declared_form() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "<SEC-HEADER>\nCONFORMED SUBMISSION TYPE:\t10-Q\n</SEC-HEADER>\n<DOCUMENT>\n<TYPE>10-Q\n</DOCUMENT>\n"
        )
        .unwrap();

        let filing = load_filing(file.path(), None).unwrap();
        assert_eq!(filing.report_type, ReportType::Form10Q);

        let filing = load_filing(file.path(), Some(ReportType::Form10K)).unwrap();
        assert_eq!(filing.report_type, ReportType::Form10K);
    }

    #[test]
    fn test_load_filing_without_form() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "<DOCUMENT>\n<TYPE>10-K\n</DOCUMENT>\n").unwrap();
        assert!(load_filing(file.path(), None).is_err());
    }

    #[test]
    fn test_read_utf8_filing_with_bom() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"\xef\xbb\xbf<p>Soci\xc3\xa9t\xc3\xa9 G\xc3\xa9n\xc3\xa9rale</p>")
            .unwrap();
        let text = read_filing_text(file.path()).unwrap();
        assert_eq!(text, "<p>Soci\u{e9}t\u{e9} G\u{e9}n\u{e9}rale</p>");
    }
}
