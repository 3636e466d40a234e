use once_cell::sync::Lazy;
use regex::Regex;

use super::error::SegmentError;
use super::types::SubDocument;
use crate::edgar::report::ReportType;

const ELEMENTS_LIST: &[(&str, &str)] = &[
    ("TYPE", "<TYPE>"),
    ("SEQUENCE", "<SEQUENCE>"),
    ("FILENAME", "<FILENAME>"),
    ("DESCRIPTION", "<DESCRIPTION>"),
];

static DOCUMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<DOCUMENT>(.*?)</DOCUMENT>").unwrap());
static TEXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<TEXT>(.*?)</TEXT>").unwrap());

fn element_value(document: &str, element_path: &str) -> Option<String> {
    document
        .split(element_path)
        .nth(1)
        .and_then(|s| s.split(['<', '\n']).next())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Lists every `<DOCUMENT>` in the submission envelope, in order.
pub fn parse_documents(raw_text: &str) -> Vec<SubDocument> {
    DOCUMENT
        .captures_iter(raw_text)
        .filter_map(|caps| caps.get(1))
        .map(|body| {
            let document = body.as_str();
            let mut values = ELEMENTS_LIST
                .iter()
                .map(|(_, path)| element_value(document, path));
            let doc_type = values.next().flatten().unwrap_or_default();
            let sequence = values.next().flatten();
            let filename = values.next().flatten();
            let description = values.next().flatten();

            let (offset, text) = match TEXT.captures(document).and_then(|c| c.get(1)) {
                Some(m) => (body.start() + m.start(), m.as_str().to_string()),
                None => (body.start(), document.to_string()),
            };

            SubDocument {
                doc_type,
                sequence,
                filename,
                description,
                offset,
                text,
            }
        })
        .collect()
}

/// Selects the first sub-document whose `<TYPE>` equals the filing's form.
pub fn extract_sub_document(
    raw_text: &str,
    report_type: &ReportType,
) -> Result<SubDocument, SegmentError> {
    let documents = parse_documents(raw_text);
    log::debug!(
        "Submission envelope holds {} document(s): {:?}",
        documents.len(),
        documents.iter().map(|d| d.doc_type.as_str()).collect::<Vec<_>>()
    );

    let found: Vec<String> = documents.iter().map(|d| d.doc_type.clone()).collect();
    documents
        .into_iter()
        .find(|d| report_type.matches_label(&d.doc_type))
        .ok_or_else(|| SegmentError::SubDocumentNotFound {
            expected: report_type.to_string(),
            found,
        })
}
