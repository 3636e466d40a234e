use chrono::NaiveDate;
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;

use super::types::FilingMetadata;
use crate::edgar::report::ReportType;

static SEC_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<(SEC-HEADER|IMS-HEADER)>(.*?)</(SEC-HEADER|IMS-HEADER)>").unwrap());

/// Parses the submission header into `group:key` / `key` value pairs.
///
/// Falls back to the text before the first `<DOCUMENT>` when the submission
/// has no explicit header block (some dissemination copies strip it).
pub fn header_parser(raw_text: &str) -> Vec<(String, String)> {
    let header = match SEC_HEADER.captures(raw_text).and_then(|c| c.get(2)) {
        Some(m) => m.as_str(),
        None => {
            let end = raw_text.find("<DOCUMENT>").unwrap_or(raw_text.len());
            &raw_text[..end]
        }
    };

    let mut data = Vec::new();
    let mut current_group = String::new();
    for line in header.lines() {
        // Group labels sit at the left margin; their fields are indented.
        let indented = line.starts_with('\t') || line.starts_with(' ');
        let line = line.trim();
        if line.is_empty() || line.starts_with('<') {
            continue;
        }
        let Some(colon_index) = line.find(':') else {
            continue;
        };
        let key = line[..colon_index].trim();
        let value = decode_html_entities(line[colon_index + 1..].trim()).into_owned();
        if value.is_empty() {
            if !indented {
                current_group = key.to_string();
            }
            continue;
        }
        if !indented {
            current_group.clear();
        }
        if current_group.is_empty() {
            data.push((key.to_string(), value));
        } else {
            data.push((format!("{}:{}", current_group, key), value));
        }
    }

    data
}

fn first_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key || k.ends_with(&format!(":{}", key)))
        .map(|(_, v)| v.as_str())
}

pub fn parse_metadata(raw_text: &str) -> FilingMetadata {
    let pairs = header_parser(raw_text);
    log::debug!("Parsed {} submission header fields", pairs.len());

    FilingMetadata {
        cik: first_value(&pairs, "CENTRAL INDEX KEY").map(str::to_string),
        accession_number: first_value(&pairs, "ACCESSION NUMBER").map(str::to_string),
        company_name: first_value(&pairs, "COMPANY CONFORMED NAME").map(str::to_string),
        form_type: first_value(&pairs, "CONFORMED SUBMISSION TYPE").map(str::to_string),
        filed_as_of: first_value(&pairs, "FILED AS OF DATE")
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok()),
        document_filename: None,
    }
}

/// The form type the submission declares for itself, if any.
pub fn declared_report_type(raw_text: &str) -> Option<ReportType> {
    parse_metadata(raw_text)
        .form_type
        .and_then(|form| ReportType::from_str(&form).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "<SEC-DOCUMENT>0000123456-23-000077.txt : 20230804
<SEC-HEADER>0000123456-23-000077.hdr.sgml : 20230804
ACCESSION NUMBER:\t\t0000123456-23-000077
CONFORMED SUBMISSION TYPE:\t10-Q
FILED AS OF DATE:\t\t20230804

FILER:

\tCOMPANY DATA:\t
\t\tCOMPANY CONFORMED NAME:\t\t\tSMITH &amp; JONES INC
\t\tCENTRAL INDEX KEY:\t\t\t0000123456
</SEC-HEADER>
<DOCUMENT>
<TYPE>10-Q
";

    #[test]
    fn test_header_parser_groups() {
        let pairs = header_parser(HEADER);
        assert!(pairs.contains(&(
            "ACCESSION NUMBER".to_string(),
            "0000123456-23-000077".to_string()
        )));
        assert!(pairs.contains(&(
            "FILER:CENTRAL INDEX KEY".to_string(),
            "0000123456".to_string()
        )));
    }

    #[test]
    fn test_parse_metadata() {
        let metadata = parse_metadata(HEADER);
        assert_eq!(metadata.cik.as_deref(), Some("0000123456"));
        assert_eq!(metadata.company_name.as_deref(), Some("SMITH & JONES INC"));
        assert_eq!(metadata.form_type.as_deref(), Some("10-Q"));
        assert_eq!(
            metadata.filed_as_of,
            NaiveDate::from_ymd_opt(2023, 8, 4)
        );
        assert_eq!(declared_report_type(HEADER), Some(ReportType::Form10Q));
    }

    #[test]
    fn test_missing_header() {
        let metadata = parse_metadata("<DOCUMENT>\n<TYPE>10-K\n</DOCUMENT>");
        assert_eq!(metadata, FilingMetadata::default());
        assert_eq!(declared_report_type("no header here"), None);
    }
}
