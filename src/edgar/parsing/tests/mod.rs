use std::fs;
use std::path::PathBuf;

use super::types::FilingDocument;
use crate::edgar::report::ReportType;

pub fn get_test_file_path(filename: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("src/edgar/parsing/tests/data")
        .join(filename)
}

pub fn read_test_file(filename: &str) -> String {
    fs::read_to_string(get_test_file_path(filename))
        .unwrap_or_else(|e| panic!("Failed to read test file {}: {}", filename, e))
}

pub fn load_test_filing(filename: &str, report_type: ReportType) -> FilingDocument {
    FilingDocument::new(read_test_file(filename), report_type)
}
