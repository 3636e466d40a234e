use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use strum::{EnumIter, IntoEnumIterator};

/// Periodic report forms whose primary document can be split into items.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
#[serde(try_from = "String", into = "String")]
pub enum ReportType {
    Form10K,
    Form10K405,
    Form10KSB,
    Form10KT,
    Form10Q,
    Form10QSB,
    Form10QT,
    Other(String),
}

impl TryFrom<String> for ReportType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ReportType::from_str(&s)
    }
}

impl From<ReportType> for String {
    fn from(rt: ReportType) -> String {
        rt.to_string()
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportType::Form10K => write!(f, "10-K"),
            ReportType::Form10K405 => write!(f, "10-K405"),
            ReportType::Form10KSB => write!(f, "10-KSB"),
            ReportType::Form10KT => write!(f, "10-KT"),
            ReportType::Form10Q => write!(f, "10-Q"),
            ReportType::Form10QSB => write!(f, "10-QSB"),
            ReportType::Form10QT => write!(f, "10-QT"),
            ReportType::Other(s) => write!(f, "{}", s),
        }
    }
}

pub static REPORT_TYPES: Lazy<String> = Lazy::new(|| {
    ReportType::iter()
        .filter(|t| !matches!(t, ReportType::Other(_)))
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
});

impl ReportType {
    pub fn list_types() -> &'static str {
        &REPORT_TYPES
    }

    /// Annual report family (items numbered 1..16 across all parts).
    pub fn is_annual(&self) -> bool {
        matches!(
            self,
            ReportType::Form10K | ReportType::Form10K405 | ReportType::Form10KSB | ReportType::Form10KT
        )
    }

    /// Quarterly report family. Item numbering restarts in Part II, so these
    /// forms need part tracking during discovery.
    pub fn is_quarterly(&self) -> bool {
        matches!(
            self,
            ReportType::Form10Q | ReportType::Form10QSB | ReportType::Form10QT
        )
    }

    /// Does an envelope `<TYPE>` label name this form?
    pub fn matches_label(&self, label: &str) -> bool {
        self.to_string().eq_ignore_ascii_case(label.trim())
    }
}

impl FromStr for ReportType {
    type Err = String;
    fn from_str(s: &str) -> std::result::Result<ReportType, std::string::String> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("Report type cannot be empty".to_string());
        }
        match trimmed.to_uppercase().as_str() {
            "10-K" | "10K" => Ok(ReportType::Form10K),
            "10-K405" => Ok(ReportType::Form10K405),
            "10-KSB" => Ok(ReportType::Form10KSB),
            "10-KT" => Ok(ReportType::Form10KT),
            "10-Q" | "10Q" => Ok(ReportType::Form10Q),
            "10-QSB" => Ok(ReportType::Form10QSB),
            "10-QT" => Ok(ReportType::Form10QT),
            _ => Ok(ReportType::Other(trimmed.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(ReportType::from_str("10-q").unwrap(), ReportType::Form10Q);
        assert_eq!(ReportType::from_str(" 10-K ").unwrap(), ReportType::Form10K);
        assert_eq!(
            ReportType::from_str("8-K").unwrap(),
            ReportType::Other("8-K".to_string())
        );
        assert_eq!(ReportType::Form10KSB.to_string(), "10-KSB");
        assert!(ReportType::from_str("  ").is_err());
    }

    #[test]
    fn test_families() {
        assert!(ReportType::Form10K405.is_annual());
        assert!(ReportType::Form10QSB.is_quarterly());
        assert!(!ReportType::Form10QSB.is_annual());
        assert!(!ReportType::Other("S-1".to_string()).is_annual());
    }

    #[test]
    fn test_matches_label() {
        assert!(ReportType::Form10Q.matches_label("10-Q\n"));
        assert!(!ReportType::Form10Q.matches_label("10-Q/A"));
        assert!(ReportType::Form10K.matches_label("10-k"));
    }

    #[test]
    fn test_list_types_excludes_other() {
        let listed = ReportType::list_types();
        assert!(listed.starts_with("10-K, 10-K405"));
        assert!(listed.contains("10-QT"));
    }

    #[test]
    fn test_serde_as_label() {
        let json = serde_json::to_string(&ReportType::Form10Q).unwrap();
        assert_eq!(json, "\"10-Q\"");
        let back: ReportType = serde_json::from_str("\"10-K\"").unwrap();
        assert_eq!(back, ReportType::Form10K);
    }
}
