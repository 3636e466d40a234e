use encoding_rs::WINDOWS_1252;
use html_escape::{decode_html_entities, encode_text};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::table::TableClassifier;
use crate::core::config::SegmenterConfig;

static IX_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<ix:header\b.*?</ix:header\s*>").unwrap());
static XBRL_BLOCK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<XBRL>.*?</XBRL>").unwrap());
static UUENCODED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?ms)^begin [0-7]{3} [^\n]*\n.*?^end[ \t]*$").unwrap());
static SCRIPT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static STYLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"&(?:#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").unwrap()
});

static INLINE_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</?(?:font|span|b|i|u|em|strong|small|big|sup|sub|s|strike|tt|ins|del|ix:[a-z]+)\b[^>]*>",
    )
    .unwrap()
});
static ANCHOR_OPEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<a\b[^>]*>").unwrap());
static ANCHOR_TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:id|name|href)\s*=").unwrap());
static PAGE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<hr\b[^>]*>|</?PAGE>").unwrap());

/// Normalized primary-document text. Every offset produced by discovery
/// indexes `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDocument {
    pub text: String,
    pub tables_kept: usize,
    pub tables_dropped: usize,
}

#[derive(Debug, Clone)]
pub struct MarkupNormalizer {
    payload: Regex,
    classifier: TableClassifier,
}

impl MarkupNormalizer {
    pub fn new(config: &SegmenterConfig) -> Result<Self, regex::Error> {
        let types = config.payload_types.iter().map(|t| regex::escape(t)).join("|");
        let payload = Regex::new(&format!(
            r"(?is)<DOCUMENT>\s*<TYPE>[ \t]*(?:{})[^\n]*.*?</DOCUMENT>",
            types
        ))?;
        Ok(Self {
            payload,
            classifier: TableClassifier::new(config.numeric_table_ratio),
        })
    }

    pub fn normalize(&self, text: &str) -> NormalizedDocument {
        let text = self.remove_payloads(text);
        let text = normalize_characters(&text);
        let text = strip_inline_markup(&text);
        let filtered = self.classifier.filter_tables(&text);

        NormalizedDocument {
            text: filtered.text,
            tables_kept: filtered.kept,
            tables_dropped: filtered.dropped,
        }
    }

    fn remove_payloads(&self, text: &str) -> String {
        let text = self.payload.replace_all(text, "");
        [&*IX_HEADER, &*XBRL_BLOCK, &*UUENCODED, &*SCRIPT, &*STYLE, &*COMMENT]
            .iter()
            .fold(text.into_owned(), |acc, re| re.replace_all(&acc, "").into_owned())
    }
}

/// Decodes entities and folds Unicode punctuation to plain ASCII.
///
/// Decoded `<`, `>` and `&` are escaped again so decoding never creates markup.
pub fn normalize_characters(text: &str) -> String {
    let decoded = ENTITY.replace_all(text, |caps: &regex::Captures| {
        let entity = &caps[0];
        let decoded = decode_html_entities(entity);
        if decoded == entity {
            entity.to_string()
        } else {
            encode_text(&decoded).into_owned()
        }
    });

    let remapped = remap_c1_controls(&decoded);
    let folded: String = fold_punctuation(&remapped).nfkc().collect();
    fold_punctuation(&folded)
}

/// Legacy filings write cp1252 code points as numeric entities (`&#146;`),
/// which decode to C1 controls. Reads them as Windows-1252 bytes instead;
/// the five bytes cp1252 leaves undefined are dropped.
fn remap_c1_controls(text: &str) -> String {
    text.chars()
        .filter_map(|c| {
            if !('\u{80}'..='\u{9f}').contains(&c) {
                return Some(c);
            }
            let byte = [c as u32 as u8];
            let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(&byte);
            decoded.chars().next().filter(|d| *d != c)
        })
        .collect()
}

fn fold_punctuation(text: &str) -> String {
    text.chars()
        .filter_map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201a}' | '\u{201b}' | '\u{2032}' => Some('\''),
            '\u{201c}' | '\u{201d}' | '\u{201e}' | '\u{201f}' | '\u{2033}' => Some('"'),
            '\u{2010}'..='\u{2015}' | '\u{2212}' => Some('-'),
            '\u{a0}' | '\u{2000}'..='\u{200a}' | '\u{202f}' | '\u{205f}' | '\u{3000}' => Some(' '),
            '\u{200b}'..='\u{200d}' | '\u{2060}' | '\u{feff}' | '\u{ad}' => None,
            c => Some(c),
        })
        .collect()
}

/// Removes presentational wrappers that can split a header phrase.
/// Anchors that carry a target and all block structure stay.
pub fn strip_inline_markup(text: &str) -> String {
    let text = INLINE_TAG.replace_all(text, "");
    let text = ANCHOR_OPEN.replace_all(&text, |caps: &regex::Captures| {
        if ANCHOR_TARGET.is_match(&caps[0]) {
            caps[0].to_string()
        } else {
            String::new()
        }
    });
    PAGE_BREAK.replace_all(&text, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> MarkupNormalizer {
        MarkupNormalizer::new(&SegmenterConfig::default()).unwrap()
    }

    #[test]
    fn test_payloads_removed() {
        let text = "<p>Item 1.</p>\n<DOCUMENT>\n<TYPE>GRAPHIC\n<TEXT>\nbegin 644 a.jpg\nM9\nend\n</TEXT>\n</DOCUMENT>\n\
            <DOCUMENT>\n<TYPE>EX-101.INS\n<TEXT>\n<xbrl/>\n</TEXT>\n</DOCUMENT>\n\
            <script>var x = '<p>Item 9.</p>';</script><!-- Item 8. -->\
            <ix:header><ix:hidden>Item 7</ix:hidden></ix:header><p>Item 2.</p>";
        let doc = normalizer().normalize(text);
        assert!(doc.text.contains("Item 1."));
        assert!(doc.text.contains("Item 2."));
        for gone in ["GRAPHIC", "EX-101", "Item 9", "Item 8", "Item 7", "begin 644"] {
            assert!(!doc.text.contains(gone), "{} survived", gone);
        }
    }

    #[test]
    fn test_uuencoded_block_outside_envelope() {
        let text = "<p>Intro</p>\nbegin 644 chart.gif\nM1TE&.#EA\n`\nend\n<p>Item 1.</p>";
        let doc = normalizer().normalize(text);
        assert!(!doc.text.contains("chart.gif"));
        assert!(doc.text.contains("Item 1."));
    }

    #[test]
    fn test_character_normalization() {
        assert_eq!(
            normalize_characters("Item&#160;1A&#8212;Risk \u{201c}Factors\u{201d} &amp; more"),
            "Item 1A-Risk \"Factors\" &amp; more"
        );
        assert_eq!(normalize_characters("a&lt;b&gt;c"), "a&lt;b&gt;c");
        assert_eq!(normalize_characters("&#60;p&#62;"), "&lt;p&gt;");
        assert_eq!(normalize_characters("&bogus; I\u{200b}tem"), "&bogus; Item");
        assert_eq!(normalize_characters("\u{ff11}"), "1");
    }

    #[test]
    fn test_legacy_cp1252_entities() {
        assert_eq!(
            normalize_characters("MANAGEMENT&#146;S and &#147;quoted&#148; &#151; dash &#150; en"),
            "MANAGEMENT'S and \"quoted\" - dash - en"
        );
        assert_eq!(normalize_characters("raw\u{92}s&#133;"), "raw's...");
        assert_eq!(normalize_characters("gap&#129;less"), "gapless");
    }

    #[test]
    fn test_inline_markup_stripped() {
        let html = "<p><font style=\"x\">IT</font><font>EM 2.</font></p><a>x</a><a name=\"i2\"></a><br><b>y</b><hr/>";
        assert_eq!(
            strip_inline_markup(html),
            "<p>ITEM 2.</p>x</a><a name=\"i2\"></a><br>y"
        );
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let text = "<p><b>Item&nbsp;1.</b> Business &amp; \u{2018}Overview\u{2019}</p>\
            <table><tr><td>2023</td><td>4,512</td></tr></table>\
            <p>Item 1A&#8212;Risk &lt;Factors&gt;</p><PAGE><p>&#x41;&unknown;</p>";
        let normalizer = normalizer();
        let once = normalizer.normalize(text);
        let twice = normalizer.normalize(&once.text);
        assert_eq!(once.text, twice.text);
        assert_eq!(once.tables_dropped, 1);
        assert_eq!(twice.tables_dropped, 0);
    }
}
