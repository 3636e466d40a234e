use super::text::clean_section_text;
use super::types::{ResolvedPositionMap, Section};

/// Cuts the normalized text along the resolved map. Each section owns
/// everything from just after its separator up to the next marker.
pub fn assemble_sections(text: &str, map: &ResolvedPositionMap) -> Vec<Section> {
    map.markers()
        .iter()
        .map(|marker| {
            let span = marker.span();
            Section {
                code: marker.code.clone(),
                text: clean_section_text(&text[span.clone()], &marker.code),
                span,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edgar::parsing::types::{DiscoveryStrategy, ResolvedMarker};

    fn marker(code: &str, start: usize, end: usize) -> ResolvedMarker {
        ResolvedMarker {
            code: code.to_string(),
            start,
            end,
            stripped_len: 0,
            strategy: DiscoveryStrategy::Pattern,
        }
    }

    #[test]
    fn test_spans_tile_the_document() {
        let text = "<p>cover</p><p>Item 1. Business</p><p>Widgets.</p><p>Item 2. Properties</p><p>Offices.</p>";
        let item1 = text.find(">Item 1").unwrap();
        let item2 = text.find(">Item 2").unwrap();
        let map = ResolvedPositionMap::new(vec![
            marker("item1", item1, item2),
            marker("item2", item2, text.len()),
        ]);

        let sections = assemble_sections(text, &map);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].text, "Business\nWidgets.");
        assert_eq!(sections[1].text, "Properties\nOffices.");
        assert_eq!(sections[0].span.end + 1, sections[1].span.start);
        assert_eq!(sections[1].span.end, text.len());
    }
}
