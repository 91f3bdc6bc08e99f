use std::collections::BTreeMap;

use scraper::{ElementRef, Html, Selector};

use super::text::{element_text, sanitize};
use super::vocabulary::Vocabulary;

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";
const SUMMARY_HEADING: &str = "strain summary";
const CURRENCY_SYMBOLS: [char; 4] = ['£', '$', '€', '¥'];

/// First-write-wins accumulator shared by the three extraction passes.
#[derive(Debug, Default)]
struct Fields(BTreeMap<String, String>);

impl Fields {
    fn offer(&mut self, key: &'static str, raw: &str) {
        let value = sanitize(raw);
        if value.is_empty() {
            return;
        }
        self.0.entry(key.to_string()).or_insert(value);
    }
}

/// Collects canonical detail fields from a product page.
///
/// Narrative sections are read first, then the strain summary list, then
/// two-column tables. A key set by an earlier pass (or an earlier element of
/// the same pass) is never overwritten.
pub(crate) fn extract_fields(html: &str) -> BTreeMap<String, String> {
    let doc = Html::parse_document(html);
    let mut fields = Fields::default();
    collect_sections(&doc, &mut fields);
    collect_summary(&doc, &mut fields);
    collect_tables(&doc, &mut fields);
    fields.0
}

fn heading_level(el: ElementRef<'_>) -> Option<u8> {
    match el.value().name() {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Element siblings after `heading`, up to the next heading of the same or a
/// higher rank.
fn section_siblings(heading: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    let level = heading_level(heading).unwrap_or(6);
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .take_while(|sibling| heading_level(*sibling).is_none_or(|next| next > level))
        .collect()
}

fn collect_sections(doc: &Html, fields: &mut Fields) {
    let Ok(headings) = Selector::parse(HEADINGS) else {
        return;
    };

    for heading in doc.select(&headings) {
        let Some(key) = Vocabulary::Section.canonicalize(&element_text(heading)) else {
            continue;
        };

        let mut blocks = Vec::new();
        for sibling in section_siblings(heading) {
            match sibling.value().name() {
                "p" | "div" => blocks.push(element_text(sibling)),
                "ul" | "ol" => blocks.extend(
                    sibling
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|child| child.value().name() == "li")
                        .map(element_text),
                ),
                _ => {}
            }
        }
        blocks.retain(|block| !block.is_empty());
        fields.offer(key, &blocks.join("\n"));
    }
}

/// First `ul`/`ol` that follows `heading` in document order, outside the
/// heading itself.
fn next_list<'a>(doc: &'a Html, heading: ElementRef<'a>) -> Option<ElementRef<'a>> {
    doc.root_element()
        .descendants()
        .skip_while(|node| node.id() != heading.id())
        .skip(1)
        .filter(|node| !node.ancestors().any(|ancestor| ancestor.id() == heading.id()))
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "ul" | "ol"))
}

fn collect_summary(doc: &Html, fields: &mut Fields) {
    let Ok(headings) = Selector::parse(HEADINGS) else {
        return;
    };

    for heading in doc.select(&headings) {
        if !element_text(heading)
            .to_lowercase()
            .starts_with(SUMMARY_HEADING)
        {
            continue;
        }

        let Some(list) = next_list(doc, heading) else {
            continue;
        };

        for item in list
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "li")
        {
            let text = element_text(item);
            let Some((label, value)) = text.split_once(':') else {
                continue;
            };
            if let Some(key) = Vocabulary::Summary.canonicalize(label) {
                fields.offer(key, value);
            }
        }
    }
}

fn collect_tables(doc: &Html, fields: &mut Fields) {
    let Ok(rows) = Selector::parse("table tr") else {
        return;
    };

    for row in doc.select(&rows) {
        let cells = row
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|cell| matches!(cell.value().name(), "td" | "th"))
            .collect::<Vec<_>>();
        let [label_cell, value_cell] = cells.as_slice() else {
            continue;
        };

        let label = element_text(*label_cell);
        let label = label.trim_end_matches(':').trim();
        // price tables use the amount as the first cell
        if label.chars().count() < 2 || label.starts_with(CURRENCY_SYMBOLS) {
            continue;
        }
        if let Some(key) = Vocabulary::Detail.canonicalize(label) {
            fields.offer(key, &element_text(*value_cell));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
<div class="product">
  <h1>Amnesia Haze - Royal Queen Seeds</h1>
  <h2>Overview</h2>
  <p>A legendary  sativa.</p>
  <div>Bred in Amsterdam.</div>
  <ul><li>Citrus</li><li>Earthy</li></ul>
  <h3>Awards</h3>
  <p>Cup winner.</p>
  <h2>Growth and Harvest</h2>
  <p>Needs a long season.</p>
  <h2>Shipping</h2>
  <p>Discreet.</p>
  <h2>Overview</h2>
  <p>Second overview is ignored.</p>
  <h3>Strain Summary</h3>
  <ul>
    <li>Seed Type: Feminised</li>
    <li>Flowering Type: Photoperiod</li>
    <li>Mood: Happy</li>
    <li>No colon here</li>
    <li>Seed Type: Regular</li>
  </ul>
  <table>
    <tr><td>THC:</td><td>22%</td></tr>
    <tr><td>Random Unmapped Label</td><td>whatever</td></tr>
    <tr><td>£24.00</td><td>3 seeds</td></tr>
    <tr><td>Yield Indoor</td><td>   </td></tr>
    <tr><td>Flavour</td><td>Lemon</td></tr>
  </table>
  <table>
    <tr><th>THC</th><td>30%</td></tr>
    <tr><td>Seed Type</td><td>Autoflower</td></tr>
    <tr><td>Yield Indoor</td><td>550 g/m2</td></tr>
    <tr><td>A</td><td>single letter</td></tr>
  </table>
</div>
</body></html>
"#;

    #[test]
    fn collects_sections_until_next_peer_heading() {
        let fields = extract_fields(PAGE);
        assert_eq!(
            fields["overview"],
            "A legendary sativa. Bred in Amsterdam. Citrus Earthy Cup winner."
        );
        assert_eq!(fields["growth_and_harvest"], "Needs a long season.");
        assert!(!fields.contains_key("shipping"));
    }

    #[test]
    fn summary_list_keeps_first_occurrence() {
        let fields = extract_fields(PAGE);
        assert_eq!(fields["seed_type"], "Feminised");
        assert_eq!(fields["flowering_period_type"], "Photoperiod");
        assert!(!fields.values().any(|value| value == "Happy"));
    }

    #[test]
    fn summary_heading_inside_a_wrapper_still_finds_its_list() {
        let html = r#"<div class="tab">
            <div class="tab-title"><h3>Strain Summary</h3></div>
            <ul>
              <li>Seed Type: Feminised</li>
              <li>THC: 20%</li>
            </ul>
            <ul><li>Seed Type: Regular</li></ul>
        </div>"#;
        let fields = extract_fields(html);
        assert_eq!(fields.get("seed_type").map(String::as_str), Some("Feminised"));
        assert_eq!(fields.get("thc").map(String::as_str), Some("20%"));
    }

    #[test]
    fn summary_heading_without_a_following_list_is_ignored() {
        let html = "<ul><li>Seed Type: Regular</li></ul><h3>Strain Summary</h3><p>Seed Type: Auto</p>";
        assert!(extract_fields(html).is_empty());
    }

    #[test]
    fn tables_are_vocabulary_gated_and_first_write_wins() {
        let fields = extract_fields(PAGE);
        assert_eq!(fields["thc"], "22%");
        assert_eq!(fields["flavor"], "Lemon");
        assert_eq!(fields["yield_indoor"], "550 g/m2");
        assert!(!fields.values().any(|value| value == "whatever"));
        assert!(!fields.values().any(|value| value == "3 seeds"));
        assert!(!fields.values().any(|value| value == "single letter"));
    }

    #[test]
    fn only_canonical_keys_are_emitted() {
        let fields = extract_fields(PAGE);
        let keys = fields.keys().map(String::as_str).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                "flavor",
                "flowering_period_type",
                "growth_and_harvest",
                "overview",
                "seed_type",
                "thc",
                "yield_indoor",
            ]
        );
    }

    #[test]
    fn empty_markup_yields_no_fields() {
        assert!(extract_fields("").is_empty());
        assert!(extract_fields("<h2>Overview</h2>").is_empty());
    }
}
