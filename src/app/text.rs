use std::sync::LazyLock;

use regex::Regex;
use scraper::ElementRef;
use url::Url;

static NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+(?:\.[0-9]+)?").expect("number pattern compiles"));
static NON_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern compiles"));

pub(crate) const PACK_CURRENCY: &str = "GBP";

/// Drops control characters and trims the result.
///
/// Line breaks and tabs become spaces so that joined blocks keep their word
/// boundaries. The output never contains a control character, which makes the
/// function idempotent.
pub(crate) fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter_map(|ch| match ch {
            '\n' | '\r' | '\t' => Some(' '),
            ch if ch.is_control() => None,
            ch => Some(ch),
        })
        .collect::<String>()
        .trim()
        .to_string()
}

pub(crate) fn normalize_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    normalize_text(&el.text().collect::<Vec<_>>().join(" "))
}

/// Lowercases and collapses every non-alphanumeric run into one underscore.
pub(crate) fn slugify(label: &str) -> String {
    let lower = label.to_lowercase();
    NON_SLUG
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

pub(crate) fn parse_price(value: Option<&str>) -> Option<f64> {
    let cleaned = value?.replace(',', "");
    NUMBER.find(&cleaned)?.as_str().parse().ok()
}

pub(crate) fn parse_discount(value: Option<&str>) -> Option<f64> {
    NUMBER.find(value?)?.as_str().parse().ok()
}

/// Turns `"5 Seeds (£45.00)"` into `"5 Seeds (GBP 45.00)"`.
///
/// The price is the last number inside the parenthesised part, so counts in the
/// label itself are never mistaken for it. Returns `None` when the label is
/// empty.
pub(crate) fn clean_pack_option(option_text: &str) -> Option<String> {
    let (label, price_text) = match option_text.split_once('(') {
        Some((label, rest)) => (label, Some(rest)),
        None => (option_text, None),
    };
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    let price = price_text.and_then(|rest| {
        let rest = rest.replace(',', "");
        NUMBER
            .find_iter(&rest)
            .last()
            .map(|m| m.as_str().to_string())
    });
    Some(match price {
        Some(price) => format!("{label} ({PACK_CURRENCY} {price})"),
        None => label.to_string(),
    })
}

/// Resolves `raw` against the site root. Missing or blank input yields an
/// empty string.
pub(crate) fn resolve_url(site_root: &Url, raw: Option<&str>) -> String {
    let Some(raw) = raw.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return String::new();
    };
    site_root
        .join(raw)
        .map(|url| url.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn parses_prices_with_thousands_separators() {
        assert_eq!(parse_price(Some("£1,234.50")), Some(1234.50));
        assert_eq!(parse_price(Some("From £7.95")), Some(7.95));
        assert_eq!(parse_price(None), None);
        assert_eq!(parse_price(Some("Free")), None);
        assert_eq!(parse_price(Some("")), None);
    }

    #[test]
    fn parses_discount_badges() {
        assert_eq!(parse_discount(Some("-20%")), Some(20.0));
        assert_eq!(parse_discount(Some("Save 12.5 %")), Some(12.5));
        assert_eq!(parse_discount(None), None);
    }

    #[test]
    fn cleans_pack_options() {
        assert_eq!(
            clean_pack_option("5 Seeds (£45.00)").as_deref(),
            Some("5 Seeds (GBP 45.00)")
        );
        assert_eq!(clean_pack_option("10 Seeds").as_deref(), Some("10 Seeds"));
        assert_eq!(
            clean_pack_option("3 Seeds 0.5g (+ £1,020.00)").as_deref(),
            Some("3 Seeds 0.5g (GBP 1020.00)")
        );
        assert_eq!(clean_pack_option(" (£5.00)"), None);
    }

    #[test]
    fn slugifies_labels() {
        assert_eq!(slugify("Smell & Taste:"), "smell_taste");
        assert_eq!(slugify("  THC  "), "thc");
        assert_eq!(slugify("Indica / Sativa"), "indica_sativa");
        assert_eq!(slugify("---"), "");
    }

    #[test]
    fn resolves_relative_and_absolute_urls() {
        let root = Url::parse("https://www.seed-city.com").unwrap();
        assert_eq!(
            resolve_url(&root, Some("/en/amnesia-haze")),
            "https://www.seed-city.com/en/amnesia-haze"
        );
        assert_eq!(
            resolve_url(&root, Some("https://cdn.example.com/a.jpg")),
            "https://cdn.example.com/a.jpg"
        );
        assert_eq!(resolve_url(&root, None), "");
        assert_eq!(resolve_url(&root, Some("  ")), "");
    }

    #[test]
    fn sanitize_replaces_breaks_and_drops_controls() {
        assert_eq!(sanitize("  a\u{0}b\nc\u{1b} "), "ab c");
        assert_eq!(sanitize("\r\n"), "");
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent(input in any::<String>()) {
            let once = sanitize(&input);
            prop_assert_eq!(sanitize(&once), once.clone());
            prop_assert!(!once.chars().any(char::is_control));
        }
    }
}
