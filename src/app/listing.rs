use scraper::{ElementRef, Html, Selector};
use url::Url;

use super::text::{clean_pack_option, element_text, parse_discount, parse_price, resolve_url};
use super::types::Record;

const ITEM: &str = "div.yagendoo_vm_browse_element";
const THUMB: &str = ".yagendoo_vm_browse_thumb";
const TITLE_TEXT: &str = ".yagendoo_vm_browse_product_title";
const DESCRIPTION: &str = ".yagendoo_vm_browse_s_desc";
const CURRENT_PRICE: &str = ".yagendoo_productPrice";
const ORIGINAL_PRICE: &str = ".yagendoo_productOldPrice";
const DISCOUNT: &str = ".yagendoo_productOldPrice_box span.yagendoo_DiscountAmount";
const PACK_SELECT: &str = "select";
const PACK_OPTION: &str = "option";
const IMAGE: &str = ".yagendoo_vm_browse_thumb img";

/// Extracts one raw record per catalogue tile. Records are neither
/// deduplicated nor validated here.
pub(crate) fn extract_items(html: &str, site_root: &Url) -> Vec<Record> {
    let Ok(selector) = Selector::parse(ITEM) else {
        return Vec::new();
    };
    let doc = Html::parse_document(html);
    doc.select(&selector)
        .map(|item| parse_item(item, site_root))
        .collect()
}

fn parse_item(item: ElementRef<'_>, site_root: &Url) -> Record {
    let thumb = select_first(item, THUMB);
    let title = thumb
        .and_then(|el| el.value().attr("title"))
        .map(str::trim)
        .filter(|title| !title.is_empty())
        .map(ToString::to_string)
        .unwrap_or_else(|| first_text(item, TITLE_TEXT));
    let (strain_name, breeder) = split_title(&title);

    let image = select_first(item, IMAGE).and_then(|img| {
        let value = img.value();
        value
            .attr("data-src")
            .filter(|src| !src.trim().is_empty())
            .or_else(|| value.attr("src"))
    });

    Record {
        strain_name,
        breeder,
        description: first_text(item, DESCRIPTION),
        current_price: parse_price(Some(first_text(item, CURRENT_PRICE).as_str())),
        original_price: parse_price(Some(first_text(item, ORIGINAL_PRICE).as_str())),
        discount_percent: parse_discount(Some(first_text(item, DISCOUNT).as_str())),
        pack_options: pack_options(item),
        product_url: resolve_url(site_root, thumb.and_then(|el| el.value().attr("href"))),
        image_url: resolve_url(site_root, image),
        ..Record::default()
    }
}

/// Splits `"Name - Breeder"` on the last separator.
fn split_title(title: &str) -> (String, String) {
    match title.rsplit_once(" - ") {
        Some((name, breeder)) => (name.trim().to_string(), breeder.trim().to_string()),
        None => (title.trim().to_string(), String::new()),
    }
}

/// Options of the tile's first pack selector, joined with `" | "`.
fn pack_options(item: ElementRef<'_>) -> String {
    let (Some(select), Ok(selector)) = (select_first(item, PACK_SELECT), Selector::parse(PACK_OPTION))
    else {
        return String::new();
    };
    select
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .filter_map(|text| clean_pack_option(&text))
        .collect::<Vec<_>>()
        .join(" | ")
}

fn select_first<'a>(el: ElementRef<'a>, selector: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(selector).ok()?;
    el.select(&selector).next()
}

fn first_text(el: ElementRef<'_>, selector: &str) -> String {
    select_first(el, selector)
        .map(element_text)
        .unwrap_or_default()
}
