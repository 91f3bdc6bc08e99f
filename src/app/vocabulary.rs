use std::collections::HashMap;
use std::sync::LazyLock;

use super::text::slugify;

/// Canonical detail columns in the order they are written after the base
/// columns. Keys outside this list follow in lexicographic order.
pub(crate) const PREFERRED_ORDER: [&str; 30] = [
    "overview",
    "growth_and_harvest",
    "experience",
    "seed_type",
    "flowering_period_type",
    "indica_sativa",
    "type_ratio",
    "strain_type_summary",
    "environment",
    "strength",
    "medical_strains",
    "smell_taste",
    "effect",
    "climate",
    "flavor",
    "thc",
    "cbd",
    "yield_indoor",
    "yield_outdoor",
    "height_indoor",
    "height_outdoor",
    "indoor_height_detail",
    "indoor_flowering_time",
    "outdoor_harvest_time",
    "flowering_time",
    "harvest_month",
    "genetic_background",
    "stock_availability",
    "sale_item",
    "most_popular_seeds",
];

static SECTION_FIELDS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("section_overview", "overview"),
        ("section_description", "overview"),
        ("section_product_description", "overview"),
        ("section_about_this_strain", "overview"),
        ("section_growth_and_harvest", "growth_and_harvest"),
        ("section_growing_and_harvest", "growth_and_harvest"),
        ("section_growing_information", "growth_and_harvest"),
        ("section_cultivation", "growth_and_harvest"),
        ("section_experience", "experience"),
        ("section_the_experience", "experience"),
        ("section_effects_and_experience", "experience"),
    ])
});

static SUMMARY_FIELDS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("summary_seed_type", "seed_type"),
        ("summary_seeds_type", "seed_type"),
        ("summary_flowering_type", "flowering_period_type"),
        ("summary_flowering_period", "flowering_period_type"),
        ("summary_flowering_period_type", "flowering_period_type"),
        ("summary_indica_sativa", "indica_sativa"),
        ("summary_type_ratio", "type_ratio"),
        ("summary_ratio", "type_ratio"),
        ("summary_indica_sativa_ratio", "type_ratio"),
        ("summary_strain_type", "strain_type_summary"),
        ("summary_type", "strain_type_summary"),
        ("summary_thc", "thc"),
        ("summary_thc_level", "thc"),
        ("summary_cbd", "cbd"),
        ("summary_cbd_level", "cbd"),
        ("summary_genetics", "genetic_background"),
        ("summary_genetic_background", "genetic_background"),
        ("summary_flowering_time", "flowering_time"),
        ("summary_harvest_month", "harvest_month"),
        ("summary_indoor_height", "indoor_height_detail"),
    ])
});

static DETAIL_FIELDS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("detail_thc", "thc"),
        ("detail_thc_content", "thc"),
        ("detail_thc_level", "thc"),
        ("detail_cbd", "cbd"),
        ("detail_cbd_content", "cbd"),
        ("detail_cbd_level", "cbd"),
        ("detail_environment", "environment"),
        ("detail_grow_environment", "environment"),
        ("detail_strength", "strength"),
        ("detail_medical_strains", "medical_strains"),
        ("detail_medical", "medical_strains"),
        ("detail_smell_taste", "smell_taste"),
        ("detail_smell_and_taste", "smell_taste"),
        ("detail_effect", "effect"),
        ("detail_effects", "effect"),
        ("detail_climate", "climate"),
        ("detail_flavor", "flavor"),
        ("detail_flavour", "flavor"),
        ("detail_flavors", "flavor"),
        ("detail_flavours", "flavor"),
        ("detail_yield_indoor", "yield_indoor"),
        ("detail_indoor_yield", "yield_indoor"),
        ("detail_yield_outdoor", "yield_outdoor"),
        ("detail_outdoor_yield", "yield_outdoor"),
        ("detail_height_indoor", "height_indoor"),
        ("detail_indoor_height", "height_indoor"),
        ("detail_height_outdoor", "height_outdoor"),
        ("detail_outdoor_height", "height_outdoor"),
        ("detail_indoor_flowering_time", "indoor_flowering_time"),
        ("detail_flowering_time_indoor", "indoor_flowering_time"),
        ("detail_outdoor_harvest_time", "outdoor_harvest_time"),
        ("detail_harvest_time_outdoor", "outdoor_harvest_time"),
        ("detail_outdoor_harvest", "outdoor_harvest_time"),
        ("detail_flowering_time", "flowering_time"),
        ("detail_harvest_month", "harvest_month"),
        ("detail_genetic_background", "genetic_background"),
        ("detail_genetics", "genetic_background"),
        ("detail_seed_type", "seed_type"),
        ("detail_flowering_type", "flowering_period_type"),
        ("detail_indica_sativa", "indica_sativa"),
        ("detail_type_ratio", "type_ratio"),
        ("detail_indica_sativa_ratio", "type_ratio"),
        ("detail_stock_availability", "stock_availability"),
        ("detail_availability", "stock_availability"),
        ("detail_stock", "stock_availability"),
        ("detail_sale_item", "sale_item"),
        ("detail_on_sale", "sale_item"),
        ("detail_most_popular_seeds", "most_popular_seeds"),
        ("detail_most_popular", "most_popular_seeds"),
    ])
});

/// The three label families found on a product page.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum Vocabulary {
    Section,
    Summary,
    Detail,
}

impl Vocabulary {
    fn prefix(self) -> &'static str {
        match self {
            Vocabulary::Section => "section_",
            Vocabulary::Summary => "summary_",
            Vocabulary::Detail => "detail_",
        }
    }

    fn table(self) -> &'static HashMap<&'static str, &'static str> {
        match self {
            Vocabulary::Section => &*SECTION_FIELDS,
            Vocabulary::Summary => &*SUMMARY_FIELDS,
            Vocabulary::Detail => &*DETAIL_FIELDS,
        }
    }

    /// Maps a raw page label to its canonical column, or `None` when the label
    /// is not part of this vocabulary.
    pub(crate) fn canonicalize(self, label: &str) -> Option<&'static str> {
        let slug = slugify(label);
        if slug.is_empty() {
            return None;
        }
        let key = format!("{}{slug}", self.prefix());
        self.table().get(key.as_str()).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_labels() {
        assert_eq!(Vocabulary::Detail.canonicalize("THC"), Some("thc"));
        assert_eq!(Vocabulary::Detail.canonicalize("Smell & Taste"), Some("smell_taste"));
        assert_eq!(Vocabulary::Section.canonicalize("Growth and Harvest"), Some("growth_and_harvest"));
        assert_eq!(Vocabulary::Summary.canonicalize("Seed Type"), Some("seed_type"));
    }

    #[test]
    fn drops_unknown_and_cross_family_labels() {
        assert_eq!(Vocabulary::Detail.canonicalize("Random Unmapped Label"), None);
        assert_eq!(Vocabulary::Section.canonicalize("THC"), None);
        assert_eq!(Vocabulary::Detail.canonicalize("::"), None);
    }

    #[test]
    fn every_canonical_key_has_a_preferred_position() {
        for table in [&*SECTION_FIELDS, &*SUMMARY_FIELDS, &*DETAIL_FIELDS] {
            for key in table.values() {
                assert!(PREFERRED_ORDER.contains(key), "{key} missing from order");
            }
        }
    }
}
