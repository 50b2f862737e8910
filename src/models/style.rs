//! Category display colors.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const FALLBACK_COLOR: &str = "#757575";

const BUILT_IN_COLORS: &[(&str, &str)] = &[
    ("National Park", "#2e7d32"),
    ("Countries to Visit", "#1565c0"),
    ("City", "#ef6c00"),
    ("Beach", "#0097a7"),
    ("Landmark", "#6a1b9a"),
    ("Uncategorized", FALLBACK_COLOR),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStyle {
    pub color: String,
}

/// Resolves the display color of a category. User styles win over built-in
/// defaults; both are matched case-insensitively.
pub fn color_for(styles: &BTreeMap<String, CategoryStyle>, category: &str) -> String {
    styles
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(category))
        .map(|(_, style)| style.color.clone())
        .or_else(|| {
            BUILT_IN_COLORS
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(category))
                .map(|(_, color)| (*color).to_string())
        })
        .unwrap_or_else(|| FALLBACK_COLOR.to_string())
}

/// Inserts a style, replacing any existing entry that differs only in case.
pub fn set_color(styles: &mut BTreeMap<String, CategoryStyle>, category: &str, color: String) {
    styles.retain(|name, _| !name.eq_ignore_ascii_case(category));
    styles.insert(category.to_string(), CategoryStyle { color });
}
