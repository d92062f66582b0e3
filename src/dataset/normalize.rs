//! Class-name canonicalisation used as the deduplication key across datasets.

/// Canonical form of a class name: lowercase, with every `-` and `_`
/// replaced by a single space.
///
/// ```
/// use berryscan::dataset::normalize_name;
///
/// assert_eq!(normalize_name("Leaf_Spot"), "leaf spot");
/// assert_eq!(normalize_name("leaf-spot"), normalize_name("LEAF SPOT"));
/// ```
pub fn normalize_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| if c == '-' || c == '_' { ' ' } else { c })
        .collect()
}

/// Returns true when two class names share a canonical form.
pub fn same_class(a: &str, b: &str) -> bool {
    normalize_name(a) == normalize_name(b)
}
