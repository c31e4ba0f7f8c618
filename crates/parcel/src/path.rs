//! Document path naming.
//!
//! Every document path carries the reserved extension. Paths passed without
//! it get it appended, so `"a"` and `"a.parcel"` name the same document.

/// The reserved document extension, without the leading dot.
pub const FILE_EXTENSION: &str = "parcel";

const DOTTED_EXTENSION: &str = ".parcel";

/// Append the reserved extension to `path` unless it is already present.
pub fn normalize_path(path: &str) -> String {
    if has_extension(path) {
        path.to_string()
    } else {
        format!("{path}{DOTTED_EXTENSION}")
    }
}

/// Returns `true` if `path` already ends in the reserved extension.
pub fn has_extension(path: &str) -> bool {
    path.ends_with(DOTTED_EXTENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_missing_extension() {
        assert_eq!(normalize_path("main"), "main.parcel");
        assert_eq!(normalize_path("levels/one"), "levels/one.parcel");
    }

    #[test]
    fn keeps_existing_extension() {
        assert_eq!(normalize_path("main.parcel"), "main.parcel");
        assert_eq!(normalize_path(normalize_path("x").as_str()), "x.parcel");
    }

    #[test]
    fn other_extensions_are_not_special() {
        assert_eq!(normalize_path("data.json"), "data.json.parcel");
        assert_eq!(normalize_path("archive.parcels"), "archive.parcels.parcel");
    }

    #[test]
    fn empty_path_becomes_bare_extension() {
        assert_eq!(normalize_path(""), ".parcel");
    }
}
