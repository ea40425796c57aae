//! Common utility functions

/// Collapse every run of whitespace into a single space and trim the ends.
///
/// Star aliases are always compared in this form, so `"HD   1234"` and
/// `"HD 1234"` name the same object.
///
/// # Examples
///
/// ```
/// use stardb_core::compress_space;
///
/// assert_eq!(compress_space("HD   1234"), "HD 1234");
/// assert_eq!(compress_space("  alf  UMi "), "alf UMi");
/// ```
pub fn compress_space(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_space() {
        assert_eq!(compress_space("HD 1234"), "HD 1234");
        assert_eq!(compress_space("HD    1234"), "HD 1234");
        assert_eq!(compress_space("NAME\tSun"), "NAME Sun");
        assert_eq!(compress_space("   "), "");
    }
}
