//! URL slugs derived from display names.

/// Lowercase `input`, collapse every run of non-alphanumeric characters into a
/// single hyphen and drop leading/trailing hyphens.
///
/// "Web Development" and "web-development" both become "web-development".
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_hyphen = false;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Candidate slug for the `attempt`-th collision: `base`, `base-2`, `base-3`, ...
pub fn with_suffix(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_spaces() {
        assert_eq!(slugify("Web Development"), "web-development");
    }

    #[test]
    fn test_slugify_is_idempotent() {
        let once = slugify("Quick & Easy -- Weeknight Dinners!");
        assert_eq!(once, "quick-easy-weeknight-dinners");
        assert_eq!(slugify(&once), once);
    }

    #[test]
    fn test_slugify_trims_hyphens() {
        assert_eq!(slugify("  --Soup--  "), "soup");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_slugify_non_ascii_is_separator() {
        assert_eq!(slugify("Crème Brûlée"), "cr-me-br-l-e");
    }

    #[test]
    fn test_with_suffix() {
        assert_eq!(with_suffix("pie", 1), "pie");
        assert_eq!(with_suffix("pie", 3), "pie-3");
    }
}
