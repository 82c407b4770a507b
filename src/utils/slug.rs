/// Turns a human-readable title into a URL-safe slug: lower-cased ASCII
/// alphanumerics with single dashes in between. Uniqueness suffixing is
/// handled by the caller, which can see the store.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut last_dash = true;

    for c in input.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    slug
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_dashes() {
        assert_eq!(slugify("Rusty Sword of Doom"), "rusty-sword-of-doom");
    }

    #[test]
    fn collapses_separator_runs() {
        assert_eq!(slugify("  A -- B!! C  "), "a-b-c");
    }

    #[test]
    fn non_ascii_titles_can_produce_empty_slugs() {
        assert_eq!(slugify("Меч"), "");
    }
}
