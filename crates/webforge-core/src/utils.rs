// Small string helpers shared by the workflow and the stores

/// Longest slug produced by `slugify`, leaving room for a `-N` suffix
pub const MAX_SLUG_CHARS: usize = 60;

/// Filesystem-friendly slug: lowercase ASCII letters, digits and single dashes.
/// At most MAX_SLUG_CHARS long, cut at a word boundary when possible.
/// Falls back to "project" when nothing usable remains.
pub fn slugify(value: &str) -> String {
    let mut slug = String::with_capacity(value.len());
    let mut pending_dash = false;

    for c in value.trim().chars().flat_map(char::to_lowercase) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c == '-' || c.is_whitespace() {
            pending_dash = true;
        }
        // anything else is dropped without separating words
    }

    if slug.len() > MAX_SLUG_CHARS {
        // The slug is ASCII, so byte offsets are char offsets
        let cut_mid_word = slug.as_bytes()[MAX_SLUG_CHARS] != b'-';
        slug.truncate(MAX_SLUG_CHARS);
        if cut_mid_word {
            if let Some(dash) = slug.rfind('-') {
                slug.truncate(dash);
            }
        }
        let trimmed = slug.trim_end_matches('-').len();
        slug.truncate(trimmed);
    }

    if slug.is_empty() {
        "project".to_string()
    } else {
        slug
    }
}

/// Format a byte count as "12.3 MB"
pub fn human_readable_size(num_bytes: u64) -> String {
    const STEP: f64 = 1024.0;
    let mut size = num_bytes as f64;
    for unit in ["B", "KB", "MB", "GB", "TB"] {
        if size < STEP {
            return format!("{size:.1} {unit}");
        }
        size /= STEP;
    }
    format!("{size:.1} PB")
}

/// First `max` characters of `value`, respecting char boundaries
pub fn truncate_chars(value: &str, max: usize) -> &str {
    match value.char_indices().nth(max) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Build a Landing Page"), "build-a-landing-page");
        assert_eq!(slugify("  hello   world  "), "hello-world");
        assert_eq!(slugify("Café & Bar!"), "caf-bar");
        assert_eq!(slugify("a--b"), "a-b");
        assert_eq!(slugify("--lead"), "lead");
        assert_eq!(slugify("!!!"), "project");
        assert_eq!(slugify(""), "project");
    }

    #[test]
    fn test_slugify_caps_long_prompts_on_word_boundary() {
        let prompt = "build a responsive landing page for my coffee shop ".repeat(10);
        assert!(prompt.len() >= 500);

        let slug = slugify(&prompt);
        assert!(slug.len() <= MAX_SLUG_CHARS);
        assert_eq!(slug, "build-a-responsive-landing-page-for-my-coffee-shop-build-a");
        assert!(!slug.ends_with('-'));

        // A single unbroken word is cut hard
        assert_eq!(slugify(&"x".repeat(500)).len(), MAX_SLUG_CHARS);
    }

    #[test]
    fn test_human_readable_size() {
        assert_eq!(human_readable_size(0), "0.0 B");
        assert_eq!(human_readable_size(512), "512.0 B");
        assert_eq!(human_readable_size(1024), "1.0 KB");
        assert_eq!(human_readable_size(1536), "1.5 KB");
        assert_eq!(human_readable_size(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 3), "hel");
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }
}
