//! String helpers for course titles and CLI output

/// Truncate a string to `max_chars` characters, appending "..." if cut.
///
/// Counts characters rather than bytes, so multi-byte titles never panic.
///
/// # Examples
/// ```
/// use lyceum_core::utils::string::truncate_at_char_boundary;
///
/// assert_eq!(truncate_at_char_boundary("Intro to Rust", 5), "Intro...");
/// assert_eq!(truncate_at_char_boundary("Rust", 10), "Rust");
/// ```
pub fn truncate_at_char_boundary(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();

    if char_count <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

/// URL slug for a course title.
///
/// Lowercases ASCII alphanumerics and joins every other run of characters
/// into a single `-`. Non-ASCII letters are dropped.
///
/// ```
/// use lyceum_core::utils::string::slugify;
///
/// assert_eq!(slugify("Intro to Rust: Ownership!"), "intro-to-rust-ownership");
/// ```
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }

    slug
}

/// Canonical form used for storage and lookup of email addresses
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
