use unicode_normalization::UnicodeNormalization;

/// Build the URL slug the product pages are addressed by.
///
/// `"Cachaça Ouro 700ml"` becomes `"cachaca-ouro-700ml"`. Letters are
/// decomposed (NFD) and their combining marks dropped; anything left outside
/// `[a-z0-9]` collapses into a single `-`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;

    for ch in text.to_lowercase().nfd().filter(|c| !is_combining_mark(*c)) {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        } else {
            pending_dash = true;
        }
    }

    slug
}

// Combining Diacritical Marks block
fn is_combining_mark(ch: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&ch)
}
