/// Default number of characters on a page.
pub const DEFAULT_PAGE_SIZE: usize = 500;

/// Split `text` into consecutive pages of `page_size` characters; the last
/// page holds the remainder. Empty text has no pages.
pub fn paginate(text: &str, page_size: usize) -> Vec<String> {
    let page_size = page_size.max(1);
    let mut pages = Vec::with_capacity(page_count(text, page_size));
    let mut current = String::new();
    let mut len = 0;

    for c in text.chars() {
        current.push(c);
        len += 1;
        if len == page_size {
            pages.push(std::mem::take(&mut current));
            len = 0;
        }
    }

    if !current.is_empty() {
        pages.push(current);
    }

    pages
}

/// Number of pages `paginate` would produce, without building them.
pub fn page_count(text: &str, page_size: usize) -> usize {
    text.chars().count().div_ceil(page_size.max(1))
}
