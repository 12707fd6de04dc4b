/// Longest text payload sent as is.
pub const MAX_TEXT_CHARS: usize = 4000;

/// Longest photo caption the Bot API accepts, ellipsis included.
pub const MAX_CAPTION_CHARS: usize = 1024;

const ELLIPSIS: &str = "...";

/// Cut `text` to [`MAX_TEXT_CHARS`] characters, appending `...` when cut.
///
/// Counts characters, not bytes, so multi-byte text is never split inside a
/// code point.
pub fn truncate_text(text: &str) -> String {
    cut_at(text, MAX_TEXT_CHARS)
}

/// Cut a photo caption so that it fits [`MAX_CAPTION_CHARS`] with the `...`.
pub fn truncate_caption(caption: &str) -> String {
    if caption.chars().count() <= MAX_CAPTION_CHARS {
        return caption.to_string();
    }
    cut_at(caption, MAX_CAPTION_CHARS - ELLIPSIS.len())
}

fn cut_at(text: &str, keep: usize) -> String {
    match text.char_indices().nth(keep) {
        Some((cut, _)) => format!("{}{ELLIPSIS}", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_unchanged() {
        assert_eq!(truncate_text("hello"), "hello");
        assert_eq!(truncate_text(""), "");
    }

    #[test]
    fn test_exact_limit_unchanged() {
        let text = "a".repeat(MAX_TEXT_CHARS);
        assert_eq!(truncate_text(&text), text);
    }

    #[test]
    fn test_long_text_cut_with_ellipsis() {
        let text = "b".repeat(MAX_TEXT_CHARS + 1);
        let cut = truncate_text(&text);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS + 3);
        assert!(cut.ends_with("b..."));
    }

    #[test]
    fn test_multibyte_text_cut_on_char_boundary() {
        let text = "ж".repeat(MAX_TEXT_CHARS + 10);
        let cut = truncate_text(&text);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS + 3);
        assert!(cut.starts_with('ж'));
    }

    #[test]
    fn test_caption_fits_photo_limit() {
        let caption = "к".repeat(MAX_CAPTION_CHARS + 200);
        let cut = truncate_caption(&caption);
        assert_eq!(cut.chars().count(), MAX_CAPTION_CHARS);
        assert!(cut.ends_with("к..."));
    }

    #[test]
    fn test_caption_at_limit_unchanged() {
        let caption = "d".repeat(MAX_CAPTION_CHARS);
        assert_eq!(truncate_caption(&caption), caption);
        assert_eq!(truncate_caption("Movie 1, rating: 7.0"), "Movie 1, rating: 7.0");
    }

    #[test]
    fn test_truncation_is_idempotent() {
        let once = truncate_text(&"c".repeat(5000));
        assert_eq!(truncate_text(&once), once);
    }
}
