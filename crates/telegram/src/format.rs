//! Caption composition for delivered posts and notices.

use birdwatch_relay::Post;

/// Telegram message size limit.
pub const TELEGRAM_MAX_MESSAGE_LEN: usize = 4096;

/// Telegram caption size limit for media messages.
pub const TELEGRAM_CAPTION_LIMIT: usize = 1024;

/// Escape HTML special characters.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Deep link back to the original post.
#[must_use]
pub fn post_url(id: &str) -> String {
    format!("https://twitter.com/i/web/status/{id}")
}

/// Compose the HTML caption for a post: bold header naming the author,
/// the escaped body, and a deep link back to the original. The body is
/// trimmed so the whole caption fits within `limit` bytes.
#[must_use]
pub fn build_caption(post: &Post, limit: usize) -> String {
    let header = format!("<b>New post from @{}</b>", escape_html(&post.author));
    let link = format!("<a href=\"{}\">Open in Twitter</a>", post_url(&post.id));

    // The two joining blank lines cost four bytes.
    let budget = limit.saturating_sub(header.len() + link.len() + 4);
    let escaped = escape_html(post.text.trim());
    let body = truncate_escaped(&escaped, budget);

    if body.is_empty() {
        format!("{header}\n\n{link}")
    } else {
        format!("{header}\n\n{body}\n\n{link}")
    }
}

/// Truncate at a char boundary at or below `max_len` bytes.
#[must_use]
pub fn truncate_at_char_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Like [`truncate_at_char_boundary`], but never cuts through an HTML
/// entity such as `&amp;`.
fn truncate_escaped(escaped: &str, max_len: usize) -> &str {
    let mut cut = truncate_at_char_boundary(escaped, max_len);
    if cut.len() < escaped.len()
        && let Some(amp) = cut.rfind('&')
        && !cut[amp..].contains(';')
    {
        cut = &cut[..amp];
    }
    cut
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use rstest::rstest;

    use {
        super::*,
        birdwatch_relay::{Media, MediaKind},
    };

    fn post(id: &str, author: &str, text: &str) -> Post {
        Post {
            id: id.into(),
            author: author.into(),
            text: text.into(),
            media: Vec::new(),
        }
    }

    #[rstest]
    #[case("a & b", "a &amp; b")]
    #[case("<b>bold</b>", "&lt;b&gt;bold&lt;/b&gt;")]
    #[case("plain", "plain")]
    fn escapes_html_special_chars(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(escape_html(input), expected);
    }

    #[test]
    fn caption_has_header_body_and_link() {
        let caption = build_caption(&post("100", "alice", "hello world"), TELEGRAM_CAPTION_LIMIT);
        assert_eq!(
            caption,
            "<b>New post from @alice</b>\n\nhello world\n\n\
             <a href=\"https://twitter.com/i/web/status/100\">Open in Twitter</a>"
        );
    }

    #[test]
    fn caption_escapes_body() {
        let caption = build_caption(&post("100", "alice", "1 < 2 & 3"), TELEGRAM_CAPTION_LIMIT);
        assert!(caption.contains("1 &lt; 2 &amp; 3"), "caption: {caption}");
    }

    #[test]
    fn caption_omits_body_when_empty() {
        let caption = build_caption(&post("100", "alice", "   "), TELEGRAM_CAPTION_LIMIT);
        assert_eq!(
            caption,
            "<b>New post from @alice</b>\n\n\
             <a href=\"https://twitter.com/i/web/status/100\">Open in Twitter</a>"
        );
    }

    #[test]
    fn long_body_is_trimmed_to_fit_the_limit() {
        let body = "x".repeat(5000);
        let caption = build_caption(&post("100", "alice", &body), TELEGRAM_CAPTION_LIMIT);
        assert!(caption.len() <= TELEGRAM_CAPTION_LIMIT, "{}", caption.len());
        // Header and link both survive the trim.
        assert!(caption.starts_with("<b>New post from @alice</b>"));
        assert!(caption.ends_with("</a>"));
    }

    #[test]
    fn trim_never_splits_an_entity() {
        // All-ampersand body: every escaped char is a five-byte entity.
        let body = "&".repeat(400);
        let caption = build_caption(&post("100", "alice", &body), TELEGRAM_CAPTION_LIMIT);
        assert!(caption.len() <= TELEGRAM_CAPTION_LIMIT);
        assert!(!caption.contains("&am\n"), "caption: {caption}");
        // Only whole entities remain in the body section.
        let body_section = caption
            .split("\n\n")
            .nth(1)
            .unwrap();
        assert!(body_section.chars().filter(|&c| c == '&').count() > 0);
        assert_eq!(
            body_section.matches("&amp;").count(),
            body_section.chars().filter(|&c| c == '&').count()
        );
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let text = "héllo";
        // Byte 2 falls inside the two-byte 'é'.
        assert_eq!(truncate_at_char_boundary(text, 2), "h");
        assert_eq!(truncate_at_char_boundary(text, 3), "hé");
        assert_eq!(truncate_at_char_boundary(text, 99), "héllo");
    }

    #[test]
    fn media_does_not_affect_caption() {
        let mut p = post("100", "alice", "hi");
        p.media.push(Media {
            url: "https://img/a.jpg".into(),
            kind: MediaKind::Photo,
        });
        let with_media = build_caption(&p, TELEGRAM_CAPTION_LIMIT);
        let without = build_caption(&post("100", "alice", "hi"), TELEGRAM_CAPTION_LIMIT);
        assert_eq!(with_media, without);
    }
}
