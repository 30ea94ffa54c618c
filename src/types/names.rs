//! Name canonicalization and channel link helpers.
//!
//! Humans type round and puzzle names inconsistently ("Foo Bar", "foo-bar",
//! "FOO_BAR"), so matching always happens on a canonical form: lowercase ASCII
//! alphanumerics and underscores, with spaces and hyphens mapped to
//! underscores and everything else dropped.

use std::sync::LazyLock;

use regex::Regex;

/// Canonicalizes a round or puzzle name for fuzzy matching.
///
/// Idempotent and many-to-one.
///
/// ```
/// use placebo::types::canonicalize;
///
/// assert_eq!(canonicalize("Foo Bar"), "foo_bar");
/// assert_eq!(canonicalize("foo-bar"), "foo_bar");
/// assert_eq!(canonicalize("FOO_BAR"), "foo_bar");
/// assert_eq!(canonicalize("What's Up?"), "whats_up");
/// ```
pub fn canonicalize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            c => c.to_ascii_lowercase(),
        })
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_')
        .collect()
}

/// Maximum length Slack accepts for a channel name.
const MAX_CHANNEL_NAME_LEN: usize = 80;

/// Derives a channel name from a puzzle URL: its last path segment,
/// optionally prefixed with `<prefix>_`.
///
/// The result is lowercased and restricted to the characters Slack allows.
///
/// ```
/// use placebo::types::channel_name_for_url;
///
/// assert_eq!(channel_name_for_url("https://x.com/puzzle/lorem_ipsum/", None), "lorem_ipsum");
/// assert_eq!(channel_name_for_url("https://x.com/round/Foo", Some("meta")), "meta_foo");
/// ```
pub fn channel_name_for_url(url: &str, prefix: Option<&str>) -> String {
    let slug = url.trim_end_matches('/').rsplit('/').next().unwrap_or(url);
    let name = match prefix {
        Some(prefix) => format!("{prefix}_{slug}"),
        None => slug.to_string(),
    };
    name.chars()
        .map(|c| c.to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '_' || *c == '-')
        .take(MAX_CHANNEL_NAME_LEN)
        .collect()
}

/// Builds the tracker cell formula linking to a channel.
///
/// The channel name must not carry a leading `#`.
pub fn channel_to_link(workspace: &str, channel: &str) -> String {
    format!(
        "=HYPERLINK(\"https://{workspace}.slack.com/app_redirect?channel={channel}\",\"#{channel}\")"
    )
}

static CHANNEL_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r"slack\.com/messages/([a-z0-9_-]+)").expect("static regex"),
        Regex::new(r"#([a-z0-9_-]+)").expect("static regex"),
    ]
});

/// Extracts a channel name from a tracker channel cell.
///
/// Accepts a Slack `messages/` URL, the `#name` display text of the link
/// formula, or the formula itself.
pub fn link_to_channel(link: &str) -> Option<String> {
    CHANNEL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(link))
        .map(|captures| captures[1].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn canonical_forms_agree() {
        let expected = canonicalize("foo bar");
        assert_eq!(canonicalize("Foo-Bar"), expected);
        assert_eq!(canonicalize("FOO_BAR"), expected);
    }

    #[test]
    fn canonicalize_drops_non_ascii() {
        assert_eq!(canonicalize("Café Ünïcode!"), "caf_ncode");
        assert_eq!(canonicalize(""), "");
    }

    #[test]
    fn channel_name_handles_missing_path() {
        assert_eq!(channel_name_for_url("puzzle1", None), "puzzle1");
        assert_eq!(channel_name_for_url("http://x/puzzle1", None), "puzzle1");
    }

    #[test]
    fn channel_name_is_truncated() {
        let url = format!("https://x.com/{}", "a".repeat(200));
        assert_eq!(channel_name_for_url(&url, None).len(), MAX_CHANNEL_NAME_LEN);
    }

    #[test]
    fn link_round_trips_through_formula() {
        let link = channel_to_link("controlgroup", "lorem_ipsum");
        assert_eq!(link_to_channel(&link).as_deref(), Some("lorem_ipsum"));
    }

    #[test]
    fn link_parses_display_text_and_urls() {
        assert_eq!(link_to_channel("#foo-bar").as_deref(), Some("foo-bar"));
        assert_eq!(
            link_to_channel("https://team.slack.com/messages/abc_1").as_deref(),
            Some("abc_1")
        );
        assert_eq!(link_to_channel("no channel here"), None);
        assert_eq!(link_to_channel(""), None);
    }

    proptest! {
        #[test]
        fn canonicalize_is_idempotent(name in ".*") {
            let once = canonicalize(&name);
            prop_assert_eq!(canonicalize(&once), once);
        }

        #[test]
        fn canonical_alphabet(name in ".*") {
            prop_assert!(canonicalize(&name)
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
        }

        #[test]
        fn separators_are_interchangeable(words in prop::collection::vec("[a-zA-Z0-9]{1,8}", 1..5)) {
            let spaced = words.join(" ");
            let hyphenated = words.join("-");
            let shouted = words.join("_").to_uppercase();
            prop_assert_eq!(canonicalize(&spaced), canonicalize(&hyphenated));
            prop_assert_eq!(canonicalize(&spaced), canonicalize(&shouted));
        }
    }
}
