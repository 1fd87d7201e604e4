/// Naming conventions read from panel and item titles.
///
///   `## Design`      section header (marker char and repeat count configurable)
///   `// note`        comment item, never counted as work
///   `Doing [3]`      WIP limit of 3
///   `wip.a`, `wip.b` adjacent panels merged into a SuperPanel `wip`
use regex::Regex;
use std::sync::LazyLock;

use crate::config::Settings;

pub const COMMENT_MARKER: &str = "//";

static WIP_LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[(\d*)\]").unwrap());

/// Section marker built from the configured character and repeat count.
#[derive(Debug, Clone)]
pub struct SectionMarker {
    identifier: String,
    strip_re: Regex,
}

impl SectionMarker {
    pub fn new(ch: char, repeat: usize) -> Self {
        let repeat = repeat.max(1);
        let escaped = regex::escape(&ch.to_string());
        // A run of at least `repeat` marker characters, removed as a whole.
        let strip_re = Regex::new(&format!("(?:{}){{{},}}", escaped, repeat))
            .expect("escaped marker is a valid pattern");
        Self {
            identifier: ch.to_string().repeat(repeat),
            strip_re,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.section_char, settings.section_repeat)
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn is_section(&self, title: &str) -> bool {
        title.contains(&self.identifier)
    }

    /// Title with every marker run removed and surrounding whitespace trimmed.
    pub fn strip(&self, title: &str) -> String {
        self.strip_re.replace_all(title, "").trim().to_string()
    }
}

impl Default for SectionMarker {
    fn default() -> Self {
        Self::new('#', 2)
    }
}

pub fn is_comment(title: &str) -> bool {
    title.contains(COMMENT_MARKER)
}

/// Integer inside the first `[N]` of a panel name.
pub fn extract_wip_limit(name: &str) -> Option<u32> {
    WIP_LIMIT_RE
        .captures_iter(name)
        .next()
        .and_then(|caps| caps[1].parse::<u32>().ok())
}

pub fn has_wip_annotation(name: &str) -> bool {
    WIP_LIMIT_RE.is_match(name)
}

/// Pattern matching a `[N]` annotation, for selecting panels by name.
pub fn wip_annotation_pattern() -> Regex {
    WIP_LIMIT_RE.clone()
}

/// Substring before the first `.`, if the name has one.
pub fn merge_group(name: &str) -> Option<&str> {
    name.find('.').map(|idx| &name[..idx])
}

/// Two panel names belong to the same SuperPanel.
pub fn are_related(left: &str, right: &str) -> bool {
    match (merge_group(left), merge_group(right)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Panel name as displayed: the WIP annotation dropped and, for merged
/// panels, the group prefix dropped as well.
pub fn display_title(name: &str, merged: bool) -> String {
    let mut title = match name.find('[') {
        Some(idx) => &name[..idx],
        None => name,
    };
    if merged {
        if let Some(idx) = title.find('.') {
            title = &title[idx + 1..];
        }
    }
    title.trim().to_string()
}

/// Split badge text `key: value` into a field. Text without a separator is a flag.
pub fn parse_badge_field(text: &str) -> (String, String) {
    let parts: Vec<&str> = text.split(": ").collect();
    if parts.len() == 2 {
        (parts[0].to_string(), parts[1].to_string())
    } else {
        (text.to_string(), "true".to_string())
    }
}

pub fn is_blocked_badge(text: &str) -> bool {
    text.contains("Blocked") || text.contains("blocked")
}

/// Board ID from a location such as `https://host/b/<ID>/<name>`.
pub fn board_id_from_location(location: &str) -> Option<String> {
    let segments: Vec<&str> = location.split('/').collect();
    if segments.len() < 2 {
        return None;
    }
    Some(segments[segments.len() - 2].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_detection() {
        let marker = SectionMarker::default();
        assert!(marker.is_section("## Design"));
        assert!(marker.is_section("Design ##"));
        assert!(!marker.is_section("# Design"));
        assert_eq!(marker.identifier(), "##");
    }

    #[test]
    fn test_strip_removes_runs() {
        let marker = SectionMarker::default();
        assert_eq!(marker.strip("## Design"), "Design");
        assert_eq!(marker.strip("### Design ##"), "Design");
        assert_eq!(marker.strip("Issue #12"), "Issue #12");
    }

    #[test]
    fn test_strip_is_idempotent() {
        let marker = SectionMarker::default();
        for title in ["## A", "#a##b#", "  ##  ", "x ## y ### z", "# # #"] {
            let once = marker.strip(title);
            assert_eq!(marker.strip(&once), once, "title {:?}", title);
        }
    }

    #[test]
    fn test_custom_marker_is_escaped() {
        let marker = SectionMarker::new('*', 3);
        assert!(marker.is_section("*** Later"));
        assert!(!marker.is_section("** Later"));
        assert_eq!(marker.strip("**** Later"), "Later");
        assert_eq!(marker.strip("** Later"), "** Later");
    }

    #[test]
    fn test_extract_wip_limit() {
        assert_eq!(extract_wip_limit("Doing [3]"), Some(3));
        assert_eq!(extract_wip_limit("Doing [3] [5]"), Some(3));
        assert_eq!(extract_wip_limit("Doing [x] [5]"), Some(5));
        assert_eq!(extract_wip_limit("Doing"), None);
        assert_eq!(extract_wip_limit("Doing []"), None);
        assert!(has_wip_annotation("Doing []"));
    }

    #[test]
    fn test_related_names() {
        assert!(are_related("wip.a", "wip.b"));
        assert!(are_related("wip.b", "wip.a"));
        assert!(!are_related("wip.a", "done.b"));
        assert!(!are_related("wip.a", "wip"));
        assert!(!are_related(".a", "Done"));
        assert_eq!(merge_group("wip.a.b"), Some("wip"));
    }

    #[test]
    fn test_display_title() {
        assert_eq!(display_title("Doing [3]", false), "Doing");
        assert_eq!(display_title("wip.a [3]", true), "a");
        assert_eq!(display_title("wip.a", false), "wip.a");
    }

    #[test]
    fn test_parse_badge_field() {
        assert_eq!(
            parse_badge_field("Estimate: 3"),
            ("Estimate".to_string(), "3".to_string())
        );
        assert_eq!(
            parse_badge_field("Blocked"),
            ("Blocked".to_string(), "true".to_string())
        );
    }

    #[test]
    fn test_board_id_from_location() {
        assert_eq!(
            board_id_from_location("https://trello.com/b/Ab12Cd/my-board").as_deref(),
            Some("Ab12Cd")
        );
        assert_eq!(board_id_from_location("nolocation"), None);
    }
}
