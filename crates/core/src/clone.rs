//! Clone planning: naming, duplicate detection and description handling
//!
//! Everything the `jira clone` command decides before or between HTTP calls
//! lives here so it can be tested without a Jira instance.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::adf::{
    extract_plain_text_value, replace_media_with_links, text_document, AdfNode, AttachmentMap,
};
use crate::atlassian::jira::LinkedIssue;

/// Prefix put in front of every cloned summary
pub const CLONE_SUMMARY_PREFIX: &str = "Clone-";

/// One attachment copied from the source issue to the clone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRecord {
    pub old_id: String,
    pub new_id: String,
    pub filename: String,
    pub content_url: String,
}

/// Filename to download URL map, in copy order
pub fn attachment_map(records: &[AttachmentRecord]) -> AttachmentMap {
    records
        .iter()
        .map(|r| (r.filename.as_str(), r.content_url.as_str()))
        .collect()
}

/// Drop ASCII double quotes and surrounding whitespace.
pub fn sanitize_double_quotes(text: &str) -> String {
    text.replace('"', "").trim().to_string()
}

/// `Clone-{summary}({source_key})`, with quotes removed from `summary`
pub fn make_clone_summary(summary: &str, source_key: &str) -> String {
    format!(
        "{CLONE_SUMMARY_PREFIX}{}({source_key})",
        sanitize_double_quotes(summary)
    )
}

/// Whether `issue_key` already has a linked issue that looks like its clone
///
/// A linked issue counts when its summary contains both `head` and the key.
pub fn is_already_cloned(issue_key: &str, linked: &[LinkedIssue], head: &str) -> bool {
    linked
        .iter()
        .any(|link| link.summary.contains(head) && link.summary.contains(issue_key))
}

/// Text-only body used when creating the clone
///
/// Jira rejects media nodes that point at another issue's attachments, so the
/// clone starts with plain text and gets its rich description afterwards.
pub fn create_time_description(description: Option<&Value>, source_key: &str) -> AdfNode {
    let text = match description {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(value) => extract_plain_text_value(value).trim().to_string(),
        None => String::new(),
    };

    if text.is_empty() {
        text_document(format!("Cloned from {source_key}"))
    } else {
        text_document(text)
    }
}

/// Final description for the clone, with media swapped for attachment links
///
/// Returns `None` when the source description is not an ADF object; plain
/// text was already carried over by [`create_time_description`].
pub fn rewritten_description(
    description: Option<&Value>,
    attachments: &AttachmentMap,
) -> Option<AdfNode> {
    match description? {
        value @ Value::Object(_) => Some(replace_media_with_links(
            &AdfNode::from_value(value),
            attachments,
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlassian::jira::LinkDirection;
    use serde_json::json;

    fn linked(key: &str, summary: &str) -> LinkedIssue {
        LinkedIssue {
            link_type: "Relates".to_string(),
            direction: LinkDirection::Inward,
            issue_key: key.to_string(),
            summary: summary.to_string(),
        }
    }

    #[test]
    fn test_make_clone_summary_strips_quotes() {
        assert_eq!(
            make_clone_summary("  \"Login\" fails on \"Safari\" ", "SRC-12"),
            "Clone-Login fails on Safari(SRC-12)"
        );
    }

    #[test]
    fn test_is_already_cloned() {
        // Arrange
        let links = vec![
            linked("DEST-1", "Clone-Something else(SRC-9)"),
            linked("DEST-2", "Clone-Crash(SRC-1)"),
        ];

        // Act & Assert
        assert!(is_already_cloned("SRC-1", &links, CLONE_SUMMARY_PREFIX));
        assert!(!is_already_cloned("SRC-2", &links, CLONE_SUMMARY_PREFIX));
        assert!(!is_already_cloned("SRC-1", &[linked("X-1", "Crash SRC-1")], "Clone-"));
    }

    #[test]
    fn test_create_time_description_uses_text_or_fallback() {
        let adf = json!({
            "type": "doc",
            "version": 1,
            "content": [
                {"type": "paragraph", "content": [{"type": "text", "text": "  Steps "}]},
                {"type": "mediaSingle", "content": [{"type": "media", "attrs": {"fileName": "a.png"}}]}
            ]
        });
        let media_only = json!({
            "type": "doc",
            "version": 1,
            "content": [{"type": "mediaSingle", "content": [{"type": "media", "attrs": {}}]}]
        });

        assert_eq!(
            create_time_description(Some(&adf), "SRC-1"),
            text_document("Steps")
        );
        assert_eq!(
            create_time_description(Some(&media_only), "SRC-1"),
            text_document("Cloned from SRC-1")
        );
        assert_eq!(
            create_time_description(None, "SRC-1"),
            text_document("Cloned from SRC-1")
        );
        assert_eq!(
            create_time_description(Some(&json!(" plain ")), "SRC-1"),
            text_document("plain")
        );
    }

    #[test]
    fn test_rewritten_description_only_for_adf() {
        // Arrange
        let records = vec![AttachmentRecord {
            old_id: "10".to_string(),
            new_id: "20".to_string(),
            filename: "a.png".to_string(),
            content_url: "https://jira/att/20".to_string(),
        }];
        let map = attachment_map(&records);
        let adf = json!({
            "type": "doc",
            "version": 1,
            "content": [{"type": "mediaSingle", "content": [{"type": "media", "attrs": {"fileName": "a.png"}}]}]
        });

        // Act
        let rewritten = rewritten_description(Some(&adf), &map).unwrap().to_value();

        // Assert
        assert_eq!(rewritten["content"][0]["type"], "paragraph");
        assert_eq!(
            rewritten["content"][0]["content"][0]["marks"][0]["attrs"]["href"],
            "https://jira/att/20"
        );
        assert!(rewritten_description(Some(&json!("text")), &map).is_none());
        assert!(rewritten_description(None, &map).is_none());
    }

    #[test]
    fn test_attachment_map_keeps_copy_order() {
        let records = vec![
            AttachmentRecord {
                old_id: "1".to_string(),
                new_id: "11".to_string(),
                filename: "b.txt".to_string(),
                content_url: "u-b".to_string(),
            },
            AttachmentRecord {
                old_id: "2".to_string(),
                new_id: "12".to_string(),
                filename: "a.txt".to_string(),
                content_url: "u-a".to_string(),
            },
        ];

        let map = attachment_map(&records);

        assert_eq!(
            map.iter().collect::<Vec<_>>(),
            vec![("b.txt", "u-b"), ("a.txt", "u-a")]
        );
    }
}
