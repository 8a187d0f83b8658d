//! Atlassian Document Format (ADF) model and tree transforms
//!
//! Jira stores rich-text fields (descriptions, comments) as ADF: a JSON tree of
//! typed nodes. This module gives that tree a typed shape and implements the two
//! transforms used when cloning a ticket:
//!
//! - [`extract_plain_text`]: flattens a document into its visible text, skipping
//!   every media node. Used to build a create-time description Jira will accept.
//! - [`replace_media_with_links`]: rewrites media nodes into paragraphs that link to
//!   re-uploaded attachments, then appends an attachment list.
//!
//! Both transforms borrow the source tree and allocate a new one. Neither can fail:
//! node shapes this module does not understand are carried through as
//! [`AdfNode::Other`] and copied verbatim.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Node types that reference embedded files or images.
pub const MEDIA_TYPES: [&str; 3] = ["media", "mediaSingle", "mediaGroup"];

/// Text used for a media reference that carries no file name.
pub const UNNAMED_MEDIA_TEXT: &str = "image";

/// Heading paragraph placed before the appended attachment list.
pub const ATTACHMENTS_HEADING: &str = "Attachments:";

/// Returns true if `node_type` is one of [`MEDIA_TYPES`].
pub fn is_media_type(node_type: &str) -> bool {
    MEDIA_TYPES.contains(&node_type)
}

/// A single ADF node.
///
/// Known kinds carry their own fields plus an `extra` map holding any keys this
/// model does not name, so a parse/serialize round trip loses nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum AdfNode {
    Doc(Doc),
    Paragraph(Block),
    Text(TextNode),
    Media(MediaNode),
    MediaSingle(Block),
    MediaGroup(Block),
    BulletList(Block),
    ListItem(Block),
    Other(OpaqueNode),
}

/// Root document node. `version` is always emitted; ADF only defines version 1.
#[derive(Debug, Clone, PartialEq)]
pub struct Doc {
    pub version: u64,
    pub content: Vec<AdfNode>,
    pub extra: Map<String, Value>,
}

/// A container node (paragraph, list, list item, media wrapper).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub attrs: Option<Map<String, Value>>,
    pub content: Option<Vec<AdfNode>>,
    pub extra: Map<String, Value>,
}

/// An inline text run with its formatting marks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextNode {
    pub text: String,
    pub marks: Vec<Mark>,
    pub extra: Map<String, Value>,
}

/// A standalone media reference (`attrs.fileName`, `attrs.id`, ...).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaNode {
    pub attrs: Option<Map<String, Value>>,
    pub extra: Map<String, Value>,
}

/// Inline formatting annotation on a text node.
#[derive(Debug, Clone, PartialEq)]
pub struct Mark {
    pub mark_type: String,
    pub attrs: Option<Map<String, Value>>,
    pub extra: Map<String, Value>,
}

/// A node of a type this model does not enumerate.
///
/// `raw` holds every field except `content` (or the whole value when the node is
/// not a JSON object). `content` is parsed so transforms can still reach the
/// known nodes below it.
#[derive(Debug, Clone, PartialEq)]
pub struct OpaqueNode {
    pub raw: Value,
    pub content: Option<Vec<AdfNode>>,
}

impl OpaqueNode {
    pub fn node_type(&self) -> Option<&str> {
        self.raw.get("type").and_then(Value::as_str)
    }
}

impl Mark {
    /// A `link` mark pointing at `href`.
    pub fn link(href: impl Into<String>) -> Self {
        let mut attrs = Map::new();
        attrs.insert("href".to_string(), Value::String(href.into()));
        Self {
            mark_type: "link".to_string(),
            attrs: Some(attrs),
            extra: Map::new(),
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let map = value.as_object()?;
        let mark_type = map.get("type")?.as_str()?.to_string();
        let mut extra = map.clone();
        extra.remove("type");
        let attrs = take_object(&mut extra, "attrs");
        Some(Self {
            mark_type,
            attrs,
            extra,
        })
    }

    fn to_value(&self) -> Value {
        let mut map = self.extra.clone();
        map.insert("type".to_string(), Value::String(self.mark_type.clone()));
        if let Some(attrs) = &self.attrs {
            map.insert("attrs".to_string(), Value::Object(attrs.clone()));
        }
        Value::Object(map)
    }
}

impl AdfNode {
    /// A version-1 document holding `content`.
    pub fn doc(content: Vec<AdfNode>) -> Self {
        AdfNode::Doc(Doc {
            version: 1,
            content,
            extra: Map::new(),
        })
    }

    pub fn paragraph(content: Vec<AdfNode>) -> Self {
        AdfNode::Paragraph(Block {
            content: Some(content),
            ..Block::default()
        })
    }

    pub fn text(text: impl Into<String>) -> Self {
        AdfNode::Text(TextNode {
            text: text.into(),
            ..TextNode::default()
        })
    }

    /// A text node carrying a single `link` mark.
    pub fn linked_text(text: impl Into<String>, href: impl Into<String>) -> Self {
        AdfNode::Text(TextNode {
            text: text.into(),
            marks: vec![Mark::link(href)],
            extra: Map::new(),
        })
    }

    pub fn bullet_list(items: Vec<AdfNode>) -> Self {
        AdfNode::BulletList(Block {
            content: Some(items),
            ..Block::default()
        })
    }

    pub fn list_item(content: Vec<AdfNode>) -> Self {
        AdfNode::ListItem(Block {
            content: Some(content),
            ..Block::default()
        })
    }

    /// The ADF `type` tag of this node, if it has one.
    pub fn node_type(&self) -> Option<&str> {
        match self {
            AdfNode::Doc(_) => Some("doc"),
            AdfNode::Paragraph(_) => Some("paragraph"),
            AdfNode::Text(_) => Some("text"),
            AdfNode::Media(_) => Some("media"),
            AdfNode::MediaSingle(_) => Some("mediaSingle"),
            AdfNode::MediaGroup(_) => Some("mediaGroup"),
            AdfNode::BulletList(_) => Some("bulletList"),
            AdfNode::ListItem(_) => Some("listItem"),
            AdfNode::Other(opaque) => opaque.node_type(),
        }
    }

    pub fn is_media(&self) -> bool {
        self.node_type().is_some_and(is_media_type)
    }

    /// Child nodes, if this node has a `content` sequence.
    pub fn children(&self) -> Option<&[AdfNode]> {
        match self {
            AdfNode::Doc(doc) => Some(&doc.content),
            AdfNode::Paragraph(block)
            | AdfNode::MediaSingle(block)
            | AdfNode::MediaGroup(block)
            | AdfNode::BulletList(block)
            | AdfNode::ListItem(block) => block.content.as_deref(),
            AdfNode::Other(opaque) => opaque.content.as_deref(),
            AdfNode::Text(_) | AdfNode::Media(_) => None,
        }
    }

    /// The node's `attrs` object, if present.
    pub fn attrs(&self) -> Option<&Map<String, Value>> {
        match self {
            AdfNode::Paragraph(block)
            | AdfNode::MediaSingle(block)
            | AdfNode::MediaGroup(block)
            | AdfNode::BulletList(block)
            | AdfNode::ListItem(block) => block.attrs.as_ref(),
            AdfNode::Media(media) => media.attrs.as_ref(),
            AdfNode::Other(opaque) => opaque.raw.get("attrs").and_then(Value::as_object),
            AdfNode::Doc(_) | AdfNode::Text(_) => None,
        }
    }

    /// File name referenced by a media node: `attrs.fileName`, falling back to
    /// `attrs.name`. Empty strings count as missing.
    pub fn media_file_name(&self) -> Option<&str> {
        let attrs = self.attrs()?;
        ["fileName", "name"]
            .iter()
            .filter_map(|key| attrs.get(*key).and_then(Value::as_str))
            .find(|name| !name.is_empty())
    }

    /// Build a node from raw JSON. Never fails; unrecognized shapes become
    /// [`AdfNode::Other`].
    pub fn from_value(value: &Value) -> Self {
        let Some(map) = value.as_object() else {
            return AdfNode::Other(OpaqueNode {
                raw: value.clone(),
                content: None,
            });
        };

        let mut extra = map.clone();
        let node_type = match extra.get("type").and_then(Value::as_str) {
            Some(t) => t.to_string(),
            None => return opaque_from_map(extra),
        };

        match node_type.as_str() {
            "doc" => {
                extra.remove("type");
                let version = extra
                    .remove("version")
                    .and_then(|v| v.as_u64())
                    .unwrap_or(1);
                let content = take_children(&mut extra).unwrap_or_default();
                AdfNode::Doc(Doc {
                    version,
                    content,
                    extra,
                })
            }
            "text" => {
                let Some(text) = extra.get("text").and_then(Value::as_str).map(String::from)
                else {
                    return opaque_from_map(extra);
                };
                let marks = match extra.get("marks") {
                    None => Some(Vec::new()),
                    Some(Value::Array(items)) => items.iter().map(Mark::from_value).collect(),
                    Some(_) => None,
                };
                let Some(marks) = marks else {
                    return opaque_from_map(extra);
                };
                extra.remove("type");
                extra.remove("text");
                extra.remove("marks");
                AdfNode::Text(TextNode { text, marks, extra })
            }
            "media" => {
                extra.remove("type");
                let attrs = take_object(&mut extra, "attrs");
                AdfNode::Media(MediaNode { attrs, extra })
            }
            "paragraph" | "mediaSingle" | "mediaGroup" | "bulletList" | "listItem" => {
                extra.remove("type");
                let attrs = take_object(&mut extra, "attrs");
                let content = take_children(&mut extra);
                let block = Block {
                    attrs,
                    content,
                    extra,
                };
                match node_type.as_str() {
                    "paragraph" => AdfNode::Paragraph(block),
                    "mediaSingle" => AdfNode::MediaSingle(block),
                    "mediaGroup" => AdfNode::MediaGroup(block),
                    "bulletList" => AdfNode::BulletList(block),
                    _ => AdfNode::ListItem(block),
                }
            }
            _ => opaque_from_map(extra),
        }
    }

    /// Serialize back to ADF JSON.
    pub fn to_value(&self) -> Value {
        match self {
            AdfNode::Doc(doc) => {
                let mut map = doc.extra.clone();
                map.insert("type".to_string(), Value::from("doc"));
                map.insert("version".to_string(), Value::from(doc.version));
                map.insert("content".to_string(), nodes_to_value(&doc.content));
                Value::Object(map)
            }
            AdfNode::Text(text) => {
                let mut map = text.extra.clone();
                map.insert("type".to_string(), Value::from("text"));
                map.insert("text".to_string(), Value::from(text.text.as_str()));
                if !text.marks.is_empty() {
                    map.insert(
                        "marks".to_string(),
                        Value::Array(text.marks.iter().map(Mark::to_value).collect()),
                    );
                }
                Value::Object(map)
            }
            AdfNode::Media(media) => {
                let mut map = media.extra.clone();
                map.insert("type".to_string(), Value::from("media"));
                if let Some(attrs) = &media.attrs {
                    map.insert("attrs".to_string(), Value::Object(attrs.clone()));
                }
                Value::Object(map)
            }
            AdfNode::Paragraph(block)
            | AdfNode::MediaSingle(block)
            | AdfNode::MediaGroup(block)
            | AdfNode::BulletList(block)
            | AdfNode::ListItem(block) => {
                let mut map = block.extra.clone();
                // Known block kinds always have a type tag.
                let node_type = self.node_type().unwrap_or_default();
                map.insert("type".to_string(), Value::from(node_type));
                if let Some(attrs) = &block.attrs {
                    map.insert("attrs".to_string(), Value::Object(attrs.clone()));
                }
                if let Some(content) = &block.content {
                    map.insert("content".to_string(), nodes_to_value(content));
                }
                Value::Object(map)
            }
            AdfNode::Other(opaque) => match (&opaque.raw, &opaque.content) {
                (Value::Object(raw), Some(content)) => {
                    let mut map = raw.clone();
                    map.insert("content".to_string(), nodes_to_value(content));
                    Value::Object(map)
                }
                (raw, _) => raw.clone(),
            },
        }
    }

    fn with_children(&self, content: Vec<AdfNode>) -> AdfNode {
        match self {
            AdfNode::Doc(doc) => AdfNode::Doc(Doc {
                version: doc.version,
                content,
                extra: doc.extra.clone(),
            }),
            AdfNode::Paragraph(block) => AdfNode::Paragraph(block.with_content(content)),
            AdfNode::MediaSingle(block) => AdfNode::MediaSingle(block.with_content(content)),
            AdfNode::MediaGroup(block) => AdfNode::MediaGroup(block.with_content(content)),
            AdfNode::BulletList(block) => AdfNode::BulletList(block.with_content(content)),
            AdfNode::ListItem(block) => AdfNode::ListItem(block.with_content(content)),
            AdfNode::Other(opaque) => AdfNode::Other(OpaqueNode {
                raw: opaque.raw.clone(),
                content: Some(content),
            }),
            AdfNode::Text(_) | AdfNode::Media(_) => self.clone(),
        }
    }
}

impl Block {
    fn with_content(&self, content: Vec<AdfNode>) -> Block {
        Block {
            attrs: self.attrs.clone(),
            content: Some(content),
            extra: self.extra.clone(),
        }
    }
}

impl Serialize for AdfNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for AdfNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(AdfNode::from_value(&value))
    }
}

impl From<&Value> for AdfNode {
    fn from(value: &Value) -> Self {
        AdfNode::from_value(value)
    }
}

fn take_object(map: &mut Map<String, Value>, key: &str) -> Option<Map<String, Value>> {
    match map.remove(key) {
        Some(Value::Object(obj)) => Some(obj),
        Some(other) => {
            map.insert(key.to_string(), other);
            None
        }
        None => None,
    }
}

fn take_children(map: &mut Map<String, Value>) -> Option<Vec<AdfNode>> {
    match map.remove("content") {
        Some(Value::Array(items)) => Some(items.iter().map(AdfNode::from_value).collect()),
        Some(other) => {
            map.insert("content".to_string(), other);
            None
        }
        None => None,
    }
}

fn opaque_from_map(mut map: Map<String, Value>) -> AdfNode {
    let content = take_children(&mut map);
    AdfNode::Other(OpaqueNode {
        raw: Value::Object(map),
        content,
    })
}

fn nodes_to_value(nodes: &[AdfNode]) -> Value {
    Value::Array(nodes.iter().map(AdfNode::to_value).collect())
}

/// A single-paragraph document holding `text`.
pub fn text_document(text: impl Into<String>) -> AdfNode {
    AdfNode::doc(vec![AdfNode::paragraph(vec![AdfNode::text(text)])])
}

// --- Plain-text extraction ---

/// Concatenate every visible text run in document order.
///
/// Media nodes contribute nothing, including anything nested under them. No
/// separators are inserted between runs. Walks the node's JSON form, so the
/// result always equals [`extract_plain_text_value`] on the same document.
pub fn extract_plain_text(node: &AdfNode) -> String {
    extract_plain_text_value(&node.to_value())
}

/// [`extract_plain_text`] over raw JSON. `null` and scalars yield an empty string.
pub fn extract_plain_text_value(value: &Value) -> String {
    let mut out = String::new();
    collect_value_text(value, &mut out);
    out
}

fn collect_value_text(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let node_type = map.get("type").and_then(Value::as_str);
            if node_type.is_some_and(is_media_type) {
                return;
            }
            if node_type == Some("text") {
                match map.get("text") {
                    Some(Value::String(s)) => out.push_str(s),
                    Some(Value::Number(n)) => out.push_str(&n.to_string()),
                    _ => {}
                }
            }
            for (key, child) in map {
                // The text value itself was handled above.
                if node_type == Some("text") && key == "text" {
                    continue;
                }
                collect_value_text(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_value_text(item, out);
            }
        }
        _ => {}
    }
}

// --- Media-to-link rewrite ---

/// Ordered mapping from attachment file name to its download URL.
///
/// Insertion order is kept so the appended attachment list is deterministic.
/// Re-inserting a file name replaces its URL in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentMap {
    entries: Vec<(String, String)>,
}

impl AttachmentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry. Empty file names or URLs are ignored.
    pub fn insert(&mut self, filename: impl Into<String>, url: impl Into<String>) {
        let filename = filename.into();
        let url = url.into();
        if filename.is_empty() || url.is_empty() {
            return;
        }

        match self.entries.iter_mut().find(|(name, _)| *name == filename) {
            Some(entry) => entry.1 = url,
            None => self.entries.push((filename, url)),
        }
    }

    /// Exact-match lookup.
    pub fn get(&self, filename: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(name, _)| name == filename)
            .map(|(_, url)| url.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, url)| (name.as_str(), url.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AttachmentMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = AttachmentMap::new();
        for (filename, url) in iter {
            map.insert(filename, url);
        }
        map
    }
}

/// Result of rewriting one node: a replacement node, or a run of siblings that
/// must be spliced into the parent's content in place of the original.
#[derive(Debug, Clone, PartialEq)]
pub enum Rewrite {
    One(AdfNode),
    Splice(Vec<AdfNode>),
}

/// Replace every media node with a paragraph linking to its copied attachment.
///
/// - `mediaSingle` and `media` become one paragraph whose text is the file name
///   (or `"image"`), linked when `attachments` has a URL for it.
/// - `mediaGroup` becomes one such paragraph per child, spliced into the parent.
///   An empty group becomes a single empty paragraph.
/// - Every other node is copied with its children rewritten.
///
/// When the result is a `doc` and `attachments` is not empty, an
/// `"Attachments:"` paragraph and a bullet list linking every attachment are
/// appended, so copies stay reachable even when file names did not match.
pub fn replace_media_with_links(node: &AdfNode, attachments: &AttachmentMap) -> AdfNode {
    let rewritten = match rewrite_node(node, attachments) {
        Rewrite::One(node) => node,
        Rewrite::Splice(nodes) => AdfNode::doc(nodes),
    };

    append_attachment_list(rewritten, attachments)
}

/// Rewrite a single node without the trailing attachment list.
pub fn rewrite_node(node: &AdfNode, attachments: &AttachmentMap) -> Rewrite {
    match node {
        AdfNode::MediaSingle(block) => {
            let filename = block
                .content
                .as_ref()
                .and_then(|children| children.first())
                .and_then(AdfNode::media_file_name);
            Rewrite::One(media_link_paragraph(filename, attachments))
        }
        AdfNode::Media(_) => Rewrite::One(media_link_paragraph(
            node.media_file_name(),
            attachments,
        )),
        AdfNode::MediaGroup(block) => {
            let paragraphs: Vec<AdfNode> = block
                .content
                .iter()
                .flatten()
                .map(|media| media_link_paragraph(media.media_file_name(), attachments))
                .collect();

            if paragraphs.is_empty() {
                Rewrite::One(AdfNode::paragraph(vec![AdfNode::text("")]))
            } else {
                Rewrite::Splice(paragraphs)
            }
        }
        _ => match node.children() {
            Some(children) => Rewrite::One(node.with_children(rewrite_children(
                children,
                attachments,
            ))),
            None => Rewrite::One(node.clone()),
        },
    }
}

fn rewrite_children(children: &[AdfNode], attachments: &AttachmentMap) -> Vec<AdfNode> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        match rewrite_node(child, attachments) {
            Rewrite::One(node) => out.push(node),
            Rewrite::Splice(nodes) => out.extend(nodes),
        }
    }
    out
}

fn media_link_paragraph(filename: Option<&str>, attachments: &AttachmentMap) -> AdfNode {
    let text = filename.unwrap_or(UNNAMED_MEDIA_TEXT);
    let url = filename.and_then(|name| attachments.get(name));

    let run = match url {
        Some(url) => AdfNode::linked_text(text, url),
        None => AdfNode::text(text),
    };
    AdfNode::paragraph(vec![run])
}

fn append_attachment_list(node: AdfNode, attachments: &AttachmentMap) -> AdfNode {
    let AdfNode::Doc(mut doc) = node else {
        return node;
    };

    if attachments.is_empty() {
        return AdfNode::Doc(doc);
    }

    let items = attachments
        .iter()
        .map(|(filename, url)| {
            AdfNode::list_item(vec![AdfNode::paragraph(vec![AdfNode::linked_text(
                filename, url,
            )])])
        })
        .collect();
    let appendix = [
        AdfNode::paragraph(vec![AdfNode::text(ATTACHMENTS_HEADING)]),
        AdfNode::bullet_list(items),
    ];

    // Rewriting an already rewritten document must not list the attachments twice.
    if !doc.content.ends_with(&appendix) {
        doc.content.extend(appendix);
    }

    AdfNode::Doc(doc)
}
