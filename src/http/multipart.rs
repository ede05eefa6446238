//! Request bodies: nested form fields, file uploads and multipart forms.
//!
//! # Example
//! ```ignore
//! use curlreq::http::multipart::{FormFields, MultipartBuilder, PostBody};
//!
//! let fields = FormFields::new()
//!     .text("username", "user123")
//!     .nested("profile", FormFields::new().text("lang", "cs"));
//! let files = FormFields::new().text("avatar", "./avatar.png");
//!
//! // "username", "profile[lang]" as text parts, "avatar" as a file part
//! let payload = MultipartBuilder::build(&PostBody::Fields(fields), &files)?;
//! ```

use crate::base::context::IoResultExt;
use crate::base::neterror::NetError;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Content type forced on requests that upload files.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

const FALLBACK_MIME: &str = "application/octet-stream";

/// A field value: either text or a nested group of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Nested(FormFields),
}

/// Ordered, possibly nested, form fields.
///
/// Also used for file mappings, where each text leaf is a filesystem path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields {
    entries: Vec<(String, FormValue)>,
}

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a text field, replacing any field with the same name.
    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name.into(), FormValue::Text(value.into()));
        self
    }

    /// Add a nested group, rendered as `name[child]`.
    pub fn nested(mut self, name: impl Into<String>, fields: FormFields) -> Self {
        self.insert(name.into(), FormValue::Nested(fields));
        self
    }

    pub fn insert(&mut self, name: String, value: FormValue) {
        if let Some((_, v)) = self.entries.iter_mut().find(|(n, _)| *n == name) {
            *v = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&FormValue> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FormValue)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Flatten to `(composite key, value)` pairs: `{"a": {"b": "1"}}`
    /// becomes `[("a[b]", "1")]`.
    pub fn flatten(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        flatten_into(&self.entries, None, &mut |key, value: &String| {
            out.push((key, value.clone()))
        });
        out
    }
}

impl<K, V> FromIterator<(K, V)> for FormFields
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(FormFields::new(), |fields, (k, v)| fields.text(k, v))
    }
}

/// The body a request carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostBody {
    /// Sent verbatim.
    Raw(String),
    /// Form fields, url-encoded or multipart when files are attached.
    Fields(FormFields),
}

impl Default for PostBody {
    fn default() -> Self {
        PostBody::Fields(FormFields::new())
    }
}

impl PostBody {
    /// Empty means "send no body at all".
    pub fn is_empty(&self) -> bool {
        match self {
            PostBody::Raw(s) => s.is_empty(),
            PostBody::Fields(f) => f.is_empty(),
        }
    }
}

impl From<String> for PostBody {
    fn from(s: String) -> Self {
        PostBody::Raw(s)
    }
}

impl From<&str> for PostBody {
    fn from(s: &str) -> Self {
        PostBody::Raw(s.to_string())
    }
}

impl From<FormFields> for PostBody {
    fn from(f: FormFields) -> Self {
        PostBody::Fields(f)
    }
}

/// A multipart form handed to the transfer engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Form {
    fields: Vec<(String, Part)>,
}

impl Form {
    /// Create a new empty form.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Add a text field.
    pub fn text(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.part(name, Part::Text(value.into()))
    }

    /// Add a custom part.
    pub fn part(mut self, name: impl Into<String>, part: Part) -> Self {
        self.fields.push((name.into(), part));
        self
    }

    /// Get the Content-Type header value.
    ///
    /// The boundary is chosen by the engine when it encodes the body.
    pub fn content_type(&self) -> &'static str {
        MULTIPART_FORM_DATA
    }

    pub fn parts(&self) -> impl Iterator<Item = (&str, &Part)> {
        self.fields.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// A part of a multipart form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Text(String),
    File {
        path: PathBuf,
        content_type: String,
        file_name: String,
    },
}

impl Part {
    /// Resolve `path` to an absolute file part, sniffing its MIME type from
    /// the first bytes and naming it after the path's basename.
    pub fn file(path: impl AsRef<Path>) -> Result<Self, NetError> {
        let path = path.as_ref();
        let absolute = fs::canonicalize(path).path_context(path)?;
        let content_type = sniff_mime(&absolute)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Part::File {
            path: absolute,
            content_type: content_type.to_string(),
            file_name,
        })
    }

    pub fn is_file(&self) -> bool {
        matches!(self, Part::File { .. })
    }
}

/// What the transport hands to the engine as `postFields`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostPayload {
    /// No body: `post` and `postFields` are cleared.
    Empty,
    /// Verbatim body.
    Raw(String),
    /// Flattened fields, sent url-encoded.
    Fields(Vec<(String, String)>),
    /// Fields and files, sent as `multipart/form-data`.
    Multipart(Form),
}

impl PostPayload {
    /// Content type the request must carry, if the payload dictates one.
    pub fn content_type(&self) -> Option<&'static str> {
        match self {
            PostPayload::Multipart(form) => Some(form.content_type()),
            _ => None,
        }
    }

    /// `application/x-www-form-urlencoded` rendering of `Fields`.
    pub fn urlencoded(fields: &[(String, String)]) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish()
    }
}

/// Combines a body with file uploads.
pub struct MultipartBuilder;

impl MultipartBuilder {
    /// Build the payload for `body` plus `files`.
    ///
    /// Files are merged into the fields by matching key paths; on a conflict
    /// the field wins. Files cannot be combined with a raw body.
    pub fn build(body: &PostBody, files: &FormFields) -> Result<PostPayload, NetError> {
        if !files.is_empty() {
            let PostBody::Fields(fields) = body else {
                return Err(NetError::NotSupported(
                    "files cannot be sent together with a raw string body".to_string(),
                ));
            };

            let mut tree = to_tree(fields, &mut |v| Ok(Leaf::Text(v.clone())))?;
            let file_tree = to_tree(files, &mut |path| Part::file(path).map(Leaf::File))?;
            merge_tree(&mut tree, file_tree);

            let mut form = Form::new();
            flatten_into(&tree, None, &mut |key, leaf: &Leaf| {
                form.fields.push((
                    key,
                    match leaf {
                        Leaf::Text(v) => Part::Text(v.clone()),
                        Leaf::File(p) => p.clone(),
                    },
                ))
            });
            return Ok(PostPayload::Multipart(form));
        }

        if body.is_empty() {
            return Ok(PostPayload::Empty);
        }

        Ok(match body {
            PostBody::Raw(s) => PostPayload::Raw(s.clone()),
            PostBody::Fields(fields) => PostPayload::Fields(fields.flatten()),
        })
    }
}

enum Leaf {
    Text(String),
    File(Part),
}

enum Node<T> {
    Leaf(T),
    Nested(Vec<(String, Node<T>)>),
}

trait Entry: Sized {
    type Leaf;
    fn view(&self) -> Result<&Self::Leaf, &[(String, Self)]>;
}

impl Entry for FormValue {
    type Leaf = String;
    fn view(&self) -> Result<&String, &[(String, FormValue)]> {
        match self {
            FormValue::Text(v) => Ok(v),
            FormValue::Nested(f) => Err(f.entries.as_slice()),
        }
    }
}

impl<T> Entry for Node<T> {
    type Leaf = T;
    fn view(&self) -> Result<&T, &[(String, Node<T>)]> {
        match self {
            Node::Leaf(v) => Ok(v),
            Node::Nested(children) => Err(children.as_slice()),
        }
    }
}

fn to_tree(
    fields: &FormFields,
    leaf: &mut dyn FnMut(&String) -> Result<Leaf, NetError>,
) -> Result<Vec<(String, Node<Leaf>)>, NetError> {
    fields
        .entries
        .iter()
        .map(|(name, value)| {
            let node = match value {
                FormValue::Text(v) => Node::Leaf(leaf(v)?),
                FormValue::Nested(f) => Node::Nested(to_tree(f, leaf)?),
            };
            Ok((name.clone(), node))
        })
        .collect()
}

/// Recursive merge where existing keys in `left` win; nested groups present
/// on both sides are merged.
fn merge_tree<T>(left: &mut Vec<(String, Node<T>)>, right: Vec<(String, Node<T>)>) {
    for (name, node) in right {
        match left.iter_mut().find(|(n, _)| *n == name) {
            Some((_, Node::Nested(existing))) => {
                if let Node::Nested(children) = node {
                    merge_tree(existing, children);
                }
            }
            Some(_) => {}
            None => left.push((name, node)),
        }
    }
}

fn flatten_into<E: Entry>(
    entries: &[(String, E)],
    prefix: Option<&str>,
    emit: &mut dyn FnMut(String, &E::Leaf),
) {
    for (name, entry) in entries {
        let key = match prefix {
            Some(p) => format!("{}[{}]", p, name),
            None => name.clone(),
        };
        match entry.view() {
            Ok(leaf) => emit(key, leaf),
            Err(children) => flatten_into(children, Some(&key), emit),
        }
    }
}

/// Guess a file's MIME type from its leading bytes.
pub fn sniff_mime(path: &Path) -> Result<&'static str, NetError> {
    let mut head = Vec::with_capacity(512);
    fs::File::open(path)
        .and_then(|f| f.take(512).read_to_end(&mut head))
        .path_context(path)?;
    Ok(sniff_bytes(&head))
}

fn sniff_bytes(head: &[u8]) -> &'static str {
    const SIGNATURES: &[(&[u8], &str)] = &[
        (b"\x89PNG\r\n\x1a\n", "image/png"),
        (b"\xff\xd8\xff", "image/jpeg"),
        (b"GIF87a", "image/gif"),
        (b"GIF89a", "image/gif"),
        (b"%PDF-", "application/pdf"),
        (b"PK\x03\x04", "application/zip"),
        (b"\x1f\x8b", "application/gzip"),
        (b"BM", "image/bmp"),
        (b"<?xml", "text/xml"),
    ];

    if head.is_empty() {
        return "application/x-empty";
    }
    if let Some((_, mime)) = SIGNATURES.iter().find(|(sig, _)| head.starts_with(sig)) {
        return mime;
    }
    if head.len() >= 12 && &head[..4] == b"RIFF" && &head[8..12] == b"WEBP" {
        return "image/webp";
    }

    let trimmed = head
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| &head[i..])
        .unwrap_or(head);
    let lower: Vec<u8> = trimmed
        .iter()
        .take(14)
        .map(|b| b.to_ascii_lowercase())
        .collect();
    if lower.starts_with(b"<!doctype html") || lower.starts_with(b"<html") {
        return "text/html";
    }

    // The read may stop inside a multi-byte character.
    let utf8 = match std::str::from_utf8(head) {
        Ok(_) => true,
        Err(e) => e.error_len().is_none(),
    };
    if utf8 && !head.contains(&0) {
        return "text/plain";
    }
    FALLBACK_MIME
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_flatten_nested() {
        let fields = FormFields::new().nested("a", FormFields::new().text("b", "1"));
        assert_eq!(fields.flatten(), vec![("a[b]".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_flatten_deep() {
        let fields = FormFields::new().text("x", "0").nested(
            "a",
            FormFields::new()
                .text("b", "1")
                .nested("c", FormFields::new().text("d", "2")),
        );
        let flat = fields.flatten();
        assert_eq!(flat[0], ("x".to_string(), "0".to_string()));
        assert_eq!(flat[1], ("a[b]".to_string(), "1".to_string()));
        assert_eq!(flat[2], ("a[c][d]".to_string(), "2".to_string()));
    }

    #[test]
    fn test_fields_payload_is_urlencoded() {
        let body = PostBody::Fields(FormFields::new().nested("a", FormFields::new().text("b", "1 2")));
        let payload = MultipartBuilder::build(&body, &FormFields::new()).unwrap();

        let PostPayload::Fields(fields) = &payload else {
            panic!("Expected Fields");
        };
        assert_eq!(PostPayload::urlencoded(fields), "a%5Bb%5D=1+2");
        assert_eq!(payload.content_type(), None);
    }

    #[test]
    fn test_raw_body_with_files_rejected() {
        let files = FormFields::new().text("upload", "/etc/hostname");
        let err = MultipartBuilder::build(&PostBody::Raw("a=1".into()), &files).unwrap_err();
        assert!(matches!(err, NetError::NotSupported(_)));
    }

    #[test]
    fn test_empty_body() {
        let payload = MultipartBuilder::build(&PostBody::default(), &FormFields::new()).unwrap();
        assert_eq!(payload, PostPayload::Empty);
        let payload = MultipartBuilder::build(&PostBody::Raw(String::new()), &FormFields::new()).unwrap();
        assert_eq!(payload, PostPayload::Empty);
    }

    #[test]
    fn test_raw_body() {
        let payload = MultipartBuilder::build(&"{\"a\":1}".into(), &FormFields::new()).unwrap();
        assert_eq!(payload, PostPayload::Raw("{\"a\":1}".into()));
    }

    #[test]
    fn test_files_merged_into_multipart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::File::create(&path)
            .unwrap()
            .write_all(b"hello world")
            .unwrap();

        let body = PostBody::Fields(
            FormFields::new()
                .text("title", "notes")
                .nested("doc", FormFields::new().text("lang", "en")),
        );
        let files = FormFields::new().nested(
            "doc",
            FormFields::new().text("file", path.to_string_lossy()),
        );

        let payload = MultipartBuilder::build(&body, &files).unwrap();
        assert_eq!(payload.content_type(), Some(MULTIPART_FORM_DATA));

        let PostPayload::Multipart(form) = payload else {
            panic!("Expected Multipart");
        };
        let names: Vec<_> = form.parts().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["title", "doc[lang]", "doc[file]"]);

        let (_, part) = form.parts().nth(2).unwrap();
        match part {
            Part::File {
                path: abs,
                content_type,
                file_name,
            } => {
                assert!(abs.is_absolute());
                assert_eq!(content_type, "text/plain");
                assert_eq!(file_name, "notes.txt");
            }
            Part::Text(_) => panic!("Expected file part"),
        }
    }

    #[test]
    fn test_field_wins_over_file_on_conflict() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.bin");
        fs::write(&path, [0u8, 1, 2, 3]).unwrap();

        let body = PostBody::Fields(FormFields::new().text("a", "text"));
        let files = FormFields::new()
            .text("a", path.to_string_lossy())
            .text("b", path.to_string_lossy());

        let PostPayload::Multipart(form) = MultipartBuilder::build(&body, &files).unwrap() else {
            panic!("Expected Multipart");
        };
        let parts: Vec<_> = form.parts().collect();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].1, &Part::Text("text".into()));
        assert!(parts[1].1.is_file());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let files = FormFields::new().text("f", "/definitely/not/here.txt");
        let err = MultipartBuilder::build(&PostBody::default(), &files).unwrap_err();
        assert!(matches!(err, NetError::Io { .. }));
    }

    #[test]
    fn test_sniff_bytes() {
        assert_eq!(sniff_bytes(b"\x89PNG\r\n\x1a\n...."), "image/png");
        assert_eq!(sniff_bytes(b"%PDF-1.7"), "application/pdf");
        assert_eq!(sniff_bytes(b"  <!DOCTYPE html><html>"), "text/html");
        assert_eq!(sniff_bytes(b"plain words"), "text/plain");
        assert_eq!(sniff_bytes(&[0u8, 159, 146, 150]), FALLBACK_MIME);
    }

    #[test]
    fn test_sniff_text_split_at_read_limit() {
        let mut text = "a".repeat(511);
        text.push_str("\u{e9} more text");
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        file.write_all(text.as_bytes()).unwrap();

        assert_eq!(sniff_mime(file.path()).unwrap(), "text/plain");
        // A byte that can never start a sequence is still binary.
        assert_eq!(sniff_bytes(b"abc\xff"), FALLBACK_MIME);
    }

    #[test]
    fn test_form_from_iter() {
        let fields: FormFields = vec![("a", "1"), ("b", "2")].into_iter().collect();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("b"), Some(&FormValue::Text("2".into())));
    }
}
