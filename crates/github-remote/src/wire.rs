//! Request and response bodies of the GitHub REST API endpoints we use.

use serde::{Deserialize, Serialize};

/// `GET contents/{path}` on a file.
#[derive(Debug, Deserialize)]
pub struct FileContents {
    pub sha: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// One entry of `GET contents/{path}` on a directory.
#[derive(Debug, Deserialize)]
pub struct DirEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// The contents endpoint answers with an object for files and an array for
/// directories.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Contents {
    Dir(Vec<DirEntry>),
    File(FileContents),
}

#[derive(Debug, Serialize)]
pub struct PutContents<'a> {
    pub message: &'a str,
    pub content: String,
    pub branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub struct ShaOnly {
    pub sha: String,
}

/// Response of `PUT contents/{path}`.
#[derive(Debug, Deserialize)]
pub struct PutContentsResponse {
    pub content: ShaOnly,
    pub commit: ShaOnly,
}

#[derive(Debug, Serialize)]
pub struct DeleteContents<'a> {
    pub message: &'a str,
    pub sha: &'a str,
    pub branch: &'a str,
}

/// `GET git/ref/heads/{branch}`
#[derive(Debug, Deserialize)]
pub struct GitRef {
    pub object: ShaOnly,
}

/// `GET git/commits/{sha}`
#[derive(Debug, Deserialize)]
pub struct GitCommit {
    pub tree: ShaOnly,
}

/// `GET git/blobs/{sha}`
#[derive(Debug, Deserialize)]
pub struct GitBlob {
    pub content: String,
    #[serde(default)]
    pub encoding: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NewBlob<'a> {
    pub content: String,
    pub encoding: &'a str,
}

#[derive(Debug, Serialize)]
pub struct TreeEntry<'a> {
    pub path: &'a str,
    pub mode: &'a str,
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub sha: String,
}

#[derive(Debug, Serialize)]
pub struct NewTree<'a> {
    pub base_tree: &'a str,
    pub tree: Vec<TreeEntry<'a>>,
}

#[derive(Debug, Serialize)]
pub struct NewCommit<'a> {
    pub message: &'a str,
    pub tree: &'a str,
    pub parents: Vec<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct UpdateRef<'a> {
    pub sha: &'a str,
    pub force: bool,
}
