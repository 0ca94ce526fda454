//! GitHubClient: RemoteRepository over the GitHub REST API.
//!
//! Single files go through the contents API. Batches use the Git data API
//! so that N files land in one commit:
//!
//! 1. `GET git/ref/heads/{branch}` for the head commit
//! 2. `GET git/commits/{head}` for its tree
//! 3. `POST git/blobs` once per file
//! 4. `POST git/trees` on top of the head tree
//! 5. `POST git/commits` with the head as parent
//! 6. `PATCH git/refs/heads/{branch}` without force
//!
//! The branch only moves in step 6, so a failure anywhere before it leaves
//! the repository untouched (apart from unreferenced blobs).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};

use sync_core::config::{RemoteTarget, SyncConfig};
use sync_core::remote::{
    DeleteOutcome, FileChange, RemoteEntry, RemoteError, RemoteFile, RemoteRepository, Result,
    WriteOutcome,
};

use crate::wire::{
    Contents, DeleteContents, GitBlob, GitCommit, GitRef, NewBlob, NewCommit, NewTree,
    PutContents, PutContentsResponse, ShaOnly, TreeEntry, UpdateRef,
};

const USER_AGENT: &str = concat!("jarvis-sync/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";
const FILE_MODE: &str = "100644";

pub struct GitHubClient {
    http: reqwest::Client,
    api_url: String,
    target: RemoteTarget,
}

impl GitHubClient {
    pub fn new(
        target: RemoteTarget,
        token: &str,
        api_url: &str,
        timeout: Duration,
    ) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| RemoteError::Request("token is not a valid header value".to_string()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("x-github-api-version", HeaderValue::from_static(API_VERSION));

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Request(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            target,
        })
    }

    /// Build a client from configuration. `None` when sync is not configured.
    pub fn from_config(config: &SyncConfig) -> Result<Option<Self>> {
        let (Some(target), Some(token)) = (config.target(), config.token.as_deref()) else {
            return Ok(None);
        };
        Self::new(target, token, &config.api_url, config.timeout).map(Some)
    }

    pub fn target(&self) -> &RemoteTarget {
        &self.target
    }

    fn repo_url(&self, rest: &str) -> String {
        let base = format!(
            "{}/repos/{}/{}",
            self.api_url,
            urlencoding::encode(&self.target.owner),
            urlencoding::encode(&self.target.repo)
        );
        if rest.is_empty() {
            base
        } else {
            format!("{}/{}", base, rest)
        }
    }

    fn contents_url(&self, path: &str) -> String {
        self.repo_url(&format!("contents/{}", encode_path(path)))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        debug!("{} {}", method, url);
        self.http.request(method, url)
    }

    /// Send a request. Transport failures become `Timeout`/`Request`.
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response> {
        request.send().await.map_err(|e| transport_error(path, e))
    }

    /// Send a request and decode a 2xx JSON body. Anything else is an error.
    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T> {
        let response = self.send(request, path).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, path, response).await);
        }
        decode_json(response, path).await
    }

    async fn read_blob(&self, path: &str, sha: &str) -> Result<String> {
        let url = self.repo_url(&format!("git/blobs/{}", sha));
        let blob: GitBlob = self.send_json(self.request(Method::GET, &url), path).await?;
        match blob.encoding.as_deref() {
            Some("base64") | None => decode_content(path, &blob.content),
            Some(_) => Ok(blob.content),
        }
    }

    fn branch_ref(&self) -> String {
        encode_path(&self.target.branch)
    }
}

#[async_trait]
impl RemoteRepository for GitHubClient {
    async fn read_file(&self, path: &str) -> Result<Option<RemoteFile>> {
        let url = self.contents_url(path);
        let request = self
            .request(Method::GET, &url)
            .query(&[("ref", self.target.branch.as_str())]);
        let response = self.send(request, path).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, path, response).await);
        }

        let file = match decode_json::<Contents>(response, path).await? {
            Contents::File(file) => file,
            Contents::Dir(_) => {
                return Err(RemoteError::Protocol {
                    path: path.to_string(),
                    message: "expected a file, found a directory".to_string(),
                });
            }
        };

        // Large files come back without inline content
        let content = match (file.content.as_deref(), file.encoding.as_deref()) {
            (Some(content), Some("base64")) if !content.is_empty() => decode_content(path, content)?,
            _ => self.read_blob(path, &file.sha).await?,
        };

        Ok(Some(RemoteFile {
            path: path.to_string(),
            content,
            sha: file.sha,
        }))
    }

    async fn list_directory(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let url = self.contents_url(path);
        let request = self
            .request(Method::GET, &url)
            .query(&[("ref", self.target.branch.as_str())]);
        let response = self.send(request, path).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(status_error(status, path, response).await);
        }

        match decode_json::<Contents>(response, path).await? {
            Contents::Dir(entries) => Ok(entries
                .into_iter()
                .map(|entry| RemoteEntry {
                    is_dir: entry.kind == "dir",
                    name: entry.name,
                })
                .collect()),
            Contents::File(_) => Err(RemoteError::Protocol {
                path: path.to_string(),
                message: "expected a directory, found a file".to_string(),
            }),
        }
    }

    async fn write_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
        expected_sha: Option<&str>,
    ) -> Result<WriteOutcome> {
        let body = PutContents {
            message,
            content: STANDARD.encode(content),
            branch: &self.target.branch,
            sha: expected_sha,
        };
        let request = self.request(Method::PUT, &self.contents_url(path)).json(&body);
        let response = self.send(request, path).await?;

        let status = response.status();
        if is_conflict(status) {
            return Err(RemoteError::Conflict {
                path: path.to_string(),
            });
        }
        if !status.is_success() {
            return Err(status_error(status, path, response).await);
        }

        let written: PutContentsResponse = decode_json(response, path).await?;
        Ok(WriteOutcome {
            sha: written.content.sha,
            commit_sha: written.commit.sha,
        })
    }

    async fn delete_file(&self, path: &str, sha: &str, message: &str) -> Result<DeleteOutcome> {
        let body = DeleteContents {
            message,
            sha,
            branch: &self.target.branch,
        };
        let request = self
            .request(Method::DELETE, &self.contents_url(path))
            .json(&body);
        let response = self.send(request, path).await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(DeleteOutcome::NotFound);
        }
        if is_conflict(status) {
            return Ok(DeleteOutcome::Conflict);
        }
        if !status.is_success() {
            return Err(status_error(status, path, response).await);
        }
        Ok(DeleteOutcome::Deleted)
    }

    async fn write_files_batch(&self, files: &[FileChange], message: &str) -> Result<String> {
        if files.is_empty() {
            return Err(RemoteError::InvalidBatch("no files to commit".to_string()));
        }

        let ref_path = format!("git/ref/heads/{}", self.branch_ref());
        let head: GitRef = self
            .send_json(self.request(Method::GET, &self.repo_url(&ref_path)), &ref_path)
            .await?;
        let head_sha = head.object.sha;

        let commit_path = format!("git/commits/{}", head_sha);
        let head_commit: GitCommit = self
            .send_json(self.request(Method::GET, &self.repo_url(&commit_path)), &commit_path)
            .await?;

        let blobs_url = self.repo_url("git/blobs");
        let mut tree = Vec::with_capacity(files.len());
        for file in files {
            let body = NewBlob {
                content: STANDARD.encode(&file.content),
                encoding: "base64",
            };
            let blob: ShaOnly = self
                .send_json(self.request(Method::POST, &blobs_url).json(&body), &file.path)
                .await?;
            tree.push(TreeEntry {
                path: &file.path,
                mode: FILE_MODE,
                kind: "blob",
                sha: blob.sha,
            });
        }

        let body = NewTree {
            base_tree: &head_commit.tree.sha,
            tree,
        };
        let new_tree: ShaOnly = self
            .send_json(
                self.request(Method::POST, &self.repo_url("git/trees")).json(&body),
                "git/trees",
            )
            .await?;

        let body = NewCommit {
            message,
            tree: &new_tree.sha,
            parents: vec![head_sha.as_str()],
        };
        let commit: ShaOnly = self
            .send_json(
                self.request(Method::POST, &self.repo_url("git/commits")).json(&body),
                "git/commits",
            )
            .await?;

        let refs_path = format!("git/refs/heads/{}", self.branch_ref());
        let body = UpdateRef {
            sha: &commit.sha,
            force: false,
        };
        let response = self
            .send(
                self.request(Method::PATCH, &self.repo_url(&refs_path)).json(&body),
                &refs_path,
            )
            .await?;
        let status = response.status();
        if is_conflict(status) {
            // Someone else moved the branch since step 1
            return Err(RemoteError::Conflict { path: refs_path });
        }
        if !status.is_success() {
            return Err(status_error(status, &refs_path, response).await);
        }

        info!(
            "Committed {} file(s) to {} as {}",
            files.len(),
            self.target,
            commit.sha
        );
        Ok(commit.sha)
    }

    async fn validate_access(&self) -> bool {
        let url = self.repo_url("");
        match self.request(Method::GET, &url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Access check against {} failed: {}", self.target, e);
                false
            }
        }
    }
}

/// Percent-encode each segment of a repository path.
pub fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn is_conflict(status: StatusCode) -> bool {
    status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY
}

fn transport_error(path: &str, e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout {
            path: path.to_string(),
        }
    } else {
        RemoteError::Request(e.to_string())
    }
}

async fn status_error(status: StatusCode, path: &str, response: Response) -> RemoteError {
    let message = response
        .text()
        .await
        .ok()
        .and_then(|body| {
            serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .or(Some(body))
        })
        .unwrap_or_default();
    RemoteError::Status {
        status: status.as_u16(),
        path: path.to_string(),
        message,
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response, path: &str) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| transport_error(path, e))?;
    serde_json::from_str(&body).map_err(|e| RemoteError::Protocol {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// Decode base64 file content. GitHub wraps it at 60 columns.
fn decode_content(path: &str, content: &str) -> Result<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact).map_err(|e| RemoteError::Protocol {
        path: path.to_string(),
        message: format!("invalid base64 content: {}", e),
    })?;
    String::from_utf8(bytes).map_err(|e| RemoteError::Protocol {
        path: path.to_string(),
        message: format!("content is not UTF-8: {}", e),
    })
}
