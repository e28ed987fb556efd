use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::types::{FieldValue, Relation, RelationOp, WorkItem, WorkItemId};
use super::WorkItemStore;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://dev.azure.com";
const API_VERSION: &str = "7.0";
const JSON_PATCH: &str = "application/json-patch+json";

/// Organization and project a client is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectTarget {
    pub organization: String,
    pub project: String,
}

/// Blocking REST client for the work item tracking API of one project.
pub struct AzureDevOpsClient {
    client: Client,
    base: Url,
    target: ProjectTarget,
}

impl AzureDevOpsClient {
    pub fn new(personal_access_token: &str, target: ProjectTarget) -> Result<Self> {
        Self::with_base_url(personal_access_token, target, DEFAULT_BASE_URL)
    }

    /// For Azure DevOps Server installs that do not live under dev.azure.com.
    pub fn with_base_url(
        personal_access_token: &str,
        target: ProjectTarget,
        base_url: &str,
    ) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base url '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("base url '{base_url}' cannot hold a path")));
        }

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("devops-testgen"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut auth = HeaderValue::from_str(&basic_auth_value(personal_access_token))
            .map_err(|e| Error::Config(format!("personal access token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            base,
            target,
        })
    }

    fn wit_url(&self, tail: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend([
                    self.target.organization.as_str(),
                    self.target.project.as_str(),
                    "_apis",
                    "wit",
                ])
                .extend(tail);
        }
        url
    }

    fn api_url(&self, tail: &[&str]) -> Url {
        let mut url = self.wit_url(tail);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        url
    }

    fn item_url(&self, id: WorkItemId) -> Url {
        self.api_url(&["workitems", &id.to_string()])
    }

    fn send(&self, req: RequestBuilder) -> Result<Response> {
        let resp = req.send()?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().unwrap_or_default();
        Err(Error::transport(Some(status.as_u16()), body))
    }

    fn send_json(&self, req: RequestBuilder) -> Result<WorkItem> {
        self.send(req)?
            .json::<WorkItem>()
            .map_err(|e| Error::Decode(e.to_string()))
    }

    fn patch_document(&self, url: Url, ops: Vec<Value>) -> Result<WorkItem> {
        let body = serde_json::to_vec(&ops)?;
        self.send_json(
            self.client
                .patch(url)
                .header(CONTENT_TYPE, JSON_PATCH)
                .body(body),
        )
    }
}

impl WorkItemStore for AzureDevOpsClient {
    fn work_item_url(&self, id: WorkItemId) -> String {
        self.wit_url(&["workItems", &id.to_string()]).to_string()
    }

    fn fetch(&self, id: WorkItemId) -> Result<WorkItem> {
        debug!(id, project = %self.target.project, "fetching work item");
        self.send_json(self.client.get(self.item_url(id)))
    }

    fn fetch_with_relations(&self, id: WorkItemId) -> Result<WorkItem> {
        let mut url = self.item_url(id);
        url.query_pairs_mut().append_pair("$expand", "relations");
        debug!(id, project = %self.target.project, "fetching work item with relations");
        self.send_json(self.client.get(url))
    }

    fn create(
        &self,
        work_item_type: &str,
        fields: &[FieldValue],
        relations: &[Relation],
    ) -> Result<WorkItem> {
        let type_segment = format!("${work_item_type}");
        let url = self.api_url(&["workitems", &type_segment]);

        let ops = fields
            .iter()
            .map(FieldValue::to_patch)
            .chain(
                relations
                    .iter()
                    .map(|r| RelationOp::Add(r.clone()).to_patch()),
            )
            .collect::<Vec<_>>();

        let body = serde_json::to_vec(&ops)?;
        self.send_json(
            self.client
                .post(url)
                .header(CONTENT_TYPE, JSON_PATCH)
                .body(body),
        )
    }

    fn patch_fields(&self, id: WorkItemId, fields: &[FieldValue]) -> Result<WorkItem> {
        let ops = fields.iter().map(FieldValue::to_patch).collect();
        self.patch_document(self.item_url(id), ops)
    }

    fn patch_relations(&self, id: WorkItemId, ops: &[RelationOp]) -> Result<WorkItem> {
        let ops = ops.iter().map(RelationOp::to_patch).collect();
        self.patch_document(self.item_url(id), ops)
    }

    fn delete(&self, id: WorkItemId) -> Result<()> {
        self.send(self.client.delete(self.item_url(id)))?;
        Ok(())
    }
}

fn basic_auth_value(personal_access_token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!(":{personal_access_token}")))
}
