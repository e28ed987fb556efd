//! Inbound requests: the creation webhook payload and the delete payload,
//! and the handlers that turn them into pipeline runs.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{AzureDevOpsConfig, ProjectOverride, TestCaseConfig};
use crate::devops::{ProjectTarget, StoreProvider, WorkItemId};
use crate::error::{Error, Result};
use crate::llm::CompletionService;
use crate::testgen::{purge_linked_test_cases, unlink_all_tested_by, GenerationReport, TestCaseGenerator};

/// Ids arrive as numbers from service hooks and as strings from forms.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum RawId {
    Number(u64),
    Text(String),
}

impl RawId {
    fn resolve(raw: Option<&RawId>) -> Result<WorkItemId> {
        match raw {
            None | Some(RawId::Number(0)) => Err(Error::MissingWorkItemId),
            Some(RawId::Number(n)) => Ok(*n),
            Some(RawId::Text(s)) => {
                let s = s.trim();
                if s.is_empty() {
                    return Err(Error::MissingWorkItemId);
                }
                match s.parse::<WorkItemId>() {
                    Ok(0) => Err(Error::MissingWorkItemId),
                    Ok(id) => Ok(id),
                    Err(_) => Err(Error::InvalidWorkItemId(s.to_string())),
                }
            }
        }
    }
}

/// Parses a request body. A body that does not match the request shape is the
/// caller's fault, not an upstream failure.
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| Error::InvalidRequest(e.to_string()))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceRef {
    #[serde(default)]
    pub id: Option<RawId>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTestsRequest {
    #[serde(default)]
    pub resource: Option<ResourceRef>,
    #[serde(default)]
    pub azure_config: Option<ProjectOverride>,
    #[serde(default)]
    pub replace_existing: bool,
}

impl CreateTestsRequest {
    pub fn for_story(id: WorkItemId) -> Self {
        Self {
            resource: Some(ResourceRef {
                id: Some(RawId::Number(id)),
            }),
            ..Self::default()
        }
    }

    pub fn work_item_id(&self) -> Result<WorkItemId> {
        RawId::resolve(self.resource.as_ref().and_then(|r| r.id.as_ref()))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteTestsRequest {
    #[serde(default)]
    pub work_item_id: Option<RawId>,
    #[serde(default)]
    pub azure_config: Option<ProjectOverride>,
    /// Delete the linked test case items instead of only unlinking them.
    #[serde(default)]
    pub purge: bool,
}

impl DeleteTestsRequest {
    pub fn for_story(id: WorkItemId) -> Self {
        Self {
            work_item_id: Some(RawId::Number(id)),
            ..Self::default()
        }
    }

    pub fn work_item_id(&self) -> Result<WorkItemId> {
        RawId::resolve(self.work_item_id.as_ref())
    }
}

pub type CreateTestsResponse = GenerationReport;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteTestsResponse {
    pub message: String,
    pub deleted_count: usize,
    pub success: bool,
}

impl DeleteTestsResponse {
    pub fn from_count(deleted_count: usize) -> Self {
        let message = if deleted_count > 0 {
            "Test Cases Deleted Successfully"
        } else {
            "No Test Cases Found To Delete"
        };
        Self {
            message: message.to_string(),
            deleted_count,
            success: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub message: String,
    pub status: u16,
}

impl From<&Error> for ErrorResponse {
    fn from(e: &Error) -> Self {
        Self {
            message: e.to_string(),
            status: e.status_code(),
        }
    }
}

pub struct RequestHandler<'a> {
    azure: &'a AzureDevOpsConfig,
    stores: &'a dyn StoreProvider,
    llm: &'a dyn CompletionService,
    test_case: &'a TestCaseConfig,
}

impl<'a> RequestHandler<'a> {
    pub fn new(
        azure: &'a AzureDevOpsConfig,
        stores: &'a dyn StoreProvider,
        llm: &'a dyn CompletionService,
        test_case: &'a TestCaseConfig,
    ) -> Self {
        Self {
            azure,
            stores,
            llm,
            test_case,
        }
    }

    pub fn create_tests(&self, req: &CreateTestsRequest) -> Result<CreateTestsResponse> {
        let story_id = req.work_item_id()?;
        let target = self.resolve_target(req.azure_config.as_ref());
        let store = self.stores.open(target)?;

        TestCaseGenerator::new(store.as_ref(), self.llm, self.test_case.max_title_length)
            .replace_existing(req.replace_existing)
            .run(story_id)
    }

    pub fn delete_tests(&self, req: &DeleteTestsRequest) -> Result<DeleteTestsResponse> {
        let story_id = req.work_item_id()?;
        let target = self.resolve_target(req.azure_config.as_ref());
        let store = self.stores.open(target)?;

        let count = if req.purge {
            purge_linked_test_cases(store.as_ref(), story_id)?.len()
        } else {
            unlink_all_tested_by(store.as_ref(), story_id)?
        };

        Ok(DeleteTestsResponse::from_count(count))
    }

    fn resolve_target(&self, overrides: Option<&ProjectOverride>) -> ProjectTarget {
        let target = self.azure.target(overrides);
        match overrides {
            Some(_) => info!(
                organization = %target.organization,
                project = %target.project,
                "using per-request project"
            ),
            None => info!(project = %target.project, "using default project"),
        }
        target
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn create(body: serde_json::Value) -> CreateTestsRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn create_id_accepts_number_or_numeric_string() {
        assert_eq!(create(json!({ "resource": { "id": 42 } })).work_item_id().unwrap(), 42);
        assert_eq!(create(json!({ "resource": { "id": " 42 " } })).work_item_id().unwrap(), 42);
    }

    #[test]
    fn missing_or_empty_id_is_rejected() {
        for body in [
            json!({}),
            json!({ "resource": {} }),
            json!({ "resource": { "id": "" } }),
            json!({ "resource": { "id": 0 } }),
        ] {
            assert!(matches!(
                create(body).work_item_id(),
                Err(Error::MissingWorkItemId)
            ));
        }
    }

    #[test]
    fn non_numeric_id_is_invalid() {
        let err = create(json!({ "resource": { "id": "US-12" } }))
            .work_item_id()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidWorkItemId(ref s) if s == "US-12"));
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn malformed_body_is_a_client_error() {
        for body in [
            r#"{"resource":{"id":-1}}"#,
            r#"{"resource":{"id":12.5}}"#,
            r#"{"resource":"x"}"#,
            "not json",
        ] {
            let err = parse_body::<CreateTestsRequest>(body).unwrap_err();
            assert!(matches!(err, Error::InvalidRequest(_)), "{body}");
            assert_eq!(err.status_code(), 400);
            assert!(err.is_client_error());
        }

        let err = parse_body::<DeleteTestsRequest>(r#"{"work_item_id":-3}"#).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn well_formed_body_parses() {
        let req: CreateTestsRequest = parse_body(r#"{"resource":{"id":"42"}}"#).unwrap();
        assert_eq!(req.work_item_id().unwrap(), 42);
    }

    #[test]
    fn delete_request_parses_override_and_purge() {
        let req: DeleteTestsRequest = serde_json::from_value(json!({
            "work_item_id": "7",
            "azure_config": { "organization": "fabrikam" },
            "purge": true
        }))
        .unwrap();
        assert_eq!(req.work_item_id().unwrap(), 7);
        assert!(req.purge);
        let overrides = req.azure_config.unwrap();
        assert_eq!(overrides.organization.as_deref(), Some("fabrikam"));
        assert_eq!(overrides.project, None);
    }

    #[test]
    fn delete_messages() {
        assert_eq!(
            DeleteTestsResponse::from_count(2).message,
            "Test Cases Deleted Successfully"
        );
        let none = DeleteTestsResponse::from_count(0);
        assert_eq!(none.message, "No Test Cases Found To Delete");
        assert!(none.success);
    }

    #[test]
    fn error_response_carries_status() {
        let body = ErrorResponse::from(&Error::MissingWorkItemId);
        assert_eq!(body.status, 400);
        assert_eq!(body.message, "No work_item_id provided");
    }
}
