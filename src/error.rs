use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// The inbound request carried no work item id. Nothing was sent remotely.
    #[error("No work_item_id provided")]
    MissingWorkItemId,

    #[error("invalid work item id '{0}'")]
    InvalidWorkItemId(String),

    /// The inbound request body could not be read as a request.
    #[error("invalid request body: {0}")]
    InvalidRequest(String),

    /// A remote call failed: network, auth, or a non-2xx answer.
    #[error("{}", transport_message(.status, .detail))]
    Transport { status: Option<u16>, detail: String },

    #[error("unexpected response shape: {0}")]
    Decode(String),

    #[error("failed to create test case '{title}' ({length} chars): {source}")]
    CreateTestCase {
        title: String,
        length: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("malformed tested-by relation url '{0}'")]
    MalformedRelation(String),

    #[error("completion failed: {0}")]
    Completion(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

fn transport_message(status: &Option<u16>, detail: &str) -> String {
    match status {
        Some(code) => format!("remote call failed with status {code}: {detail}"),
        None => format!("remote call failed: {detail}"),
    }
}

impl Error {
    pub fn transport(status: Option<u16>, detail: impl Into<String>) -> Self {
        Error::Transport {
            status,
            detail: detail.into(),
        }
    }

    /// HTTP-equivalent status for callers that answer a request with this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::MissingWorkItemId | Error::InvalidWorkItemId(_) | Error::InvalidRequest(_) => 400,
            Error::Transport {
                status: Some(code), ..
            } => *code,
            Error::CreateTestCase { source, .. } => source.status_code(),
            Error::Config(_) | Error::Io(_) => 500,
            _ => 502,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::MissingWorkItemId | Error::InvalidWorkItemId(_) | Error::InvalidRequest(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::transport(e.status().map(|s| s.as_u16()), e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creation_failure_reports_the_underlying_status() {
        let err = Error::CreateTestCase {
            title: "Valid login".into(),
            length: 11,
            source: Box::new(Error::transport(Some(401), "unauthorized")),
        };

        assert_eq!(err.status_code(), 401);
        assert!(err.to_string().contains("(11 chars)"));
        assert!(err.to_string().contains("status 401"));
    }

    #[test]
    fn missing_id_is_a_client_error() {
        assert!(Error::MissingWorkItemId.is_client_error());
        assert_eq!(Error::MissingWorkItemId.status_code(), 400);
        assert_eq!(Error::transport(None, "reset").status_code(), 502);
    }
}
