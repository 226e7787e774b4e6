//! Conversions from external infrastructure errors into domain errors.

use cmdbsync_domain::SyncError;
use reqwest::Error as HttpError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SyncError);

impl From<InfraError> for SyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SyncError> for InfraError {
    fn from(value: SyncError) -> Self {
        Self(value)
    }
}

/// Extension trait to make the conversion logic explicit in tests and within
/// this module.
trait IntoSyncError {
    fn into_sync(self) -> SyncError;
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl IntoSyncError for HttpError {
    fn into_sync(self) -> SyncError {
        if self.is_timeout() {
            return SyncError::Transport("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SyncError::Transport(format!("HTTP connection failure: {self}"));
        }

        if let Some(status) = self.status() {
            let code = status.as_u16();
            let message =
                format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

            return match code {
                429 => SyncError::RateLimited(message),
                404 => SyncError::NotFound(message),
                _ => SyncError::http(code, message),
            };
        }

        if self.is_decode() {
            return SyncError::Transport(format!("unreadable HTTP body: {self}"));
        }

        SyncError::Transport(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        Self(value.into_sync())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl IntoSyncError for std::io::Error {
    fn into_sync(self) -> SyncError {
        match self.kind() {
            std::io::ErrorKind::NotFound => SyncError::NotFound(self.to_string()),
            _ => SyncError::Io(self.to_string()),
        }
    }
}

impl From<std::io::Error> for InfraError {
    fn from(value: std::io::Error) -> Self {
        Self(value.into_sync())
    }
}

/* -------------------------------------------------------------------------- */
/* serde_json / toml / csv → SyncError */
/* -------------------------------------------------------------------------- */

impl IntoSyncError for serde_json::Error {
    fn into_sync(self) -> SyncError {
        if self.is_io() {
            SyncError::Io(self.to_string())
        } else {
            SyncError::Data(format!("invalid JSON: {self}"))
        }
    }
}

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        Self(value.into_sync())
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        Self(SyncError::Config(format!("invalid TOML: {value}")))
    }
}

impl IntoSyncError for csv::Error {
    fn into_sync(self) -> SyncError {
        match self.kind() {
            csv::ErrorKind::Io(_) => SyncError::Io(self.to_string()),
            _ => SyncError::Internal(format!("csv writer: {self}")),
        }
    }
}

impl From<csv::Error> for InfraError {
    fn from(value: csv::Error) -> Self {
        Self(value.into_sync())
    }
}

/// Shorthand for `map_err` sites: `.map_err(infra)?`.
pub fn infra<E>(err: E) -> SyncError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use reqwest::{Client, StatusCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn status_error(status: StatusCode) -> HttpError {
        let server = MockServer::start().await;
        Mock::given(method("GET")).respond_with(ResponseTemplate::new(status)).mount(&server).await;

        let client = Client::builder().no_proxy().build().unwrap();
        client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err()
    }

    #[tokio::test]
    async fn http_status_429_maps_to_rate_limited() {
        let mapped = infra(status_error(StatusCode::TOO_MANY_REQUESTS).await);
        assert!(mapped.is_rate_limited(), "got {mapped:?}");
    }

    #[tokio::test]
    async fn http_status_400_keeps_the_code() {
        match infra(status_error(StatusCode::BAD_REQUEST).await) {
            SyncError::Http { status, .. } => assert_eq!(status, 400),
            other => panic!("expected http error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(infra(err), SyncError::NotFound(_)));
    }

    #[test]
    fn malformed_json_is_a_data_fault() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(infra(err), SyncError::Data(msg) if msg.contains("invalid JSON")));
    }

    #[test]
    fn malformed_toml_is_a_config_fault() {
        let err = toml::from_str::<toml::Table>("= broken").unwrap_err();
        assert!(infra(err).is_fatal_at_startup());
    }
}
