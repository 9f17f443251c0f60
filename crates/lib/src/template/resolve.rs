//! Where template bodies come from.

use std::io;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, info};

/// Failure to obtain a template body.
#[derive(Debug, Error)]
pub enum ResolveError {
  #[error("template file not found: {}", path.display())]
  FileNotFound { path: PathBuf },

  #[error("failed to read template file {}: {source}", path.display())]
  ReadFile {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to fetch template from {url}: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to fetch template from {url}: HTTP {status}")]
  HttpStatus { url: String, status: u16 },

  #[error("invalid template locator '{0}'")]
  InvalidLocator(String),
}

impl ResolveError {
  /// Whether the source itself could not be reached, as opposed to a
  /// malformed locator.
  pub fn is_source_unavailable(&self) -> bool {
    !matches!(self, ResolveError::InvalidLocator(_))
  }
}

const LOCALFILE_SCHEME: &str = "localfile://";

/// A template location, one variant per kind of source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
  File(PathBuf),
  Inline(String),
  Url(String),
}

impl TemplateSource {
  /// Pick the source kind from a locator string.
  ///
  /// `http(s)://` is a URL, `file://`, `localfile://?<path>` or a bare path
  /// is a file, and an `inline:` prefix or a body starting with `{` is the
  /// template itself.
  pub fn parse(locator: &str) -> Result<Self, ResolveError> {
    let trimmed = locator.trim();
    if trimmed.is_empty() {
      return Err(ResolveError::InvalidLocator(locator.to_string()));
    }

    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
      return Ok(TemplateSource::Url(trimmed.to_string()));
    }
    if let Some(path) = trimmed.strip_prefix("file://") {
      return Ok(TemplateSource::File(PathBuf::from(path)));
    }
    if let Some(rest) = trimmed.strip_prefix(LOCALFILE_SCHEME) {
      // the path travels in the query: localfile://?config/web.json
      return match rest.strip_prefix('?') {
        Some(path) if !path.is_empty() => Ok(TemplateSource::File(PathBuf::from(path))),
        _ => Err(ResolveError::InvalidLocator(locator.to_string())),
      };
    }
    if let Some(body) = locator.strip_prefix("inline:") {
      return Ok(TemplateSource::Inline(body.to_string()));
    }
    if trimmed.starts_with('{') {
      return Ok(TemplateSource::Inline(locator.to_string()));
    }
    if trimmed.contains("://") {
      return Err(ResolveError::InvalidLocator(locator.to_string()));
    }

    Ok(TemplateSource::File(PathBuf::from(trimmed)))
  }

  /// Fetch the template body.
  pub async fn resolve(&self) -> Result<String, ResolveError> {
    match self {
      TemplateSource::Inline(body) => Ok(body.clone()),
      TemplateSource::File(path) => {
        debug!(path = %path.display(), "reading template");
        tokio::fs::read_to_string(path).await.map_err(|source| match source.kind() {
          io::ErrorKind::NotFound => ResolveError::FileNotFound { path: path.clone() },
          _ => ResolveError::ReadFile {
            path: path.clone(),
            source,
          },
        })
      }
      TemplateSource::Url(url) => {
        info!(url = %url, "fetching template");
        let response = reqwest::get(url).await.map_err(|source| ResolveError::Http {
          url: url.clone(),
          source,
        })?;

        if !response.status().is_success() {
          return Err(ResolveError::HttpStatus {
            url: url.clone(),
            status: response.status().as_u16(),
          });
        }

        response.text().await.map_err(|source| ResolveError::Http {
          url: url.clone(),
          source,
        })
      }
    }
  }
}

/// Parse and resolve in one step.
pub async fn resolve(locator: &str) -> Result<String, ResolveError> {
  TemplateSource::parse(locator)?.resolve().await
}

/// Resolve a parameter value. `localfile://?<path>` values are replaced by
/// the file's contents; anything else is taken literally.
pub async fn resolve_parameter(value: &str) -> Result<String, ResolveError> {
  if value.trim_start().starts_with(LOCALFILE_SCHEME) {
    resolve(value).await
  } else {
    Ok(value.to_string())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn parse_picks_source_kind() {
    assert_eq!(
      TemplateSource::parse("https://example.com/t.json").unwrap(),
      TemplateSource::Url("https://example.com/t.json".into())
    );
    assert_eq!(
      TemplateSource::parse("file:///tmp/t.yaml").unwrap(),
      TemplateSource::File(PathBuf::from("/tmp/t.yaml"))
    );
    assert_eq!(
      TemplateSource::parse("templates/web.yaml").unwrap(),
      TemplateSource::File(PathBuf::from("templates/web.yaml"))
    );
    assert_eq!(
      TemplateSource::parse(r#"{"foo":"bar"}"#).unwrap(),
      TemplateSource::Inline(r#"{"foo":"bar"}"#.into())
    );
    assert_eq!(
      TemplateSource::parse("localfile://?templates/web.yaml").unwrap(),
      TemplateSource::File(PathBuf::from("templates/web.yaml"))
    );
    assert_eq!(
      TemplateSource::parse("inline:Resources: {}").unwrap(),
      TemplateSource::Inline("Resources: {}".into())
    );
  }

  #[test]
  fn parse_rejects_empty_and_unknown_schemes() {
    assert!(matches!(
      TemplateSource::parse("  "),
      Err(ResolveError::InvalidLocator(_))
    ));
    let err = TemplateSource::parse("s3://bucket/t.json").unwrap_err();
    assert!(!err.is_source_unavailable());
    assert!(matches!(
      TemplateSource::parse("localfile://"),
      Err(ResolveError::InvalidLocator(_))
    ));
    assert!(matches!(
      TemplateSource::parse("localfile://?"),
      Err(ResolveError::InvalidLocator(_))
    ));
  }

  #[tokio::test]
  async fn localfile_reads_path_from_query() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("web.json");
    std::fs::write(&path, r#"{"foo":"bar"}"#).unwrap();

    let body = resolve(&format!("localfile://?{}", path.display())).await.unwrap();
    assert_eq!(body, r#"{"foo":"bar"}"#);

    let err = resolve(&format!("localfile://?{}", dir.path().join("missing.json").display()))
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::FileNotFound { .. }));
    assert!(err.is_source_unavailable());
  }

  #[tokio::test]
  async fn parameter_values_resolve_localfile_only() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db-password");
    std::fs::write(&path, "s3cret").unwrap();

    let value = resolve_parameter(&format!("localfile://?{}", path.display())).await.unwrap();
    assert_eq!(value, "s3cret");

    assert_eq!(resolve_parameter("prod").await.unwrap(), "prod");
    assert_eq!(
      resolve_parameter("https://example.com/not-fetched").await.unwrap(),
      "https://example.com/not-fetched"
    );
    assert_eq!(resolve_parameter("templates/web.yaml").await.unwrap(), "templates/web.yaml");

    let err = resolve_parameter(&format!("localfile://?{}", dir.path().join("nope").display()))
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::FileNotFound { .. }));
  }

  #[tokio::test]
  async fn reads_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("web.json");
    std::fs::write(&path, r#"{"foo":"bar"}"#).unwrap();

    let body = resolve(path.to_str().unwrap()).await.unwrap();
    assert_eq!(body, r#"{"foo":"bar"}"#);
  }

  #[tokio::test]
  async fn missing_file_is_source_unavailable() {
    let dir = TempDir::new().unwrap();
    let err = TemplateSource::File(dir.path().join("missing.json"))
      .resolve()
      .await
      .unwrap_err();
    assert!(matches!(err, ResolveError::FileNotFound { .. }));
    assert!(err.is_source_unavailable());
  }

  #[tokio::test]
  async fn fetches_url() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
      .mock("GET", "/web.json")
      .with_status(200)
      .with_body(r#"{"foo":"bar"}"#)
      .create_async()
      .await;

    let body = resolve(&format!("{}/web.json", server.url())).await.unwrap();
    assert_eq!(body, r#"{"foo":"bar"}"#);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn http_error_status_is_source_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server.mock("GET", "/gone.json").with_status(404).create_async().await;

    let err = resolve(&format!("{}/gone.json", server.url())).await.unwrap_err();
    assert!(matches!(err, ResolveError::HttpStatus { status: 404, .. }));
    assert!(err.is_source_unavailable());
  }
}
