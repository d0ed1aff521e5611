//! Static-asset publishing: the cover has to be reachable at a public
//! URL before the video service will accept it as a prompt image.
//!
//! Files are committed to a GitHub-backed site repository, a Netlify
//! build is triggered, and propagation is verified by polling the
//! public URL until it answers 200.

use std::path::Path;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use lofi_jobs::{wait_for, JobError, JobResult, PollOutcome, PollPolicy};

const AGENT: &str = "lofi-factory";

/// Configuration for the asset host.
#[derive(Debug, Clone)]
pub struct HostingConfig {
    pub github_token: String,
    /// `owner/repo` of the site repository.
    pub github_repo: String,
    pub github_branch: String,
    pub github_api_url: String,
    pub netlify_site_id: String,
    pub netlify_token: String,
    pub netlify_api_url: String,
    /// Public base URL the site serves from.
    pub site_url: String,
    pub timeout: Duration,
}

impl HostingConfig {
    pub fn from_env() -> JobResult<Self> {
        let github_token = std::env::var("GITHUB_TOKEN")
            .map_err(|_| JobError::submission("GITHUB_TOKEN not set"))?;
        let github_repo = std::env::var("GITHUB_REPO")
            .map_err(|_| JobError::submission("GITHUB_REPO not set"))?;
        let netlify_site_id = std::env::var("NETLIFY_SITE_ID")
            .map_err(|_| JobError::submission("NETLIFY_SITE_ID not set"))?;
        let netlify_token = std::env::var("NETLIFY_TOKEN")
            .map_err(|_| JobError::submission("NETLIFY_TOKEN not set"))?;
        let site_url =
            std::env::var("SITE_URL").map_err(|_| JobError::submission("SITE_URL not set"))?;

        Ok(Self {
            github_token,
            github_repo,
            github_branch: std::env::var("GITHUB_BRANCH").unwrap_or_else(|_| "main".to_string()),
            github_api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            netlify_site_id,
            netlify_token,
            netlify_api_url: std::env::var("NETLIFY_API_URL")
                .unwrap_or_else(|_| "https://api.netlify.com".to_string()),
            site_url,
            timeout: Duration::from_secs(30),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ExistingFile {
    sha: String,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildResponse {
    deploy_id: Option<String>,
}

/// GitHub + Netlify asset host.
pub struct AssetHost {
    http: Client,
    config: HostingConfig,
}

impl AssetHost {
    pub fn new(config: HostingConfig) -> JobResult<Self> {
        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn from_env() -> JobResult<Self> {
        Self::new(HostingConfig::from_env()?)
    }

    /// Commit a file into the site repository under `public/uploads/`.
    /// Re-uploads of the same filename update the existing blob.
    pub async fn upload(&self, path: &Path) -> JobResult<String> {
        if !path.is_file() {
            return Err(JobError::submission(format!(
                "upload input does not exist: {}",
                path.display()
            )));
        }
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| JobError::submission("upload input has no usable file name"))?
            .to_string();

        let content = BASE64.encode(tokio::fs::read(path).await?);
        let api_url = format!(
            "{}/repos/{}/contents/public/uploads/{}",
            self.config.github_api_url, self.config.github_repo, filename
        );

        // Existing files need their SHA for an update.
        let sha = match self
            .http
            .get(&api_url)
            .bearer_auth(&self.config.github_token)
            .header(USER_AGENT, AGENT)
            .send()
            .await
        {
            Ok(r) if r.status().is_success() => {
                let existing: ExistingFile = r.json().await?;
                debug!(filename, "asset already in repo, updating");
                Some(existing.sha)
            }
            _ => None,
        };

        let response = self
            .http
            .put(&api_url)
            .bearer_auth(&self.config.github_token)
            .header(USER_AGENT, AGENT)
            .json(&PutContents {
                message: "upload generated cover",
                content,
                branch: &self.config.github_branch,
                sha,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "asset upload returned {status}: {body}"
            )));
        }

        info!(filename, "asset committed to site repo");
        Ok(format!(
            "https://raw.githubusercontent.com/{}/{}/public/uploads/{}",
            self.config.github_repo, self.config.github_branch, filename
        ))
    }

    /// Kick off a site build so the new asset deploys.
    pub async fn trigger_build(&self) -> JobResult<String> {
        let url = format!(
            "{}/api/v1/sites/{}/builds",
            self.config.netlify_api_url, self.config.netlify_site_id
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.config.netlify_token)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(JobError::submission(format!(
                "build trigger returned {status}: {body}"
            )));
        }

        let body: BuildResponse = response.json().await?;
        body.deploy_id
            .ok_or_else(|| JobError::malformed("build response carried no deploy id"))
    }

    /// The URL the asset will serve from once the deploy propagates.
    pub fn public_url(&self, filename: &str) -> String {
        format!("{}/uploads/{}", self.config.site_url, filename)
    }

    /// Poll a public URL until it answers 200. Transport errors and
    /// non-200 codes both mean "not propagated yet", never failure.
    pub async fn wait_until_reachable(&self, url: &str, policy: &PollPolicy) -> JobResult<()> {
        wait_for(policy, "cdn_propagation", || async move {
            match self.http.get(url).send().await {
                Ok(r) if r.status().is_success() => Ok(PollOutcome::Ready(())),
                Ok(r) => {
                    debug!(url, status = %r.status(), "asset not reachable yet");
                    Ok(PollOutcome::Pending)
                }
                Err(e) => {
                    debug!(url, error = %e, "asset probe failed, still waiting");
                    Ok(PollOutcome::Pending)
                }
            }
        })
        .await
    }

    /// Full publish: commit, build, wait for propagation, return the
    /// public URL.
    pub async fn publish(&self, path: &Path, policy: &PollPolicy) -> JobResult<String> {
        self.upload(path).await?;
        let deploy_id = self.trigger_build().await?;
        debug!(deploy_id, "site build triggered");

        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| JobError::submission("upload input has no usable file name"))?;
        let public = self.public_url(filename);
        self.wait_until_reachable(&public, policy).await?;
        Ok(public)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path as url_path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> HostingConfig {
        HostingConfig {
            github_token: "gh-token".to_string(),
            github_repo: "lofifactory/site".to_string(),
            github_branch: "main".to_string(),
            github_api_url: server.uri(),
            netlify_site_id: "site-1".to_string(),
            netlify_token: "nl-token".to_string(),
            netlify_api_url: server.uri(),
            site_url: server.uri(),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_upload_new_file_returns_raw_url() {
        let server = MockServer::start().await;
        let api_path = "/repos/lofifactory/site/contents/public/uploads/cover.png";
        Mock::given(method("GET"))
            .and(url_path(api_path))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(url_path(api_path))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"content": {}})))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("cover.png");
        std::fs::write(&file, b"png bytes").unwrap();

        let host = AssetHost::new(config_for(&server)).unwrap();
        let url = host.upload(&file).await.unwrap();
        assert_eq!(
            url,
            "https://raw.githubusercontent.com/lofifactory/site/main/public/uploads/cover.png"
        );
    }

    #[tokio::test]
    async fn test_upload_missing_file_is_precondition_failure() {
        let server = MockServer::start().await;
        let host = AssetHost::new(config_for(&server)).unwrap();
        let result = host.upload(Path::new("/nope/cover.png")).await;
        assert!(matches!(result, Err(JobError::Submission(_))));
    }

    #[tokio::test]
    async fn test_wait_until_reachable_polls_through_404s() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/uploads/cover.png"))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(url_path("/uploads/cover.png"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let host = AssetHost::new(config_for(&server)).unwrap();
        let policy = PollPolicy::new(Duration::from_millis(1), 10);
        host.wait_until_reachable(&format!("{}/uploads/cover.png", server.uri()), &policy)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_until_reachable_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(url_path("/uploads/cover.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let host = AssetHost::new(config_for(&server)).unwrap();
        let policy = PollPolicy::new(Duration::from_millis(1), 3);
        let result = host
            .wait_until_reachable(&format!("{}/uploads/cover.png", server.uri()), &policy)
            .await;
        assert!(matches!(result, Err(JobError::Timeout { .. })));
    }
}
