// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Repository and release calls made with installation tokens.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, CONTENT_LENGTH, LINK, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tether_cache::{keys, Cache, CacheExt};
use tether_common_core::{AppId, RepoSlug};
use tether_common_http::retry;
use tether_common_secret::SecretString;
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::GithubApiConfig;
use crate::error::ApiError;
use crate::policy::AuthRetryPolicy;
use crate::token::TokenSource;
use crate::types::{GitHubRelease, InstallationRepositories, Listing, Release};

const PER_PAGE: &str = "100";

/// GitHub operations the package engine needs.
#[async_trait]
pub trait RepositoryApi: Send + Sync {
	/// Repositories the App installation can read.
	async fn list_repositories(&self, app: &AppId) -> Result<Listing<RepoSlug>, ApiError>;

	/// Non-draft releases of `repo`, in the order GitHub returns them.
	async fn list_releases(&self, app: &AppId, repo: &RepoSlug)
		-> Result<Listing<Release>, ApiError>;

	/// The archive behind `release.download_url`.
	async fn download_asset(&self, app: &AppId, release: &Release) -> Result<Bytes, ApiError>;
}

#[derive(Serialize, Deserialize)]
struct BackoffMarker {
	until: DateTime<Utc>,
}

/// [`RepositoryApi`] over the GitHub REST API.
///
/// Every call runs under the per-call deadline, retries transient failures,
/// refreshes a rejected token once, and short-circuits while the App is
/// backing off from a rate limit.
pub struct RepositoryClient {
	http: Client,
	config: GithubApiConfig,
	tokens: Arc<dyn TokenSource>,
	cache: Arc<dyn Cache>,
	policy: AuthRetryPolicy,
}

impl RepositoryClient {
	pub fn new(
		http: Client,
		config: GithubApiConfig,
		tokens: Arc<dyn TokenSource>,
		cache: Arc<dyn Cache>,
	) -> Self {
		Self {
			http,
			config,
			tokens,
			cache,
			policy: AuthRetryPolicy::refresh_once(),
		}
	}

	fn check_backoff(&self, app: &AppId) -> Result<(), ApiError> {
		let Some(marker) = self
			.cache
			.get_as::<BackoffMarker>(&keys::backoff(app.as_str()))
		else {
			return Ok(());
		};

		match marker.until.signed_duration_since(Utc::now()).to_std() {
			Ok(remaining) if !remaining.is_zero() => {
				debug!(app_id = %app, remaining_secs = remaining.as_secs(), "Skipping call during backoff");
				Err(ApiError::Backoff { remaining })
			}
			_ => Ok(()),
		}
	}

	fn start_backoff(&self, app: &AppId, retry_after: Option<Duration>) {
		let window = retry_after
			.filter(|d| !d.is_zero())
			.unwrap_or(self.config.backoff);
		let until = Utc::now()
			+ chrono::Duration::from_std(window).unwrap_or_else(|_| chrono::Duration::seconds(60));

		warn!(app_id = %app, backoff_secs = window.as_secs(), "GitHub rate limit hit, backing off");
		self
			.cache
			.set_as(&keys::backoff(app.as_str()), &BackoffMarker { until }, window);
	}

	/// One logical API call: backoff check, deadline, transient retry and
	/// token refresh.
	async fn call<T, F, Fut>(&self, app: &AppId, deadline: Duration, op: F) -> Result<T, ApiError>
	where
		F: Fn(SecretString) -> Fut,
		Fut: Future<Output = Result<T, ApiError>>,
	{
		self.check_backoff(app)?;

		let attempts = retry(&self.config.retry_config, || {
			self.policy.run(self.tokens.as_ref(), app, &op)
		});

		let result = match tokio::time::timeout(deadline, attempts).await {
			Ok(result) => result,
			Err(_) => {
				error!(app_id = %app, deadline_ms = deadline.as_millis() as u64, "GitHub call timed out");
				Err(ApiError::Timeout)
			}
		};

		if let Err(ApiError::RateLimited { retry_after }) = &result {
			self.start_backoff(app, *retry_after);
		}

		result
	}

	fn authorized(&self, request: RequestBuilder, token: &SecretString) -> RequestBuilder {
		request
			.header("Authorization", format!("Bearer {}", token.expose()))
			.header("X-GitHub-Api-Version", "2022-11-28")
	}

	async fn fetch_page<R: DeserializeOwned>(
		&self,
		token: SecretString,
		url: Url,
	) -> Result<(R, Option<Url>), ApiError> {
		debug!(url = %url, "Fetching page");

		let response = self
			.authorized(self.http.get(url), &token)
			.header("Accept", "application/vnd.github+json")
			.timeout(self.config.request_timeout)
			.send()
			.await?;
		let response = check_status(response).await?;

		let next = match next_link(response.headers()) {
			Some(raw) => Some(self.validate_next(&raw)?),
			None => None,
		};

		let body = response.json::<R>().await.map_err(|e| {
			error!(error = %e, "Failed to parse GitHub response");
			ApiError::InvalidResponse(format!("JSON parse error: {e}"))
		})?;

		Ok((body, next))
	}

	fn validate_next(&self, raw: &str) -> Result<Url, ApiError> {
		let url = Url::parse(raw)
			.map_err(|e| ApiError::InvalidResponse(format!("Invalid next link '{raw}': {e}")))?;
		if !self.config.is_same_origin(&url) {
			error!(url = %url, "Refusing to follow a next link off the API host");
			return Err(ApiError::InvalidResponse(format!(
				"Next link points off the API host: {url}"
			)));
		}
		Ok(url)
	}

	/// Follow `Link: rel="next"` from `first` until exhausted or the listing
	/// cap is reached.
	async fn collect<R, T>(
		&self,
		app: &AppId,
		first: Url,
		extract: impl Fn(R) -> Vec<T>,
	) -> Result<Listing<T>, ApiError>
	where
		R: DeserializeOwned,
	{
		let cap = self.config.listing_cap.max(1);
		let mut items = Vec::new();
		let mut next = Some(first);
		let mut truncated = false;

		while let Some(url) = next.take() {
			let (page, link) = self
				.call(app, self.config.request_timeout, |token| {
					self.fetch_page::<R>(token, url.clone())
				})
				.await?;

			items.extend(extract(page));
			next = link;

			if items.len() > cap || (items.len() == cap && next.is_some()) {
				items.truncate(cap);
				truncated = true;
				warn!(app_id = %app, cap, "Listing truncated at the collection cap");
				break;
			}
		}

		Ok(Listing { items, truncated })
	}

	async fn fetch_archive(&self, token: SecretString, url: Url) -> Result<Bytes, ApiError> {
		let limit = self.config.max_download_bytes;

		let response = self
			.authorized(self.http.get(url), &token)
			.header("Accept", "application/octet-stream")
			.timeout(self.config.download_timeout)
			.send()
			.await?;
		let mut response = check_status(response).await?;

		let declared = response
			.headers()
			.get(CONTENT_LENGTH)
			.and_then(|v| v.to_str().ok())
			.and_then(|v| v.parse::<u64>().ok());
		if declared.is_some_and(|len| len > limit) {
			return Err(ApiError::TooLarge { limit });
		}

		let mut body = BytesMut::new();
		while let Some(chunk) = response.chunk().await? {
			if body.len() as u64 + chunk.len() as u64 > limit {
				return Err(ApiError::TooLarge { limit });
			}
			body.extend_from_slice(&chunk);
		}

		Ok(body.freeze())
	}

	fn paged(&self, path: &str) -> Result<Url, ApiError> {
		let mut url = self.config.endpoint(path)?;
		url.query_pairs_mut().append_pair("per_page", PER_PAGE);
		Ok(url)
	}
}

#[async_trait]
impl RepositoryApi for RepositoryClient {
	#[instrument(skip(self), fields(app_id = %app))]
	async fn list_repositories(&self, app: &AppId) -> Result<Listing<RepoSlug>, ApiError> {
		let first = self.paged("installation/repositories")?;

		let listing = self
			.collect(app, first, |page: InstallationRepositories| {
				page
					.repositories
					.into_iter()
					.filter_map(|repo| match RepoSlug::parse(&repo.full_name) {
						Ok(slug) => Some(slug),
						Err(e) => {
							warn!(full_name = %repo.full_name, error = %e, "Skipping unparsable repository name");
							None
						}
					})
					.collect()
			})
			.await?;

		info!(count = listing.items.len(), truncated = listing.truncated, "Listed installation repositories");
		Ok(listing)
	}

	#[instrument(skip(self), fields(app_id = %app, repo = %repo))]
	async fn list_releases(
		&self,
		app: &AppId,
		repo: &RepoSlug,
	) -> Result<Listing<Release>, ApiError> {
		let first = self.paged(&format!("repos/{}/{}/releases", repo.owner(), repo.name()))?;

		let listing = self
			.collect(app, first, |page: Vec<GitHubRelease>| {
				page.into_iter().filter_map(GitHubRelease::into_release).collect()
			})
			.await?;

		debug!(count = listing.items.len(), truncated = listing.truncated, "Listed releases");
		Ok(listing)
	}

	#[instrument(skip(self, release), fields(app_id = %app, tag = %release.tag_name))]
	async fn download_asset(&self, app: &AppId, release: &Release) -> Result<Bytes, ApiError> {
		let url = Url::parse(&release.download_url).map_err(|e| {
			ApiError::InvalidResponse(format!("Invalid download URL '{}': {e}", release.download_url))
		})?;
		if !self.config.is_same_origin(&url) {
			return Err(ApiError::InvalidResponse(format!(
				"Download URL points off the API host: {url}"
			)));
		}

		let bytes = self
			.call(app, self.config.download_timeout, |token| {
				self.fetch_archive(token, url.clone())
			})
			.await?;

		info!(bytes = bytes.len(), "Downloaded release archive");
		Ok(bytes)
	}
}

async fn check_status(response: Response) -> Result<Response, ApiError> {
	let status = response.status();
	if status.is_success() {
		return Ok(response);
	}

	let headers = response.headers().clone();
	let path = response.url().path().to_string();
	let body = response.text().await.unwrap_or_default();
	Err(map_github_error(status, &headers, &body, &path))
}

pub(crate) fn map_github_error(
	status: StatusCode,
	headers: &HeaderMap,
	body: &str,
	path: &str,
) -> ApiError {
	let status_code = status.as_u16();
	let exhausted = headers
		.get("x-ratelimit-remaining")
		.and_then(|v| v.to_str().ok())
		.is_some_and(|v| v.trim() == "0");

	match status_code {
		401 => {
			warn!(status = status_code, "Unauthorized request to GitHub");
			ApiError::Unauthorized
		}
		429 => {
			warn!(status = status_code, "GitHub rate limit exceeded");
			ApiError::RateLimited {
				retry_after: retry_after(headers),
			}
		}
		403 if exhausted || body.to_lowercase().contains("rate limit") => {
			warn!(status = status_code, "GitHub rate limit exceeded");
			ApiError::RateLimited {
				retry_after: retry_after(headers),
			}
		}
		403 => {
			warn!(status = status_code, "Forbidden request to GitHub");
			ApiError::Forbidden(github_message(body))
		}
		404 => ApiError::NotFound(path.to_string()),
		_ => {
			error!(status = status_code, body = %body, "GitHub API error");
			ApiError::Status {
				status: status_code,
				message: github_message(body),
			}
		}
	}
}

/// `Retry-After` seconds, else the distance to `x-ratelimit-reset`.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
	let seconds = headers
		.get(RETRY_AFTER)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse::<u64>().ok());
	if let Some(secs) = seconds {
		return Some(Duration::from_secs(secs));
	}

	let reset = headers
		.get("x-ratelimit-reset")
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.trim().parse::<i64>().ok())?;
	let remaining = reset - Utc::now().timestamp();
	(remaining > 0).then(|| Duration::from_secs(remaining as u64))
}

/// The `message` field of a GitHub error body, else the raw body.
fn github_message(body: &str) -> String {
	#[derive(Deserialize)]
	struct ErrorBody {
		message: String,
	}

	serde_json::from_str::<ErrorBody>(body)
		.map(|b| b.message)
		.unwrap_or_else(|_| body.to_string())
}

/// Target of the `rel="next"` entry in a `Link` header.
pub(crate) fn next_link(headers: &HeaderMap) -> Option<String> {
	let link = headers.get(LINK)?.to_str().ok()?;

	link.split(',').find_map(|entry| {
		let mut parts = entry.split(';');
		let target = parts.next()?.trim();
		let is_next = parts.any(|param| {
			let param = param.trim().replace(' ', "");
			param == "rel=\"next\"" || param == "rel=next"
		});
		if !is_next {
			return None;
		}
		target
			.strip_prefix('<')
			.and_then(|t| t.strip_suffix('>'))
			.map(str::to_string)
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{installed_app, Harness};
	use reqwest::header::HeaderValue;
	use serde_json::json;
	use tether_common_http::RetryConfig;
	use wiremock::matchers::{header, method, path, query_param};
	use wiremock::{Mock, ResponseTemplate};

	fn release_json(tag: &str, draft: bool) -> serde_json::Value {
		json!({
			"tag_name": tag,
			"name": tag,
			"html_url": format!("https://github.com/acme/widget/releases/tag/{tag}"),
			"draft": draft,
			"prerelease": false,
			"published_at": "2025-03-01T00:00:00Z",
			"zipball_url": format!("https://api.github.com/repos/acme/widget/zipball/{tag}"),
			"assets": []
		})
	}

	fn widget() -> RepoSlug {
		RepoSlug::parse("acme/widget").unwrap()
	}

	#[test]
	fn next_link_is_extracted_among_other_relations() {
		let mut headers = HeaderMap::new();
		headers.insert(
			LINK,
			HeaderValue::from_static(
				"<https://api.github.com/x?page=1>; rel=\"prev\", <https://api.github.com/x?page=3>; rel=\"next\", <https://api.github.com/x?page=9>; rel=\"last\"",
			),
		);
		assert_eq!(
			next_link(&headers).as_deref(),
			Some("https://api.github.com/x?page=3")
		);
	}

	#[test]
	fn last_page_has_no_next_link() {
		let mut headers = HeaderMap::new();
		headers.insert(
			LINK,
			HeaderValue::from_static("<https://api.github.com/x?page=1>; rel=\"first\""),
		);
		assert_eq!(next_link(&headers), None);
		assert_eq!(next_link(&HeaderMap::new()), None);
	}

	#[test]
	fn forbidden_with_exhausted_quota_is_a_rate_limit() {
		let mut headers = HeaderMap::new();
		headers.insert("x-ratelimit-remaining", HeaderValue::from_static("0"));
		headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));

		let err = map_github_error(StatusCode::FORBIDDEN, &headers, "{}", "/x");
		match err {
			ApiError::RateLimited { retry_after } => {
				assert_eq!(retry_after, Some(Duration::from_secs(30)))
			}
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[test]
	fn plain_forbidden_carries_the_github_message() {
		let err = map_github_error(
			StatusCode::FORBIDDEN,
			&HeaderMap::new(),
			r#"{"message":"Resource not accessible by integration"}"#,
			"/x",
		);
		assert!(
			matches!(err, ApiError::Forbidden(ref m) if m == "Resource not accessible by integration")
		);
	}

	#[test]
	fn secondary_rate_limit_message_is_detected() {
		let err = map_github_error(
			StatusCode::FORBIDDEN,
			&HeaderMap::new(),
			r#"{"message":"You have exceeded a secondary rate limit"}"#,
			"/x",
		);
		assert!(err.is_rate_limit());
	}

	#[tokio::test]
	async fn releases_follow_next_links_and_skip_drafts() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		let page_two = format!("{}/repos/acme/widget/releases?per_page=100&page=2", harness.server.uri());

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.and(query_param("page", "2"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([release_json("v1.0.0", false)])))
			.expect(1)
			.mount(&harness.server)
			.await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.and(header("Authorization", "Bearer ghs_test"))
			.respond_with(
				ResponseTemplate::new(200)
					.insert_header("Link", format!("<{page_two}>; rel=\"next\"").as_str())
					.set_body_json(json!([
						release_json("v3.0.0", true),
						release_json("v2.0.0", false),
					])),
			)
			.expect(1)
			.mount(&harness.server)
			.await;

		let listing = harness.client().list_releases(&app.id, &widget()).await.unwrap();
		let tags: Vec<_> = listing.items.iter().map(|r| r.tag_name.as_str()).collect();
		assert_eq!(tags, vec!["v2.0.0", "v1.0.0"]);
		assert!(!listing.truncated);
	}

	#[tokio::test]
	async fn listings_stop_at_the_cap() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		let page_two = format!("{}/repos/acme/widget/releases?per_page=100&page=2", harness.server.uri());
		let page_three = format!("{}/repos/acme/widget/releases?per_page=100&page=3", harness.server.uri());

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.and(query_param("page", "3"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([release_json("v1.0.0", false)])))
			.expect(0)
			.mount(&harness.server)
			.await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.and(query_param("page", "2"))
			.respond_with(
				ResponseTemplate::new(200)
					.insert_header("Link", format!("<{page_three}>; rel=\"next\"").as_str())
					.set_body_json(json!([release_json("v3.0.0", false), release_json("v2.0.0", false)])),
			)
			.mount(&harness.server)
			.await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.respond_with(
				ResponseTemplate::new(200)
					.insert_header("Link", format!("<{page_two}>; rel=\"next\"").as_str())
					.set_body_json(json!([release_json("v5.0.0", false), release_json("v4.0.0", false)])),
			)
			.mount(&harness.server)
			.await;

		let mut config = harness.config();
		config.listing_cap = 3;
		let listing = harness
			.client_with(config)
			.list_releases(&app.id, &widget())
			.await
			.unwrap();

		assert_eq!(listing.items.len(), 3);
		assert!(listing.truncated);
	}

	#[tokio::test]
	async fn next_links_off_the_api_host_are_refused() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.respond_with(
				ResponseTemplate::new(200)
					.insert_header("Link", "<https://evil.example.com/releases?page=2>; rel=\"next\"")
					.set_body_json(json!([release_json("v1.0.0", false)])),
			)
			.mount(&harness.server)
			.await;

		let err = harness
			.client()
			.list_releases(&app.id, &widget())
			.await
			.unwrap_err();
		assert!(matches!(err, ApiError::InvalidResponse(_)));
	}

	#[tokio::test]
	async fn repositories_are_normalized_slugs() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		Mock::given(method("GET"))
			.and(path("/installation/repositories"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({
				"total_count": 3,
				"repositories": [
					{ "full_name": "Acme/Widget" },
					{ "full_name": "acme/gadget" },
					{ "full_name": "not a repo" }
				]
			})))
			.mount(&harness.server)
			.await;

		let listing = harness.client().list_repositories(&app.id).await.unwrap();
		let slugs: Vec<_> = listing.items.iter().map(RepoSlug::as_str).collect();
		assert_eq!(slugs, vec!["acme/widget", "acme/gadget"]);
	}

	#[tokio::test]
	async fn rejected_token_is_refreshed_once() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;

		Mock::given(method("POST"))
			.and(path("/app/installations/42/access_tokens"))
			.respond_with(ResponseTemplate::new(201).set_body_json(crate::testing::token_body("ghs_test", 3600)))
			.expect(2)
			.mount(&harness.server)
			.await;

		Mock::given(method("GET"))
			.and(path("/installation/repositories"))
			.respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
			.up_to_n_times(1)
			.mount(&harness.server)
			.await;

		Mock::given(method("GET"))
			.and(path("/installation/repositories"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!({ "repositories": [] })))
			.mount(&harness.server)
			.await;

		let listing = harness.client().list_repositories(&app.id).await.unwrap();
		assert!(listing.items.is_empty());
	}

	#[tokio::test]
	async fn rate_limit_starts_a_backoff_window() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.respond_with(
				ResponseTemplate::new(429)
					.insert_header("Retry-After", "120")
					.set_body_string("slow down"),
			)
			.expect(1)
			.mount(&harness.server)
			.await;

		let client = harness.client();
		let first = client.list_releases(&app.id, &widget()).await.unwrap_err();
		assert!(matches!(first, ApiError::RateLimited { .. }));

		let second = client.list_releases(&app.id, &widget()).await.unwrap_err();
		match second {
			ApiError::Backoff { remaining } => assert!(remaining <= Duration::from_secs(120)),
			other => panic!("unexpected error: {other:?}"),
		}
	}

	#[tokio::test]
	async fn missing_repository_is_not_found() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.respond_with(ResponseTemplate::new(404).set_body_string(r#"{"message":"Not Found"}"#))
			.mount(&harness.server)
			.await;

		let err = harness
			.client()
			.list_releases(&app.id, &widget())
			.await
			.unwrap_err();
		assert!(matches!(err, ApiError::NotFound(_)));
	}

	#[tokio::test]
	async fn server_errors_are_retried() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.respond_with(ResponseTemplate::new(502))
			.up_to_n_times(1)
			.mount(&harness.server)
			.await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases"))
			.respond_with(ResponseTemplate::new(200).set_body_json(json!([release_json("v1.0.0", false)])))
			.mount(&harness.server)
			.await;

		let mut config = harness.config();
		config.retry_config = RetryConfig {
			max_attempts: 2,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(5),
			backoff_factor: 2.0,
			jitter: false,
		};

		let listing = harness
			.client_with(config)
			.list_releases(&app.id, &widget())
			.await
			.unwrap();
		assert_eq!(listing.items.len(), 1);
	}

	fn release_at(harness: &Harness, asset_path: &str) -> Release {
		Release {
			tag_name: "v1.0.0".to_string(),
			name: "1.0.0".to_string(),
			html_url: String::new(),
			download_url: format!("{}{asset_path}", harness.server.uri()),
			prerelease: false,
			published_at: None,
		}
	}

	#[tokio::test]
	async fn download_requests_octet_stream() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/releases/assets/9"))
			.and(header("Accept", "application/octet-stream"))
			.and(header("Authorization", "Bearer ghs_test"))
			.respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04archive".to_vec()))
			.mount(&harness.server)
			.await;

		let release = release_at(&harness, "/repos/acme/widget/releases/assets/9");
		let bytes = harness.client().download_asset(&app.id, &release).await.unwrap();
		assert_eq!(&bytes[..], b"PK\x03\x04archive");
	}

	#[tokio::test]
	async fn oversized_download_is_refused() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;
		harness.mount_token(42).await;

		Mock::given(method("GET"))
			.and(path("/repos/acme/widget/zipball/v1.0.0"))
			.respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
			.mount(&harness.server)
			.await;

		let mut config = harness.config();
		config.max_download_bytes = 16;
		let release = release_at(&harness, "/repos/acme/widget/zipball/v1.0.0");
		let err = harness
			.client_with(config)
			.download_asset(&app.id, &release)
			.await
			.unwrap_err();
		assert!(matches!(err, ApiError::TooLarge { limit: 16 }));
	}

	#[tokio::test]
	async fn downloads_off_the_api_host_are_refused() {
		let harness = Harness::start().await;
		let app = harness.save(installed_app(42)).await;

		let mut release = release_at(&harness, "/x");
		release.download_url = "https://evil.example.com/widget.zip".to_string();
		let err = harness
			.client()
			.download_asset(&app.id, &release)
			.await
			.unwrap_err();
		assert!(matches!(err, ApiError::InvalidResponse(_)));
	}
}
