//! Upstream catalog HTTP client

use crate::catalog::models::{Movie, MovieResponse};
use crate::core::config::CatalogConfig;
use crate::core::error::{GatewayError, Result};
use reqwest::{header, Client, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use std::fmt;
use std::time::Duration;

const POPULARITY_DESC: &str = "popularity.desc";

/// Client for the TMDB v3 API
#[derive(Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_token: SecretString,
}

impl fmt::Debug for TmdbClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TmdbClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TmdbClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(|e| GatewayError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: SecretString::from(config.api_token.clone()),
        })
    }

    /// GET /trending/movie/week
    pub async fn trending(&self) -> Result<MovieResponse> {
        self.get("trending/movie/week", &[]).await
    }

    /// GET /movie/popular
    pub async fn popular(&self, page: u32) -> Result<MovieResponse> {
        self.get("movie/popular", &[("page", page.to_string())])
            .await
    }

    /// GET /search/movie
    pub async fn search(&self, query: &str) -> Result<MovieResponse> {
        if query.trim().is_empty() {
            return Err(GatewayError::ValidationError(
                "Query parameter is required".to_string(),
            ));
        }

        self.get("search/movie", &[("query", query.to_string())])
            .await
    }

    /// GET /discover/movie filtered by genre
    pub async fn discover(&self, genre: &str) -> Result<MovieResponse> {
        if genre.trim().is_empty() {
            return Err(GatewayError::ValidationError(
                "Genre parameter is required".to_string(),
            ));
        }

        self.get(
            "discover/movie",
            &[
                ("with_genres", genre.to_string()),
                ("sort_by", POPULARITY_DESC.to_string()),
            ],
        )
        .await
    }

    /// GET /movie/{id}
    pub async fn details(&self, id: u64) -> Result<Movie> {
        self.get(&format!("movie/{}", id), &[]).await
    }

    /// GET /discover/movie for one genre, paged
    pub async fn by_genre(&self, genre_id: u64, page: u32) -> Result<MovieResponse> {
        self.get(
            "discover/movie",
            &[
                ("with_genres", genre_id.to_string()),
                ("page", page.to_string()),
                ("sort_by", POPULARITY_DESC.to_string()),
            ],
        )
        .await
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, path);
        if params.is_empty() {
            Url::parse(&raw)
        } else {
            Url::parse_with_params(&raw, params)
        }
        .map_err(|e| GatewayError::ConfigError(format!("Invalid catalog URL {}: {}", raw, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        let url = self.url(path, params)?;
        tracing::debug!(path = %url.path(), "Catalog request");

        let res = self
            .client
            .get(url)
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", self.api_token.expose_secret()),
            )
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound(format!("Catalog resource {}", path)));
        }
        if !status.is_success() {
            tracing::warn!(path, status = %status, "Catalog returned an error status");
            return Err(GatewayError::Upstream(format!("{} returned {}", path, status)));
        }

        let body = res
            .bytes()
            .await
            .map_err(|e| GatewayError::NetworkError(e.to_string()))?;

        serde_json::from_slice(&body)
            .map_err(|e| GatewayError::Upstream(format!("Undecodable response from {}: {}", path, e)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::{
        extract::{Path, RawQuery},
        http::{HeaderMap, StatusCode as AxumStatus},
        response::IntoResponse,
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    pub(crate) const TEST_TOKEN: &str = "upstream-secret";

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", TEST_TOKEN))
            .unwrap_or(false)
    }

    /// Echo the received path and query back as the first result's title
    fn page_echo(headers: HeaderMap, path: &str, query: Option<String>) -> axum::response::Response {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        Json(json!({
            "page": 1,
            "total_results": 1,
            "results": [{
                "id": 1,
                "title": format!("{}?{}", path, query.unwrap_or_default()),
                "overview": "",
                "poster_path": "/p.jpg",
                "backdrop_path": null,
                "vote_average": 7.5,
                "release_date": "2020-01-01",
                "popularity": 12.0
            }]
        }))
        .into_response()
    }

    async fn movie(headers: HeaderMap, Path(id): Path<String>) -> axum::response::Response {
        if !authorized(&headers) {
            return AxumStatus::UNAUTHORIZED.into_response();
        }
        match id.as_str() {
            "404" => AxumStatus::NOT_FOUND.into_response(),
            "500" => AxumStatus::INTERNAL_SERVER_ERROR.into_response(),
            "999" => "not json".into_response(),
            _ => Json(json!({
                "id": id.parse::<i64>().unwrap_or(0),
                "title": "Detail",
                "runtime": 120,
                "tagline": "tag",
                "genres": [{"id": 28, "name": "Action"}],
                "budget": 1000
            }))
            .into_response(),
        }
    }

    /// Start a stand-in upstream on an ephemeral port and return its base URL
    pub(crate) async fn spawn_upstream() -> String {
        let app = Router::new()
            .route(
                "/3/trending/movie/week",
                get(|h: HeaderMap, RawQuery(q): RawQuery| async move {
                    page_echo(h, "trending", q)
                }),
            )
            .route(
                "/3/movie/popular",
                get(|h: HeaderMap, RawQuery(q): RawQuery| async move {
                    page_echo(h, "popular", q)
                }),
            )
            .route(
                "/3/search/movie",
                get(|h: HeaderMap, RawQuery(q): RawQuery| async move {
                    page_echo(h, "search", q)
                }),
            )
            .route(
                "/3/discover/movie",
                get(|h: HeaderMap, RawQuery(q): RawQuery| async move {
                    page_echo(h, "discover", q)
                }),
            )
            .route("/3/movie/:id", get(movie));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{}/3", addr)
    }

    pub(crate) fn config_for(base_url: &str) -> CatalogConfig {
        CatalogConfig {
            base_url: base_url.to_string(),
            api_token: TEST_TOKEN.to_string(),
            timeout: 5,
        }
    }

    async fn client() -> TmdbClient {
        TmdbClient::new(&config_for(&spawn_upstream().await)).unwrap()
    }

    #[tokio::test]
    async fn test_trending_sends_credential() {
        let page = client().await.trending().await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.results[0].title, "trending?");
        assert_eq!(page.results[0].poster_path.as_deref(), Some("/p.jpg"));
    }

    #[tokio::test]
    async fn test_wrong_credential_is_upstream_error() {
        let base = spawn_upstream().await;
        let mut config = config_for(&base);
        config.api_token = "wrong".to_string();

        let err = TmdbClient::new(&config).unwrap().trending().await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_query_parameters() {
        let client = client().await;

        let page = client.popular(3).await.unwrap();
        assert_eq!(page.results[0].title, "popular?page=3");

        let page = client.search("star wars & co").await.unwrap();
        assert_eq!(page.results[0].title, "search?query=star+wars+%26+co");

        let page = client.discover("28").await.unwrap();
        assert_eq!(
            page.results[0].title,
            "discover?with_genres=28&sort_by=popularity.desc"
        );

        let page = client.by_genre(35, 2).await.unwrap();
        assert_eq!(
            page.results[0].title,
            "discover?with_genres=35&page=2&sort_by=popularity.desc"
        );
    }

    #[tokio::test]
    async fn test_empty_search_and_genre_are_rejected_locally() {
        // Nothing listens here; a request would fail as NetworkError
        let client = TmdbClient::new(&config_for("http://127.0.0.1:9/3")).unwrap();

        let err = client.search("  ").await.unwrap_err();
        assert!(matches!(err, GatewayError::ValidationError(_)));
        let err = client.discover("").await.unwrap_err();
        assert!(matches!(err, GatewayError::ValidationError(_)));
    }

    #[tokio::test]
    async fn test_details() {
        let movie = client().await.details(603).await.unwrap();
        assert_eq!(movie.id, 603);
        assert_eq!(movie.runtime, Some(120));
        assert_eq!(movie.genres[0].name, "Action");
    }

    #[tokio::test]
    async fn test_upstream_status_mapping() {
        let client = client().await;

        let err = client.details(404).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));

        let err = client.details(500).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
        assert_eq!(err.status_code(), AxumStatus::BAD_GATEWAY);

        let err = client.details(999).await.unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(_)));
    }

    #[tokio::test]
    async fn test_unreachable_upstream_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = TmdbClient::new(&config_for(&format!("http://{}/3", addr))).unwrap();
        let err = client.trending().await.unwrap_err();
        assert!(matches!(err, GatewayError::NetworkError(_)));
        assert_eq!(err.status_code(), AxumStatus::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_debug_hides_token() {
        let client = TmdbClient::new(&config_for("http://127.0.0.1:9/3")).unwrap();
        assert!(!format!("{:?}", client).contains(TEST_TOKEN));
    }
}
