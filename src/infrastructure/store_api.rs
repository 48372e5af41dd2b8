use crate::core::{AppResult, ResultExt};
use crate::infrastructure::providers::{EntitlementCatalog, StoreCatalog};
use serde_json::Value;
use std::time::Duration;

pub const DEFAULT_STEAM_STORE_API_URL: &str = "https://store.steampowered.com/api/appdetails";
pub const DEFAULT_EPIC_CATALOG_URL: &str = "https://graphql.epicgames.com/graphql";

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);
const PROGRAM_QUERY_ATTEMPTS: u32 = 3;
const DLC_QUERY_ATTEMPTS: u32 = 1;

const CATALOG_QUERY: &str = "\
query catalogQuery($namespace: String!) {\
 Catalog { catalogOffers(namespace: $namespace, params: { count: 1000 }) {\
 elements { id title productSlug developerDisplayName keyImages { type url } } } } }";

/// Parsed storefront answer for one app id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreAppDetails {
    pub name: String,
    pub header_image: Option<String>,
    pub publishers: Vec<String>,
    pub dlc_ids: Vec<String>,
}

/// One entitlement offer in a catalog namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entitlement {
    pub id: String,
    pub name: String,
    pub product_slug: Option<String>,
    pub icon_url: Option<String>,
    pub developer: Option<String>,
}

fn build_http_client() -> AppResult<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .timeout(HTTP_TIMEOUT)
        .build()
        .with_code("http_client_init_failed", "failed to build the HTTP client")
}

async fn fetch_json(
    request: impl Fn() -> reqwest::RequestBuilder,
    attempts: u32,
    query_label: &str,
) -> Option<Value> {
    for attempt in 1..=attempts {
        let outcome = async {
            request()
                .send()
                .await?
                .error_for_status()?
                .json::<Value>()
                .await
        }
        .await;
        match outcome {
            Ok(value) => return Some(value),
            Err(error) => {
                tracing::debug!(
                    event = "store_query_failed",
                    query = query_label,
                    attempt,
                    attempts,
                    error = error.to_string()
                );
                if attempt < attempts {
                    tokio::time::sleep(RETRY_BASE_DELAY * attempt).await;
                }
            }
        }
    }
    None
}

/// Direct Steam store `appdetails` client. The base URL is injectable so
/// tests and mirrors can point elsewhere.
#[derive(Debug, Clone)]
pub struct SteamStoreClient {
    http: reqwest::Client,
    base_url: String,
}

impl SteamStoreClient {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client()?,
            base_url: base_url.into(),
        })
    }

    fn parse_details(app_id: &str, body: &Value) -> Option<StoreAppDetails> {
        let envelope = body.get(app_id)?;
        if !envelope.get("success").and_then(Value::as_bool).unwrap_or(false) {
            return None;
        }
        let data = envelope.get("data")?;
        let name = data.get("name")?.as_str()?.to_string();
        let publishers = data
            .get("publishers")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let dlc_ids = data
            .get("dlc")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| match value {
                        Value::Number(number) => Some(number.to_string()),
                        Value::String(text) => Some(text.clone()),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Some(StoreAppDetails {
            name,
            header_image: data
                .get("header_image")
                .and_then(Value::as_str)
                .map(str::to_string),
            publishers,
            dlc_ids,
        })
    }
}

impl StoreCatalog for SteamStoreClient {
    async fn query_app(&self, app_id: &str, is_dlc: bool) -> Option<StoreAppDetails> {
        // A missing DLC page is routine, so DLC lookups get a single shot.
        let attempts = if is_dlc {
            DLC_QUERY_ATTEMPTS
        } else {
            PROGRAM_QUERY_ATTEMPTS
        };
        let url = format!("{}?appids={}&l=english", self.base_url, app_id);
        let body = fetch_json(|| self.http.get(&url), attempts, "steam_appdetails").await?;
        Self::parse_details(app_id, &body)
    }
}

/// GraphQL client for the entitlement catalog.
#[derive(Debug, Clone)]
pub struct EpicCatalogClient {
    http: reqwest::Client,
    base_url: String,
}

impl EpicCatalogClient {
    pub fn new(base_url: impl Into<String>) -> AppResult<Self> {
        Ok(Self {
            http: build_http_client()?,
            base_url: base_url.into(),
        })
    }

    fn image_url(element: &Value) -> Option<String> {
        let images = element.get("keyImages")?.as_array()?;
        let url_of = |wanted: &str| {
            images.iter().find_map(|image| {
                (image.get("type").and_then(Value::as_str) == Some(wanted))
                    .then(|| image.get("url").and_then(Value::as_str))
                    .flatten()
                    .map(str::to_string)
            })
        };
        url_of("Thumbnail")
            .or_else(|| url_of("OfferImageWide"))
            .or_else(|| images.iter().find_map(|image| {
                image.get("url").and_then(Value::as_str).map(str::to_string)
            }))
    }

    fn parse_elements(body: &Value) -> Vec<Entitlement> {
        let Some(elements) = body
            .pointer("/data/Catalog/catalogOffers/elements")
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };
        let mut entitlements = Vec::new();
        for element in elements {
            let (Some(id), Some(title)) = (
                element.get("id").and_then(Value::as_str),
                element.get("title").and_then(Value::as_str),
            ) else {
                continue;
            };
            entitlements.push(Entitlement {
                id: id.to_string(),
                name: title.to_string(),
                product_slug: element
                    .get("productSlug")
                    .and_then(Value::as_str)
                    .map(|slug| slug.trim_end_matches("/home").to_string()),
                icon_url: Self::image_url(element),
                developer: element
                    .get("developerDisplayName")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            });
        }
        entitlements
    }
}

impl EntitlementCatalog for EpicCatalogClient {
    async fn query_entitlements(&self, namespace: &str) -> Vec<Entitlement> {
        let payload = serde_json::json!({
            "query": CATALOG_QUERY,
            "variables": { "namespace": namespace },
        });
        let request = || self.http.post(&self.base_url).json(&payload);
        match fetch_json(request, PROGRAM_QUERY_ATTEMPTS, "epic_catalog").await {
            Some(body) => Self::parse_elements(&body),
            None => Vec::new(),
        }
    }
}
