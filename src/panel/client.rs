use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value as JsonValue};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::PanelBackendConfig;
use crate::panel::error::{PanelError, PanelResult};
use crate::panel::types::{
    ApiErrors, ApiList, ApiObject, EggAttributes, PanelUser, ServerAttributes, UserAttributes,
};

/// The container image every provisioned server runs on. The configured egg
/// must offer it or provisioning is refused before anything is created.
const NODEJS_IMAGE: &str = "ghcr.io/parkervcp/yolks:nodejs_20";

/// Client for one Pterodactyl application API backend.
///
/// Constructed once per panel kind; base URL and bearer credential are fixed
/// at construction.
pub struct PanelClient {
    http: Client,
    config: PanelBackendConfig,
    timeout: Duration,
    max_retries: u32,
}

impl PanelClient {
    pub fn new(
        config: PanelBackendConfig,
        timeout_secs: u64,
        max_retries: u32,
    ) -> PanelResult<Self> {
        let timeout = Duration::from_secs(timeout_secs);
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PanelError::Network {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            http,
            config,
            timeout,
            max_retries,
        })
    }

    /// Base URL customers log into; also what credentials emails link to.
    pub fn panel_url(&self) -> &str {
        &self.config.domain
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/application{}",
            self.config.domain.trim_end_matches('/'),
            path
        )
    }

    async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> PanelResult<T> {
        let text = self.request_text(method, path, body).await?;
        serde_json::from_str::<T>(&text).map_err(|e| PanelError::Provider {
            message: format!("invalid panel JSON response: {}", e),
            status: None,
            retryable: false,
        })
    }

    async fn request_text(
        &self,
        method: Method,
        path: &str,
        body: Option<&JsonValue>,
    ) -> PanelResult<String> {
        let url = self.endpoint(path);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .timeout(self.timeout)
                .bearer_auth(&self.config.api_key)
                .header("Accept", "application/json");
            if let Some(payload) = body {
                request = request.json(payload);
            }

            let response = request.send().await.map_err(|e| PanelError::Network {
                message: format!("panel request failed: {}", e),
            });

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    let text = resp.text().await.unwrap_or_default();
                    if status.is_success() {
                        return Ok(text);
                    }

                    if (status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error())
                        && attempt < self.max_retries
                    {
                        warn!(
                            status = %status,
                            attempt = attempt + 1,
                            "panel API error, retrying"
                        );
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }

                    let detail = serde_json::from_str::<ApiErrors>(&text)
                        .ok()
                        .and_then(|e| e.errors.into_iter().next())
                        .map(|e| e.detail)
                        .unwrap_or_else(|| format!("HTTP {}: {}", status, text));

                    return Err(PanelError::Provider {
                        message: detail,
                        status: Some(status.as_u16()),
                        retryable: status.is_server_error(),
                    });
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                        continue;
                    }
                }
            }
        }

        Err(last_error.unwrap_or(PanelError::Network {
            message: "panel request failed".to_string(),
        }))
    }

    /// Create a panel user. Returns the provider's user id.
    ///
    /// "Username already taken" comes back as a Provider error with the
    /// panel's detail string; callers pre-check availability via
    /// [`PanelClient::list_users`] rather than retrying on it.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> PanelResult<u64> {
        let payload = json!({
            "username": username,
            "email": email,
            "first_name": username,
            "last_name": "User",
            "password": password,
        });

        let user: ApiObject<UserAttributes> = self
            .request_json(Method::POST, "/users", Some(&payload))
            .await?;

        info!(user_id = user.attributes.id, username = %username, "panel user created");
        Ok(user.attributes.id)
    }

    /// Create a server for an existing user with the given resource limits.
    ///
    /// Resolves the configured egg first; a missing startup command or a
    /// missing Node.js image is a configuration error and nothing is created.
    pub async fn add_server(
        &self,
        user_id: u64,
        name: &str,
        memory_mb: u32,
        disk_mb: u32,
        cpu_percent: u32,
    ) -> PanelResult<u64> {
        let egg_id: u64 = self
            .config
            .egg
            .parse()
            .map_err(|_| PanelError::Config {
                message: format!("egg id '{}' is not numeric", self.config.egg),
            })?;
        let location_id: u64 = self
            .config
            .location
            .parse()
            .map_err(|_| PanelError::Config {
                message: format!("location id '{}' is not numeric", self.config.location),
            })?;

        let egg_path = format!("/nests/{}/eggs/{}", self.config.nest, self.config.egg);
        let egg: ApiObject<EggAttributes> =
            self.request_json(Method::GET, &egg_path, None).await?;
        let (startup, docker_image) = resolve_egg_runtime(&egg.attributes)?;

        let payload = json!({
            "name": name,
            "description": "",
            "user": user_id,
            "egg": egg_id,
            "docker_image": docker_image,
            "startup": startup,
            "environment": {
                "GIT_ADDRESS": "",
                "BRANCH": "",
                "USERNAME": "",
                "ACCESS_TOKEN": "",
                "CMD_RUN": "npm start",
                "AUTO_UPDATE": "0",
                "NODE_PACKAGES": "",
                "UNNODE_PACKAGES": "",
                "CUSTOM_ENVIRONMENT_VARIABLES": "",
                "USER_UPLOAD": "true",
            },
            "limits": {
                "memory": memory_mb,
                "swap": 0,
                "disk": disk_mb,
                "io": 500,
                "cpu": cpu_percent,
            },
            "feature_limits": {
                "databases": 5,
                "backups": 5,
                "allocations": 1,
            },
            "deploy": {
                "locations": [location_id],
                "dedicated_ip": false,
                "port_range": [],
            },
        });

        let server: ApiObject<ServerAttributes> = self
            .request_json(Method::POST, "/servers", Some(&payload))
            .await?;

        info!(
            server_id = server.attributes.id,
            user_id = user_id,
            memory_mb = memory_mb,
            "panel server created"
        );
        Ok(server.attributes.id)
    }

    /// List all users on this backend.
    ///
    /// Transport and parse failures propagate; an error here never means
    /// "no users".
    pub async fn list_users(&self) -> PanelResult<Vec<PanelUser>> {
        let users: ApiList<UserAttributes> = self.request_json(Method::GET, "/users", None).await?;

        Ok(users
            .data
            .into_iter()
            .map(|u| PanelUser {
                id: u.attributes.id,
                username: u.attributes.username,
                email: u.attributes.email,
            })
            .collect())
    }

    /// Best-effort delete of a user (rollback primitive).
    pub async fn delete_user(&self, user_id: u64) -> PanelResult<()> {
        self.request_text(Method::DELETE, &format!("/users/{}", user_id), None)
            .await?;
        info!(user_id = user_id, "panel user deleted");
        Ok(())
    }

    /// Best-effort delete of a server (rollback primitive).
    pub async fn delete_server(&self, server_id: u64) -> PanelResult<()> {
        self.request_text(Method::DELETE, &format!("/servers/{}", server_id), None)
            .await?;
        info!(server_id = server_id, "panel server deleted");
        Ok(())
    }
}

/// Pick the startup command and required container image off an egg.
fn resolve_egg_runtime(egg: &EggAttributes) -> PanelResult<(String, String)> {
    let startup = egg
        .startup
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| PanelError::Config {
            message: "egg startup command is undefined".to_string(),
        })?;

    let image = egg
        .docker_images
        .get(NODEJS_IMAGE)
        .ok_or_else(|| PanelError::Config {
            message: format!("docker image '{}' not offered by this egg", NODEJS_IMAGE),
        })?;

    Ok((startup.to_string(), image.clone()))
}
