use crate::Error;
use crate::StreamProvider;
use crate::StreamResult;
use crate::VideoSource;
use async_trait::async_trait;
use tracing::debug;
use url::Url;

pub(crate) const USER_AGENT_VALUE: &str = concat!("anistream/", env!("CARGO_PKG_VERSION"));

/// The body of a `/stream/{id}/{episode}` response
#[derive(Debug, serde::Deserialize)]
struct StreamResponse {
    #[serde(default)]
    sources: Vec<VideoSource>,
}

/// A client for a streaming provider.
///
/// A provider may be reachable through several hosts (a main host plus mirrors).
/// They are tried in order until one has sources.
#[derive(Debug, Clone)]
pub struct Client {
    /// The inner http client
    pub client: reqwest::Client,

    hosts: Vec<Url>,
}

impl Client {
    /// Make a new client for a provider at `host`.
    pub fn new(host: Url) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT_VALUE)
            .build()
            .unwrap_or_default();
        Self::with_client(client, host)
    }

    /// Make a new client from an existing http client.
    pub fn with_client(client: reqwest::Client, host: Url) -> Self {
        Self {
            client,
            hosts: vec![host],
        }
    }

    /// Add a mirror host, tried after the ones already added.
    pub fn with_mirror(mut self, host: Url) -> Self {
        self.hosts.push(host);
        self
    }

    /// The hosts, in the order they are tried
    pub fn hosts(&self) -> &[Url] {
        &self.hosts
    }

    /// Get the sources for an episode from a single host.
    pub async fn get_streams_from(
        &self,
        host: &Url,
        id: &str,
        episode: u32,
    ) -> Result<StreamResult, Error> {
        let mut url = host.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(host.clone()))?
            .pop_if_empty()
            .extend(["stream", id, episode.to_string().as_str()]);

        debug!("GET \"{url}\"");
        let response: StreamResponse = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(StreamResult::from_sources(response.sources))
    }
}

#[async_trait]
impl StreamProvider for Client {
    async fn get_streams(&self, id: &str, episode: u32) -> Result<StreamResult, Error> {
        let mut last_error = Error::EmptySources;
        for host in self.hosts.iter() {
            match self.get_streams_from(host, id, episode).await {
                Ok(result) if result.is_hit() => return Ok(result),
                Ok(_) => {
                    debug!("host \"{host}\" has no sources for \"{id}\" episode {episode}");
                    last_error = Error::EmptySources;
                }
                Err(error) => {
                    debug!("host \"{host}\" failed for \"{id}\" episode {episode}: {error}");
                    last_error = error;
                }
            }
        }

        Err(last_error)
    }
}
