use nearby_shared::{Coordinate, FilterState, ResultSet};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::config::DiscoveryConfig;
use crate::error::QueryError;

pub const NEARBY_PATH: &str = "/api/helpers-nearby";

/// Inputs of one nearby-helpers request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyQuery {
    pub coordinate: Coordinate,
    pub filter: FilterState,
}

/// A query paired with the sequence number it was issued under.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: NearbyQuery,
}

/// Monotonic numbering of issued queries. Only the latest issued sequence
/// may be applied, and at most once.
#[derive(Debug, Default)]
pub struct RequestSequence {
    issued: u64,
    applied: u64,
}

impl RequestSequence {
    pub fn issue(&mut self, query: NearbyQuery) -> FetchTicket {
        self.issued += 1;
        FetchTicket {
            seq: self.issued,
            query,
        }
    }

    pub fn latest(&self) -> u64 {
        self.issued
    }

    /// True while the latest ticket has been issued but not yet settled.
    pub fn is_pending(&self) -> bool {
        self.issued > self.applied
    }

    /// Marks `seq` settled if it is the latest outstanding ticket.
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq == self.issued && seq > self.applied {
            self.applied = seq;
            true
        } else {
            false
        }
    }
}

/// Build `GET {base}/api/helpers-nearby?lat=..&lng=..&radius=..[&category=..]`.
pub fn nearby_url(base: &str, query: &NearbyQuery) -> Result<Url, QueryError> {
    let mut url = Url::parse(&format!("{}{}", base.trim_end_matches('/'), NEARBY_PATH))?;
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("lat", &query.coordinate.lat.to_string())
            .append_pair("lng", &query.coordinate.lng.to_string())
            .append_pair("radius", &query.filter.radius().km().to_string());
        if let Some(category) = query.filter.category().query_value() {
            pairs.append_pair("category", category);
        }
    }
    Ok(url)
}

/// Client for the nearby-helpers endpoint. Results come back in backend
/// order and are never re-sorted here.
#[derive(Debug, Clone)]
pub struct HelperQueryService {
    client: Client,
    base: String,
    token: Option<String>,
}

impl HelperQueryService {
    pub fn new(config: &DiscoveryConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &DiscoveryConfig) -> Self {
        Self {
            client,
            base: config.api_base.clone(),
            token: config.bearer_token.clone(),
        }
    }

    pub async fn fetch_nearby(&self, query: &NearbyQuery) -> Result<ResultSet, QueryError> {
        let url = nearby_url(&self.base, query)?;
        debug!(%url, "fetching nearby helpers");

        let mut request = self.client.get(url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(QueryError::Transport)?;
        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "nearby helpers request rejected");
            return Err(QueryError::Status(status.as_u16()));
        }

        let helpers: ResultSet = response.json().await.map_err(QueryError::Decode)?;
        debug!(count = helpers.len(), "nearby helpers received");
        Ok(helpers)
    }
}
