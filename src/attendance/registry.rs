use crate::model::attendance::Geolocation;
use anyhow::Result;
use derive_more::Display;
use futures_util::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

/// Trust lookups hit this snapshot instead of the database. Admin edits on
/// this instance invalidate it; the TTL bounds staleness for edits made
/// elsewhere.
static REGISTRY_CACHE: Lazy<Cache<(), Arc<RegistrySnapshot>>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(1)
        .time_to_live(Duration::from_secs(60))
        .build()
});

/// Registry could not be loaded; callers treat this as transient and ask
/// the client to retry, never as a definitive trust verdict.
#[derive(Debug, Display)]
#[display(fmt = "office network registry unavailable")]
pub struct RegistryUnavailable;

#[derive(Debug, Clone)]
pub struct OfficeAnchor {
    pub ip: IpAddr,
    pub anchor: Option<Geolocation>,
}

/// Immutable view of the registered office networks, read-only to the
/// verification path.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    anchors: Vec<OfficeAnchor>,
}

impl RegistrySnapshot {
    pub fn new(anchors: Vec<OfficeAnchor>) -> Self {
        Self { anchors }
    }

    pub fn contains_ip(&self, ip: &IpAddr) -> bool {
        self.anchors.iter().any(|a| a.ip == *ip)
    }

    pub fn anchors(&self) -> impl Iterator<Item = &OfficeAnchor> {
        self.anchors.iter()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }
}

async fn load(pool: &MySqlPool) -> Result<RegistrySnapshot, sqlx::Error> {
    let mut stream = sqlx::query_as::<_, (String, Option<f64>, Option<f64>)>(
        r#"
        SELECT ip_address, anchor_lon, anchor_lat
        FROM office_networks
        "#,
    )
    .fetch(pool);

    let mut anchors = Vec::new();
    while let Some(row) = stream.next().await {
        let (ip_address, lon, lat) = row?;
        match ip_address.parse::<IpAddr>() {
            Ok(ip) => {
                let anchor = match (lon, lat) {
                    (Some(lon), Some(lat)) => {
                        let geo = Geolocation { lon, lat };
                        geo.is_valid().then_some(geo)
                    }
                    _ => None,
                };
                anchors.push(OfficeAnchor { ip, anchor });
            }
            Err(_) => {
                tracing::warn!(ip_address = %ip_address, "Skipping office network with unparseable IP");
            }
        }
    }

    Ok(RegistrySnapshot::new(anchors))
}

/// Cached snapshot of the registry, loading it on a miss.
pub async fn snapshot(pool: &MySqlPool) -> Result<Arc<RegistrySnapshot>, RegistryUnavailable> {
    if let Some(snap) = REGISTRY_CACHE.get(&()).await {
        return Ok(snap);
    }

    let snap = Arc::new(load(pool).await.map_err(|e| {
        tracing::error!(error = %e, "Failed to load office network registry");
        RegistryUnavailable
    })?);
    REGISTRY_CACHE.insert((), snap.clone()).await;
    Ok(snap)
}

/// Called after an admin registers or removes an office network.
pub async fn invalidate() {
    REGISTRY_CACHE.invalidate(&()).await;
}

/// Pre-populate the snapshot at startup so the first punch does not pay
/// the load cost.
pub async fn warmup_registry(pool: &MySqlPool) -> Result<()> {
    let snap = Arc::new(load(pool).await?);
    let offices = snap.len();
    REGISTRY_CACHE.insert((), snap).await;
    tracing::info!(offices, "Office network registry warmup complete");
    Ok(())
}
