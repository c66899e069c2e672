//! Prometheus counters exposed on `/metrics`.

use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::registry::Registry;

pub const CONTENT_TYPE: &str = "application/openmetrics-text; version=1.0.0; charset=utf-8";

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct StoreLabels {
    pub store: String,
}

pub struct Metrics {
    registry: Registry,
    generations: Family<OutcomeLabels, Counter>,
    saves: Family<StoreLabels, Counter>,
    deletes: Family<StoreLabels, Counter>,
    migrations: Family<OutcomeLabels, Counter>,
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::with_prefix("adcraft");
        let generations = Family::<OutcomeLabels, Counter>::default();
        let saves = Family::<StoreLabels, Counter>::default();
        let deletes = Family::<StoreLabels, Counter>::default();
        let migrations = Family::<OutcomeLabels, Counter>::default();

        registry.register("generations", "Ad generation requests by outcome", generations.clone());
        registry.register("saves", "Ad saves by record store", saves.clone());
        registry.register("deletes", "Ad deletes by record store", deletes.clone());
        registry.register("migrations", "Sign-in migrations by outcome", migrations.clone());

        Self {
            registry,
            generations,
            saves,
            deletes,
            migrations,
        }
    }

    pub fn generation(&self, outcome: &str) {
        self.generations
            .get_or_create(&OutcomeLabels { outcome: outcome.to_string() })
            .inc();
    }

    pub fn save(&self, store: &str) {
        self.saves.get_or_create(&StoreLabels { store: store.to_string() }).inc();
    }

    pub fn delete(&self, store: &str) {
        self.deletes.get_or_create(&StoreLabels { store: store.to_string() }).inc();
    }

    pub fn migration(&self, outcome: &str) {
        self.migrations
            .get_or_create(&OutcomeLabels { outcome: outcome.to_string() })
            .inc();
    }

    /// OpenMetrics text exposition.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buf = String::new();
        encode(&mut buf, &self.registry)?;
        Ok(buf)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
