use super::settings::AppConfig;
use crate::placement::ranking::RankTarget;
use crate::placement::SortOrder;
use anyhow::Result;
use tracing::warn;

impl AppConfig {
    /// Validate configuration values are sane.
    pub(crate) fn validate(&self) -> Result<()> {
        anyhow::ensure!(self.port > 0, "Port must be > 0");
        anyhow::ensure!(
            self.storage_max_pct_used <= 100,
            "storage_max_pct_used must be between 0 and 100"
        );
        check_sort_order("host_sort_order", &self.host_sort_order, RankTarget::Host)?;
        check_sort_order("storage_sort_order", &self.storage_sort_order, RankTarget::Storage)?;
        Ok(())
    }
}

fn check_sort_order(key: &str, order: &SortOrder, target: RankTarget) -> Result<()> {
    anyhow::ensure!(!order.is_empty(), "{key} must name at least one criterion");

    let misplaced = order.misplaced(target);
    anyhow::ensure!(
        misplaced.is_empty(),
        "{key} contains criteria that do not apply here: {}",
        misplaced.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(",")
    );

    if order.random_shadows_later_criteria() {
        warn!(key, order = %order, "random is not last; criteria after it never break ties");
    }
    Ok(())
}
