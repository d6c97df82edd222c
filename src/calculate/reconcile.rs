//! Builds the key sets used to merge the transactional store into the
//! analytical one without double counting.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::models::{RecordClass, ReconciliationSet, TimeWindow};
use crate::storage::AnalyticalStore;

#[derive(Clone)]
pub struct ReconciliationSetBuilder {
    analytical: Arc<dyn AnalyticalStore>,
}

impl ReconciliationSetBuilder {
    pub fn new(analytical: Arc<dyn AnalyticalStore>) -> Self {
        Self { analytical }
    }

    /// Keys of `class` the analytical store already holds for `window`.
    ///
    /// When the key lookup fails the set is empty, so the transactional side
    /// is counted in full and may overlap the analytical totals. The failure
    /// is logged at warn level.
    pub async fn build(&self, window: &TimeWindow, class: RecordClass) -> ReconciliationSet {
        match self
            .analytical
            .query_distinct_correlation_keys(window, class)
            .await
        {
            Ok(keys) => {
                debug!(%class, keys = keys.len(), "Built reconciliation set");
                ReconciliationSet::new(class, keys)
            }
            Err(e) => {
                warn!(
                    %class,
                    from = %window.from(),
                    to = %window.to(),
                    error = %e,
                    "Reconciliation key lookup failed; transactional rows will not be deduplicated"
                );
                ReconciliationSet::empty(class)
            }
        }
    }
}
