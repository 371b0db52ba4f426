//! The precomputed, read-only state queried by reports.
//!
//! A [`DemandSnapshot`] is built once from a [`Dataset`]: demand is aggregated and every asset's
//! electricity demand is offset by its output up front. After construction nothing is mutated,
//! so a snapshot can be shared between any number of readers behind an `Arc`. Reloading data
//! means building a new snapshot and swapping the `Arc`.
use crate::catalog::Dataset;
use crate::demand::{
    CarrierSplitSummary, DemandRecord, FlatDemandView, ReducedSummary, collect_demand_records,
    flat_demand_view, summarise_demand,
};
use crate::id::AssetID;
use crate::reduction::reduce_summary;
use crate::report::{DemandReport, ReportError, build_report};
use indexmap::IndexMap;
use log::{debug, warn};
use std::collections::HashMap;
use unicase::UniCase;

/// Aggregated and offset demand for every asset in a dataset
#[derive(Debug)]
pub struct DemandSnapshot {
    dataset: Dataset,
    records: Vec<DemandRecord>,
    summaries: IndexMap<AssetID, CarrierSplitSummary>,
    reduced: IndexMap<AssetID, ReducedSummary>,
    names: HashMap<UniCase<String>, AssetID>,
}

/// Build a case-insensitive index of asset names.
///
/// If two names differ only by case, the first one wins.
fn build_name_index<'a, I>(assets: I) -> HashMap<UniCase<String>, AssetID>
where
    I: IntoIterator<Item = &'a AssetID>,
{
    let mut names = HashMap::new();
    for id in assets {
        let key = UniCase::new(id.to_string());
        if let Some(existing) = names.get(&key) {
            warn!("Asset name {id} clashes with {existing} when ignoring case; lookups will use {existing}");
            continue;
        }
        names.insert(key, id.clone());
    }

    names
}

impl DemandSnapshot {
    /// Aggregate demand and apply output offsets for every asset in `dataset`
    pub fn new(dataset: Dataset) -> Self {
        let records = collect_demand_records(&dataset);
        let summaries = summarise_demand(dataset.assets.iter(), &records);
        let reduced = summaries
            .iter()
            .map(|(id, summary)| {
                let reduced = reduce_summary(summary, dataset.output_for(id));
                debug!(
                    "Asset {id}: electricity demand {} reduced to {}",
                    summary.electricity_total(),
                    reduced.electricity_total()
                );
                (id.clone(), reduced)
            })
            .collect();
        let names = build_name_index(dataset.assets.iter());

        debug!(
            "Computed demand for {} assets from {} demand records",
            summaries.len(),
            records.len()
        );

        Self {
            dataset,
            records,
            summaries,
            reduced,
            names,
        }
    }

    /// The dataset the snapshot was built from
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Find the canonical name of an asset, ignoring case
    pub fn find_asset(&self, name: &str) -> Option<&AssetID> {
        self.names.get(&UniCase::new(name.to_string()))
    }

    /// The asset's demand split by carrier
    pub fn summary(&self, asset: &AssetID) -> Option<&CarrierSplitSummary> {
        self.summaries.get(asset)
    }

    /// The asset's demand after its output has been applied
    pub fn reduced_summary(&self, asset: &AssetID) -> Option<&ReducedSummary> {
        self.reduced.get(asset)
    }

    /// Iterate over the carrier-split and offset summaries of every asset
    pub fn iter_summaries(
        &self,
    ) -> impl Iterator<Item = (&AssetID, &CarrierSplitSummary, &ReducedSummary)> {
        self.summaries
            .iter()
            .zip(self.reduced.values())
            .map(|((id, summary), reduced)| (id, summary, reduced))
    }

    /// Demand for each of the asset's energy types, irrespective of carrier.
    ///
    /// This is derived on every call rather than stored.
    pub fn flat_demand_view(&self, asset: &AssetID) -> FlatDemandView {
        flat_demand_view(&self.records, asset)
    }

    /// Build the demand report for the named asset (case-insensitive)
    pub fn report(&self, name: &str) -> Result<DemandReport, ReportError> {
        build_report(self, name)
    }
}
