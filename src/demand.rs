//! Aggregation of raw demand records into per-asset summaries.
//!
//! Each association record links an asset to an energy system and an energy type. The demand for
//! that (asset, energy type) pair is looked up in the demand table and accumulated both into a
//! flat per-type view and into a summary split by carrier.
use crate::catalog::{Carrier, Dataset};
use crate::id::{AssetID, EnergyTypeID};
use crate::units::Energy;
use indexmap::IndexMap;
use log::{error, warn};

/// Demand for each energy type of an asset, irrespective of carrier
pub type FlatDemandView = IndexMap<EnergyTypeID, Energy>;

/// An asset's demand split by carrier.
///
/// Electricity demand is kept per energy type so that it can be offset by output; all other
/// demand is kept as a single total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarrierSplitSummary {
    /// Electricity demand, keyed by energy type
    pub electricity: IndexMap<EnergyTypeID, Energy>,
    /// Total demand for all other carriers
    pub non_electricity: Energy,
}

/// An asset's demand after electricity demand has been offset by its output
pub type ReducedSummary = CarrierSplitSummary;

impl CarrierSplitSummary {
    /// Total electricity demand
    pub fn electricity_total(&self) -> Energy {
        self.electricity.values().copied().sum()
    }

    /// Total demand across all carriers
    pub fn total(&self) -> Energy {
        self.electricity_total() + self.non_electricity
    }
}

/// A single association record which passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct DemandRecord {
    /// The asset the demand belongs to
    pub asset: AssetID,
    /// The energy type being consumed
    pub energy_type: EnergyTypeID,
    /// The carrier of the energy system supplying it
    pub carrier: Carrier,
    /// The demand looked up for this asset and energy type
    pub demand: Energy,
}

/// Validate the dataset's association records and attach demand values to them.
///
/// Records with a missing asset, energy system or energy type, or whose demand is not a valid
/// non-negative number, are logged and skipped.
pub fn collect_demand_records(dataset: &Dataset) -> Vec<DemandRecord> {
    let mut records = Vec::with_capacity(dataset.associations.len());
    for (idx, entry) in dataset.associations.iter().enumerate() {
        let (Some(asset), Some(energy_system), Some(energy_type)) =
            (&entry.asset, &entry.energy_system, &entry.energy_type)
        else {
            warn!("Skipping association record {idx} due to missing data: {entry:?}");
            continue;
        };

        let demand = dataset.demand_for(asset, energy_type);
        if !demand.is_valid_quantity() {
            error!("Invalid demand value {demand} for asset {asset} and energy type {energy_type}");
            continue;
        }

        records.push(DemandRecord {
            asset: asset.clone(),
            energy_type: energy_type.clone(),
            carrier: Carrier::from_system(energy_system),
            demand,
        });
    }

    records
}

/// Compute a [`CarrierSplitSummary`] for every known asset.
///
/// Assets without any demand records get an empty summary.
pub fn summarise_demand<'a, I>(
    assets: I,
    records: &[DemandRecord],
) -> IndexMap<AssetID, CarrierSplitSummary>
where
    I: IntoIterator<Item = &'a AssetID>,
{
    let mut summaries: IndexMap<_, _> = assets
        .into_iter()
        .map(|id| (id.clone(), CarrierSplitSummary::default()))
        .collect();

    for record in records {
        let Some(summary) = summaries.get_mut(&record.asset) else {
            warn!("Demand recorded for unknown asset {}", record.asset);
            continue;
        };

        match record.carrier {
            Carrier::Electricity => {
                *summary
                    .electricity
                    .entry(record.energy_type.clone())
                    .or_default() += record.demand;
            }
            Carrier::Other => summary.non_electricity += record.demand,
        }
    }

    summaries
}

/// Compute the flat demand view for a single asset.
///
/// Several energy systems may supply the same energy type, in which case their demand is
/// accumulated.
pub fn flat_demand_view(records: &[DemandRecord], asset: &AssetID) -> FlatDemandView {
    let mut view = FlatDemandView::new();
    for record in records.iter().filter(|record| &record.asset == asset) {
        *view.entry(record.energy_type.clone()).or_default() += record.demand;
    }

    view
}
