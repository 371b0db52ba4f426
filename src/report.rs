//! Building the demand report for a single asset.
use crate::demand::{CarrierSplitSummary, FlatDemandView, ReducedSummary};
use crate::id::{AssetID, EnergyTypeID};
use crate::snapshot::DemandSnapshot;
use crate::units::{Dimensionless, Energy};
use indexmap::IndexMap;
use log::{error, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt;

/// An asset's demand after its output has been applied.
///
/// NB: The order of fields is the order in which they are written out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemandReport {
    /// Canonical name of the asset
    pub name: AssetID,
    /// Demand for each energy type, with electricity demand offset by output
    pub energy_types: IndexMap<EnergyTypeID, Energy>,
    /// Total demand before the output is applied
    pub total_energy_demand: Energy,
    /// Percentage of total demand offset by the asset's output
    pub energy_output_reduction: Dimensionless,
}

/// The reasons a report could not be produced
#[derive(Debug, Clone, PartialEq)]
pub enum ReportError {
    /// No asset matches the requested name
    AssetNotFound(String),
    /// The asset exists but has no demand to report on
    ZeroDemand(AssetID),
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AssetNotFound(name) => write!(f, "Invalid asset name: {name}"),
            Self::ZeroDemand(asset) => {
                write!(f, "Total energy demand for asset '{asset}' cannot be 0")
            }
        }
    }
}

impl Error for ReportError {}

/// Merge the flat demand view with offset electricity demand.
///
/// Each energy type's electricity portion is replaced by its offset value; the rest of its
/// demand is kept as recorded.
pub fn merge_demand(
    flat: &FlatDemandView,
    original: &CarrierSplitSummary,
    reduced: &ReducedSummary,
) -> IndexMap<EnergyTypeID, Energy> {
    flat.iter()
        .map(|(energy_type, demand)| {
            let merged = match (
                original.electricity.get(energy_type),
                reduced.electricity.get(energy_type),
            ) {
                (Some(before), Some(after)) => *after + (*demand - *before),
                _ => *demand,
            };
            (energy_type.clone(), merged)
        })
        .collect()
}

/// Percentage of `pre_offset` demand removed to leave `post_offset`.
///
/// `pre_offset` must be non-zero.
pub fn offset_percentage(pre_offset: Energy, post_offset: Energy) -> Dimensionless {
    // Clamp to absorb rounding errors
    ((pre_offset - post_offset) / pre_offset * Dimensionless(100.0)).clamp(0.0, 100.0)
}

/// Build the demand report for the asset matching `name` (case-insensitive).
pub fn build_report(snapshot: &DemandSnapshot, name: &str) -> Result<DemandReport, ReportError> {
    let Some(asset) = snapshot.find_asset(name) else {
        warn!("No asset found matching name: {name}");
        return Err(ReportError::AssetNotFound(name.to_string()));
    };

    let flat = snapshot.flat_demand_view(asset);
    let total_energy_demand: Energy = flat.values().copied().sum();
    if total_energy_demand.is_zero() {
        error!("Total energy demand for asset '{asset}' is 0");
        return Err(ReportError::ZeroDemand(asset.clone()));
    }

    let empty = CarrierSplitSummary::default();
    let original = snapshot.summary(asset).unwrap_or(&empty);
    let reduced = snapshot.reduced_summary(asset).unwrap_or(original);

    Ok(DemandReport {
        name: asset.clone(),
        energy_types: merge_demand(&flat, original, reduced),
        total_energy_demand,
        energy_output_reduction: offset_percentage(total_energy_demand, reduced.total()),
    })
}
