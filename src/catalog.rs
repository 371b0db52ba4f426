//! The normalised dataset produced by the catalog resolver.
//!
//! All identifiers have been resolved to names and every record has been decoded into a typed
//! struct, so the rest of the program never has to deal with the raw document.
use crate::id::{AssetID, EnergySystemID, EnergyTypeID};
use crate::units::Energy;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// The name of the energy system whose demand can be offset by an asset's output
pub const ELECTRICITY_SYSTEM_NAME: &str = "electricity";

/// A map of demand values, keyed by asset and then energy type
pub type DemandTable = IndexMap<AssetID, IndexMap<EnergyTypeID, Energy>>;

/// A map of asset outputs, keyed by asset
pub type OutputTable = HashMap<AssetID, Energy>;

/// Classification of an energy system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum Carrier {
    /// Demand supplied by electricity, which may be offset by output
    Electricity,
    /// Any other carrier (gas, oil, district heat, ...)
    Other,
}

impl Carrier {
    /// Classify an energy system by its name
    pub fn from_system(system: &EnergySystemID) -> Self {
        if system.as_str() == ELECTRICITY_SYSTEM_NAME {
            Carrier::Electricity
        } else {
            Carrier::Other
        }
    }
}

/// Links an asset to an energy system and energy type.
///
/// Fields are `None` where the source record referenced an unknown identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Association {
    /// The asset
    pub asset: Option<AssetID>,
    /// The energy system supplying the energy type
    pub energy_system: Option<EnergySystemID>,
    /// The energy type being consumed
    pub energy_type: Option<EnergyTypeID>,
}

/// The normalised dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// Canonical (case-preserving) names of all known assets, in source order
    pub assets: IndexSet<AssetID>,
    /// Asset/system/type association records, in source order
    pub associations: Vec<Association>,
    /// Demand for each asset and energy type
    pub demand: DemandTable,
    /// On-site output for each asset (absent means zero)
    pub output: OutputTable,
}

impl Dataset {
    /// Look up the recorded demand for an asset and energy type, treating absence as zero
    pub fn demand_for(&self, asset: &AssetID, energy_type: &EnergyTypeID) -> Energy {
        self.demand
            .get(asset)
            .and_then(|by_type| by_type.get(energy_type))
            .copied()
            .unwrap_or_default()
    }

    /// The output of an asset, treating absence as zero
    pub fn output_for(&self, asset: &AssetID) -> Energy {
        self.output.get(asset).copied().unwrap_or_default()
    }
}
