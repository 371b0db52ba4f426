//! Fixtures for tests
use crate::catalog::{Association, Dataset};
use crate::id::AssetID;
use crate::snapshot::DemandSnapshot;
use crate::units::Energy;
use rstest::fixture;

/// Assert that an error with the given message occurs
macro_rules! assert_error {
    ($result:expr, $msg:expr) => {
        assert_eq!(
            $result.unwrap_err().chain().next().unwrap().to_string(),
            $msg
        );
    };
}
pub(crate) use assert_error;

/// Build a dataset from `(asset, energy system, energy type, demand)` records and outputs.
///
/// Assets are registered in the order they first appear, followed by any extra asset names.
pub fn build_dataset(
    records: &[(&str, &str, &str, f64)],
    outputs: &[(&str, f64)],
    extra_assets: &[&str],
) -> Dataset {
    let mut dataset = Dataset::default();
    let names = records
        .iter()
        .map(|(asset, ..)| *asset)
        .chain(extra_assets.iter().copied());
    for name in names {
        dataset.assets.insert(AssetID::new(name));
    }

    for &(asset, system, energy_type, demand) in records {
        dataset.associations.push(Association {
            asset: Some(asset.into()),
            energy_system: Some(system.into()),
            energy_type: Some(energy_type.into()),
        });
        dataset
            .demand
            .entry(asset.into())
            .or_default()
            .insert(energy_type.into(), Energy(demand));
    }

    for &(asset, output) in outputs {
        dataset.output.insert(asset.into(), Energy(output));
    }

    dataset
}

#[fixture]
pub fn plant_dataset() -> Dataset {
    build_dataset(
        &[
            ("Boiler", "gas", "gas", 100.0),
            ("Plant", "electricity", "heating", 60.0),
            ("Plant", "electricity", "cooling", 40.0),
            ("Plant2", "electricity", "a", 10.0),
            ("Plant2", "electricity", "b", 90.0),
            ("Mixed", "electricity", "lighting", 30.0),
            ("Mixed", "district_heat", "space_heating", 70.0),
        ],
        &[("Plant", 50.0), ("Plant2", 50.0), ("Mixed", 45.0)],
        &["Empty"],
    )
}

#[fixture]
pub fn snapshot(plant_dataset: Dataset) -> DemandSnapshot {
    DemandSnapshot::new(plant_dataset)
}
