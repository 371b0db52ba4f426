//! Code for loading the JSON catalog document and resolving identifiers to names.
//!
//! Tables are read as raw JSON and every record is decoded on its own, so a single malformed
//! record is logged and skipped rather than rejecting the whole document. Only problems with the
//! document's structure (missing tables, empty or inconsistent name lists) are fatal.
use super::input_err_msg;
use crate::catalog::{Association, Dataset, DemandTable, OutputTable};
use crate::id::{AssetID, EnergySystemID, EnergyTypeID};
use crate::units::Energy;
use anyhow::{Context, Result, bail, ensure};
use indexmap::map::Entry;
use indexmap::{IndexMap, IndexSet};
use log::{debug, error, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::value::RawValue;
use std::fs;
use std::path::Path;

/// The records of a single table, not yet decoded
type RawTable = Vec<Box<RawValue>>;

/// The top-level structure of the catalog document
#[derive(Debug, Deserialize)]
struct RawDocument {
    asset: Option<RawTable>,
    energy_system: Option<RawTable>,
    energy_type: Option<RawTable>,
    #[serde(default)]
    asset_energy_system: RawTable,
    asset_energy_demand: Option<RawTable>,
    #[serde(default)]
    asset_energy_output: RawTable,
}

/// An entry in one of the name lists (`asset`, `energy_system`, `energy_type`)
#[derive(Debug, Deserialize)]
struct NameRow {
    id: u64,
    name: String,
}

/// An entry in the `asset_energy_system` table
#[derive(Debug, Deserialize)]
struct AssociationRow {
    asset: Option<u64>,
    energy_system: Option<u64>,
    energy_type: Option<u64>,
}

/// An entry in the `asset_energy_demand` table.
///
/// The demand value is kept raw so that a record with a bad value still shadows the association
/// it belongs to.
#[derive(Debug, Deserialize)]
struct DemandRow {
    asset: u64,
    energy_type: u64,
    energy_demand: Option<Box<RawValue>>,
}

/// An entry in the `asset_energy_output` table
#[derive(Debug, Deserialize)]
struct OutputRow {
    asset: u64,
    energy_output: Option<Box<RawValue>>,
}

/// Parse a raw quantity, returning `None` if it is missing or not a finite number
fn parse_quantity(raw: Option<&RawValue>) -> Option<Energy> {
    let value: f64 = serde_json::from_str(raw?.get()).ok()?;
    value.is_finite().then_some(Energy(value))
}

/// Render a raw quantity for log messages
fn display_raw(raw: Option<&RawValue>) -> &str {
    raw.map_or("(missing)", RawValue::get)
}

/// Load the catalog document at `file_path` and resolve it into a [`Dataset`].
pub fn load_dataset(file_path: &Path) -> Result<Dataset> {
    let json = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let dataset = parse_dataset(&json).with_context(|| input_err_msg(file_path))?;
    debug!(
        "Loaded {} assets and {} association records from {}",
        dataset.assets.len(),
        dataset.associations.len(),
        file_path.display()
    );

    Ok(dataset)
}

/// Parse a catalog document from a JSON string and resolve it into a [`Dataset`].
pub fn parse_dataset(json: &str) -> Result<Dataset> {
    let document: RawDocument =
        serde_json::from_str(json).context("Catalog is not a valid JSON document")?;
    resolve_document(document)
}

/// Get a required table from the document
fn required_table(table: Option<RawTable>, name: &str) -> Result<RawTable> {
    table.with_context(|| format!("Missing required table '{name}'"))
}

/// Decode each record of a table, logging and skipping those which are malformed
fn decode_records<T: DeserializeOwned>(table: &str, values: &[Box<RawValue>]) -> Vec<T> {
    values
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| match serde_json::from_str(value.get()) {
            Ok(record) => Some(record),
            Err(err) => {
                warn!("Skipping malformed record {idx} in table '{table}': {err}");
                None
            }
        })
        .collect()
}

/// Build a map from identifier to name for one of the name lists, keeping the source order
fn read_names<ID: From<String>>(
    table: &str,
    values: &[Box<RawValue>],
) -> Result<IndexMap<u64, ID>> {
    let mut names: IndexMap<u64, ID> = IndexMap::new();
    for record in decode_records::<NameRow>(table, values) {
        match names.entry(record.id) {
            Entry::Vacant(entry) => {
                entry.insert(ID::from(record.name));
            }
            Entry::Occupied(_) => {
                bail!("Duplicate identifier {} in table '{table}'", record.id)
            }
        }
    }

    ensure!(
        !names.is_empty(),
        "Table '{table}' is empty, check the integrity of the input data"
    );

    Ok(names)
}

/// Resolve an optional identifier to a name, warning if it is unknown
fn resolve<ID: Clone>(
    names: &IndexMap<u64, ID>,
    id: Option<u64>,
    table: &str,
    idx: usize,
) -> Option<ID> {
    let id = id?;
    let name = names.get(&id).cloned();
    if name.is_none() {
        warn!("Record {idx} in table 'asset_energy_system' references unknown {table} {id}");
    }

    name
}

/// Resolve all identifiers in the document to names
fn resolve_document(document: RawDocument) -> Result<Dataset> {
    let asset_names: IndexMap<u64, AssetID> =
        read_names("asset", &required_table(document.asset, "asset")?)?;
    let system_names: IndexMap<u64, EnergySystemID> = read_names(
        "energy_system",
        &required_table(document.energy_system, "energy_system")?,
    )?;
    let type_names: IndexMap<u64, EnergyTypeID> = read_names(
        "energy_type",
        &required_table(document.energy_type, "energy_type")?,
    )?;
    let demand = required_table(document.asset_energy_demand, "asset_energy_demand")?;

    let mut assets = IndexSet::new();
    for id in asset_names.values() {
        ensure!(
            assets.insert(id.clone()),
            "Duplicate asset name '{id}', check the integrity of the input data"
        );
    }

    let associations =
        decode_records::<AssociationRow>("asset_energy_system", &document.asset_energy_system)
            .into_iter()
            .enumerate()
            .map(|(idx, record)| Association {
                asset: resolve(&asset_names, record.asset, "asset", idx),
                energy_system: resolve(&system_names, record.energy_system, "energy_system", idx),
                energy_type: resolve(&type_names, record.energy_type, "energy_type", idx),
            })
            .collect();

    Ok(Dataset {
        assets,
        associations,
        demand: read_demand(&demand, &asset_names, &type_names),
        output: read_output(&document.asset_energy_output, &asset_names),
    })
}

/// Read the `asset_energy_demand` table
fn read_demand(
    values: &[Box<RawValue>],
    asset_names: &IndexMap<u64, AssetID>,
    type_names: &IndexMap<u64, EnergyTypeID>,
) -> DemandTable {
    let mut table = DemandTable::new();
    for record in decode_records::<DemandRow>("asset_energy_demand", values) {
        let (Some(asset), Some(energy_type)) = (
            asset_names.get(&record.asset),
            type_names.get(&record.energy_type),
        ) else {
            warn!("Skipping demand record with unknown identifiers: {record:?}");
            continue;
        };

        // Invalid values are stored as NaN so that associations using them are rejected
        let raw = record.energy_demand.as_deref();
        let demand = parse_quantity(raw).unwrap_or_else(|| {
            warn!(
                "Demand value {} for asset {asset} and energy type {energy_type} is not a number",
                display_raw(raw)
            );
            Energy(f64::NAN)
        });

        let previous = table
            .entry(asset.clone())
            .or_default()
            .insert(energy_type.clone(), demand);
        if previous.is_some() {
            warn!(
                "Multiple demand records for asset {asset} and energy type {energy_type}; \
                using the last"
            );
        }
    }

    table
}

/// Read the `asset_energy_output` table
fn read_output(values: &[Box<RawValue>], asset_names: &IndexMap<u64, AssetID>) -> OutputTable {
    let mut table = OutputTable::new();
    for record in decode_records::<OutputRow>("asset_energy_output", values) {
        let Some(asset) = asset_names.get(&record.asset) else {
            warn!("Skipping output record with unknown asset: {record:?}");
            continue;
        };

        let raw = record.energy_output.as_deref();
        let Some(output) = parse_quantity(raw).filter(|output| output.is_valid_quantity()) else {
            error!("Invalid output value {} for asset {asset}", display_raw(raw));
            continue;
        };

        if table.insert(asset.clone(), output).is_some() {
            warn!("Multiple output records for asset {asset}; using the last");
        }
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use rstest::rstest;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    const DOCUMENT: &str = r#"{
        "asset": [{"id": 1, "name": "Plant"}, {"id": 2, "name": "Boiler"}],
        "energy_system": [{"id": 1, "name": "electricity"}, {"id": 2, "name": "gas"}],
        "energy_type": [{"id": 1, "name": "heating"}, {"id": 2, "name": "cooling"}],
        "asset_energy_system": [
            {"asset": 1, "energy_system": 1, "energy_type": 1},
            {"asset": 1, "energy_system": 1, "energy_type": 2},
            {"asset": 2, "energy_system": 2, "energy_type": 1}
        ],
        "asset_energy_demand": [
            {"asset": 1, "energy_type": 1, "energy_demand": 60},
            {"asset": 1, "energy_type": 2, "energy_demand": 40},
            {"asset": 2, "energy_type": 1, "energy_demand": 100}
        ],
        "asset_energy_output": [{"asset": 1, "energy_output": 50}]
    }"#;

    #[test]
    fn parse_dataset_ok() {
        let dataset = parse_dataset(DOCUMENT).unwrap();
        assert_eq!(
            dataset.assets.iter().collect::<Vec<_>>(),
            [&AssetID::new("Plant"), &AssetID::new("Boiler")]
        );
        assert_eq!(dataset.associations.len(), 3);
        assert_eq!(
            dataset.associations[2],
            Association {
                asset: Some("Boiler".into()),
                energy_system: Some("gas".into()),
                energy_type: Some("heating".into()),
            }
        );
        assert_eq!(dataset.demand["Plant"]["cooling"], Energy(40.0));
        assert_eq!(dataset.output["Plant"], Energy(50.0));
        assert!(!dataset.output.contains_key("Boiler"));
    }

    #[test]
    fn optional_tables_default_to_empty() {
        let dataset = parse_dataset(
            r#"{
                "asset": [{"id": 1, "name": "Plant"}],
                "energy_system": [{"id": 1, "name": "electricity"}],
                "energy_type": [{"id": 1, "name": "heating"}],
                "asset_energy_demand": []
            }"#,
        )
        .unwrap();
        assert!(dataset.associations.is_empty());
        assert!(dataset.output.is_empty());
    }

    #[test]
    fn missing_required_table() {
        assert_error!(
            parse_dataset(
                r#"{
                    "asset": [{"id": 1, "name": "Plant"}],
                    "energy_system": [{"id": 1, "name": "electricity"}],
                    "energy_type": [{"id": 1, "name": "heating"}]
                }"#
            ),
            "Missing required table 'asset_energy_demand'"
        );
        assert_error!(
            parse_dataset(r#"{"energy_system": [], "energy_type": [], "asset_energy_demand": []}"#),
            "Missing required table 'asset'"
        );
    }

    #[test]
    fn empty_name_list() {
        assert_error!(
            parse_dataset(
                r#"{
                    "asset": [{"id": 1, "name": "Plant"}],
                    "energy_system": [],
                    "energy_type": [{"id": 1, "name": "heating"}],
                    "asset_energy_demand": []
                }"#
            ),
            "Table 'energy_system' is empty, check the integrity of the input data"
        );
    }

    #[test]
    fn duplicate_identifier() {
        assert_error!(
            parse_dataset(
                r#"{
                    "asset": [{"id": 1, "name": "Plant"}, {"id": 1, "name": "Boiler"}],
                    "energy_system": [{"id": 1, "name": "electricity"}],
                    "energy_type": [{"id": 1, "name": "heating"}],
                    "asset_energy_demand": []
                }"#
            ),
            "Duplicate identifier 1 in table 'asset'"
        );
    }

    #[test]
    fn duplicate_asset_name() {
        assert_error!(
            parse_dataset(
                r#"{
                    "asset": [{"id": 1, "name": "Plant"}, {"id": 2, "name": "Plant"}],
                    "energy_system": [{"id": 1, "name": "electricity"}],
                    "energy_type": [{"id": 1, "name": "heating"}],
                    "asset_energy_demand": []
                }"#
            ),
            "Duplicate asset name 'Plant', check the integrity of the input data"
        );
    }

    #[test]
    fn malformed_records_are_skipped() {
        let dataset = parse_dataset(
            r#"{
                "asset": [{"id": 1, "name": "Plant"}, {"id": 2}],
                "energy_system": [{"id": 1, "name": "electricity"}],
                "energy_type": [{"id": 1, "name": "heating"}],
                "asset_energy_system": [
                    {"asset": 1, "energy_system": 1, "energy_type": 1},
                    {"asset": 1, "energy_type": 1},
                    {"asset": 1, "energy_system": 9, "energy_type": 1},
                    {"asset": "one", "energy_system": 1, "energy_type": 1}
                ],
                "asset_energy_demand": [
                    {"asset": 1, "energy_type": 1, "energy_demand": 60},
                    {"energy_type": 1, "energy_demand": 20},
                    {"asset": 7, "energy_type": 1, "energy_demand": 5}
                ],
                "asset_energy_output": [
                    {"asset": 1, "energy_output": -3},
                    {"asset": 7, "energy_output": 3},
                    {"asset": 1, "energy_output": 1e400},
                    {"asset": 1}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(dataset.assets.len(), 1);

        // Missing and unknown identifiers are left for the aggregator to skip
        assert_eq!(dataset.associations.len(), 3);
        assert_eq!(dataset.associations[1].energy_system, None);
        assert_eq!(dataset.associations[2].energy_system, None);

        assert_eq!(dataset.demand.len(), 1);
        assert_eq!(dataset.demand["Plant"].len(), 1);
        assert_eq!(dataset.demand["Plant"]["heating"], Energy(60.0));
        assert!(dataset.output.is_empty());
    }

    #[rstest]
    #[case(r#""lots""#)]
    #[case("null")]
    #[case("-1e400")]
    #[case("1e400")]
    fn invalid_demand_value_is_kept_as_invalid(#[case] value: &str) {
        let dataset = parse_dataset(&format!(
            r#"{{
                "asset": [{{"id": 1, "name": "Plant"}}],
                "energy_system": [{{"id": 1, "name": "electricity"}}],
                "energy_type": [{{"id": 1, "name": "heating"}}, {{"id": 2, "name": "cooling"}}],
                "asset_energy_demand": [
                    {{"asset": 1, "energy_type": 1, "energy_demand": 60}},
                    {{"asset": 1, "energy_type": 2, "energy_demand": {value}}}
                ]
            }}"#
        ))
        .unwrap();

        assert_eq!(dataset.demand["Plant"]["heating"], Energy(60.0));
        assert!(!dataset.demand["Plant"]["cooling"].is_valid_quantity());
    }

    #[test]
    fn missing_demand_value_is_kept_as_invalid() {
        let dataset = parse_dataset(
            r#"{
                "asset": [{"id": 1, "name": "Plant"}],
                "energy_system": [{"id": 1, "name": "electricity"}],
                "energy_type": [{"id": 1, "name": "heating"}],
                "asset_energy_demand": [{"asset": 1, "energy_type": 1}]
            }"#,
        )
        .unwrap();
        assert!(!dataset.demand["Plant"]["heating"].is_valid_quantity());
    }

    #[test]
    fn out_of_range_numbers_only_affect_their_record() {
        let dataset = parse_dataset(
            r#"{
                "asset": [{"id": 1, "name": "Plant"}, {"id": 2, "name": "Boiler"}],
                "energy_system": [{"id": 1, "name": "electricity"}],
                "energy_type": [{"id": 1, "name": "heating"}],
                "asset_energy_demand": [
                    {"asset": 1, "energy_type": 1, "energy_demand": 1e400},
                    {"asset": 2, "energy_type": 1, "energy_demand": 100}
                ],
                "asset_energy_output": [
                    {"asset": 1, "energy_output": 1e400},
                    {"asset": 2, "energy_output": 10}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(dataset.assets.len(), 2);
        assert_eq!(dataset.demand["Boiler"]["heating"], Energy(100.0));
        assert_eq!(dataset.output_for(&"Boiler".into()), Energy(10.0));
        assert!(!dataset.output.contains_key("Plant"));
    }

    #[test]
    fn duplicate_demand_uses_last() {
        let dataset = parse_dataset(
            r#"{
                "asset": [{"id": 1, "name": "Plant"}],
                "energy_system": [{"id": 1, "name": "electricity"}],
                "energy_type": [{"id": 1, "name": "heating"}],
                "asset_energy_demand": [
                    {"asset": 1, "energy_type": 1, "energy_demand": 60},
                    {"asset": 1, "energy_type": 1, "energy_demand": 80}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(dataset.demand["Plant"]["heating"], Energy(80.0));
    }

    #[test]
    fn invalid_json() {
        assert_error!(
            parse_dataset("{\"asset\": "),
            "Catalog is not a valid JSON document"
        );
        assert_error!(
            parse_dataset(r#"{"asset": {"id": 1}}"#),
            "Catalog is not a valid JSON document"
        );
    }

    #[test]
    fn load_dataset_from_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("catalog.json");
        {
            let mut file = File::create(&file_path).unwrap();
            write!(file, "{DOCUMENT}").unwrap();
        }

        let dataset = load_dataset(&file_path).unwrap();
        assert_eq!(dataset.assets.len(), 2);
    }

    #[test]
    fn load_dataset_missing_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("missing.json");
        assert_error!(load_dataset(&file_path), input_err_msg(&file_path));
    }
}
