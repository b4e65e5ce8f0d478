//! The shipped example configuration drives a full reshape of a CSV export.

use std::fs;
use std::path::PathBuf;

use hrb_cli::config::BridgeConfig;
use hrb_ingest::{read_csv_records, write_data_values};
use hrb_model::DimensionKind;
use hrb_transform::{FactReshaper, ValuePolicy};

fn example_config() -> BridgeConfig {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../config/health-bridge.example.toml");
    BridgeConfig::load(&path).unwrap()
}

#[test]
fn example_config_carries_the_ahd_tables() {
    let config = example_config();
    let resolver = config.lookups.resolver().unwrap();

    assert_eq!(
        resolver.resolve(DimensionKind::OrgUnit, "Maula_prison"),
        Ok("sPwxCzvUtia")
    );
    assert_eq!(
        resolver.resolve(DimensionKind::CategoryOptionCombo, "Children(0-4yrs)"),
        Ok("PgdmyzcFluv")
    );

    let aggregate = config.aggregate().unwrap();
    assert_eq!(aggregate.element_columns.len(), 25);
    assert_eq!(aggregate.derived.len(), 7);
    assert_eq!(aggregate.value_policy, ValuePolicy::StrictlyPositive);
    for column in &aggregate.element_columns {
        assert!(
            resolver.resolve(DimensionKind::DataElement, column).is_ok(),
            "{column} has no data element"
        );
    }

    assert_eq!(config.migration.settings.attribute_types.len(), 15);
    assert_eq!(config.migration.settings.identifier_types["npid"], 3);
}

#[test]
fn csv_export_reshapes_into_submittable_values() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("ahd.csv");
    fs::write(
        &input,
        "Reporting_year,Reporting_month,Facility,AHD_eligible_category,CD4_tests,CD4<200,LAM_tests,LAM+\n\
         2025,January,KCH_OPD1,New_HIV_pos,10,4,3,3\n\
         2025,January,Nowhere,New_HIV_pos,1,1,,\n",
    )
    .unwrap();

    let config = example_config();
    let resolver = config.lookups.resolver().unwrap();
    let aggregate = config.aggregate().unwrap();
    let reshape_config = aggregate.reshape_config();
    let reshaper = FactReshaper::new(&reshape_config, &resolver).unwrap();

    let records = read_csv_records(&input).unwrap();
    let reshaped = reshaper.reshape_all(&records);
    assert_eq!(reshaped.diagnostics.len(), 1);
    assert_eq!(reshaped.diagnostics[0].row, Some(1));

    // CD4<200, CD4 >= 200, LAM+ and the zero LAM Neg
    assert_eq!(reshaped.facts.len(), 4);
    let checked = aggregate.value_policy.apply(&reshaped.facts);
    assert_eq!(checked.values.len(), 3);
    assert_eq!(checked.diagnostics.len(), 1);
    assert!(checked.values.iter().all(|value| value.period.to_string() == "202501"));
    assert!(
        checked
            .values
            .iter()
            .any(|value| value.data_element == "YvFoTQA3IPM" && value.value == 6)
    );

    let output = dir.path().join("values.csv");
    write_data_values(&output, &checked.values).unwrap();
    let written = fs::read_to_string(&output).unwrap();
    assert!(written.starts_with(
        "dataElement,period,orgUnit,categoryOptionCombo,attributeOptionCombo,value"
    ));
    assert!(written.contains("zrbmZYhP2gO,202501,RY0I8Ha0azq,kUkskhxydV5,HllvX50cXC0,4"));
}
