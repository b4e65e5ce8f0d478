//! Reshaping an AHD reporting form end to end.

use hrb_model::{
    Cell, DimensionKind, DimensionResolver, DimensionTable, Issue, Row, RowError, SourceRecordSet,
};
use hrb_transform::{
    CategorySource, DerivedColumn, FactReshaper, ReshapeConfig, ValuePolicy,
};

fn table(kind: DimensionKind, entries: &[(&str, &str)]) -> DimensionTable<String> {
    DimensionTable::from_entries(kind, entries.iter().map(|(code, id)| (*code, id.to_string())))
        .unwrap()
}

fn ahd_resolver() -> DimensionResolver {
    DimensionResolver::new()
        .with_table(table(
            DimensionKind::OrgUnit,
            &[("KCH_OPD1", "RY0I8Ha0azq"), ("Area_18", "h2ls2FUTYDc")],
        ))
        .with_table(table(
            DimensionKind::DataElement,
            &[
                ("CD4<200", "zrbmZYhP2gO"),
                ("CD4 >= 200", "YvFoTQA3IPM"),
                ("LAM+", "m1MIFkHtnsR"),
                ("LAM Neg", "zDQ1HGTExJi"),
            ],
        ))
}

fn ahd_config() -> ReshapeConfig {
    ReshapeConfig {
        year_column: "Reporting_year".to_string(),
        month_column: "Reporting_month".to_string(),
        org_unit_column: "Facility".to_string(),
        category: CategorySource::Fixed("kUkskhxydV5".to_string()),
        attribute_option_combo: "HllvX50cXC0".to_string(),
        element_columns: vec![
            "CD4<200".to_string(),
            "CD4 >= 200".to_string(),
            "LAM+".to_string(),
            "LAM Neg".to_string(),
        ],
        derived: vec![
            DerivedColumn::difference("CD4 >= 200", "CD4_tests", "CD4<200"),
            DerivedColumn::difference("LAM Neg", "LAM_tests", "LAM+"),
        ],
    }
}

#[test]
fn single_facility_month_yields_cd4_facts() {
    let records = SourceRecordSet::from_rows(vec![
        Row::new()
            .with("Facility", Some(Cell::from("KCH_OPD1")))
            .with("Reporting_year", Some(Cell::Int(2025)))
            .with("Reporting_month", Some(Cell::from("Jan")))
            .with("CD4_tests", Some(Cell::Int(10)))
            .with("CD4<200", Some(Cell::Int(4))),
    ]);
    let config = ahd_config();
    let resolver = ahd_resolver();

    let output = FactReshaper::new(&config, &resolver)
        .unwrap()
        .reshape_all(&records);

    assert!(output.diagnostics.is_empty());
    assert_eq!(output.facts.len(), 2);

    let below = &output.facts[0];
    assert_eq!(below.element_id, "zrbmZYhP2gO");
    assert_eq!(below.period.to_string(), "202501");
    assert_eq!(below.org_unit_id, "RY0I8Ha0azq");
    assert_eq!(below.value, Cell::Int(4));

    let above = &output.facts[1];
    assert_eq!(above.element_id, "YvFoTQA3IPM");
    assert_eq!(above.period.to_string(), "202501");
    assert_eq!(above.value, Cell::Int(6));

    // LAM operands are absent, so neither LAM fact is produced
    assert!(output.facts.iter().all(|fact| !fact.element_column.starts_with("LAM")));
}

#[test]
fn policy_drops_negative_derivations_and_zeros() {
    let records = SourceRecordSet::from_rows(vec![
        Row::new()
            .with("Facility", Some(Cell::from("Area_18")))
            .with("Reporting_year", Some(Cell::Float(2025.0)))
            .with("Reporting_month", Some(Cell::from("March")))
            .with("CD4_tests", Some(Cell::Int(3)))
            .with("CD4<200", Some(Cell::Int(5)))
            .with("LAM_tests", Some(Cell::Int(2)))
            .with("LAM+", Some(Cell::Int(0))),
    ]);
    let config = ahd_config();
    let resolver = ahd_resolver();

    let reshaped = FactReshaper::new(&config, &resolver)
        .unwrap()
        .reshape_all(&records);
    assert_eq!(reshaped.facts.len(), 4);

    let checked = ValuePolicy::StrictlyPositive.apply(&reshaped.facts);
    let submitted: Vec<(&str, u64)> = checked
        .values
        .iter()
        .map(|value| (value.data_element.as_str(), value.value))
        .collect();
    assert_eq!(submitted, vec![("zrbmZYhP2gO", 5), ("zDQ1HGTExJi", 2)]);
    // CD4 >= 200 went negative; LAM+ was zero
    assert_eq!(checked.diagnostics.len(), 2);
}

fn cd4_row(tests: Cell, below: Cell) -> SourceRecordSet {
    SourceRecordSet::from_rows(vec![
        Row::new()
            .with("Facility", Some(Cell::from("KCH_OPD1")))
            .with("Reporting_year", Some(Cell::Int(2025)))
            .with("Reporting_month", Some(Cell::from("Jan")))
            .with("CD4_tests", Some(tests))
            .with("CD4<200", Some(below)),
    ])
}

fn invalid_columns(issues: &[Issue]) -> Vec<(String, String)> {
    issues
        .iter()
        .map(|issue| match issue {
            Issue::Row(RowError::InvalidFactValue { column, value }) => {
                (column.clone(), value.clone())
            }
            other => panic!("unexpected issue {other:?}"),
        })
        .collect()
}

#[test]
fn unusable_operands_are_reported_not_dropped() {
    let config = ahd_config();
    let resolver = ahd_resolver();
    let reshaper = FactReshaper::new(&config, &resolver).unwrap();

    for bad in [Cell::Float(f64::NAN), Cell::Float(10.5), Cell::from("ten")] {
        let shown = bad.to_string();

        // bad total: CD4<200 is submitted, the derived count is reported
        let reshaped = reshaper.reshape_all(&cd4_row(bad.clone(), Cell::Int(4)));
        assert!(reshaped.diagnostics.is_empty());
        assert_eq!(reshaped.facts.len(), 2);
        let checked = ValuePolicy::StrictlyPositive.apply(&reshaped.facts);
        assert_eq!(checked.values.len(), 1);
        assert_eq!(checked.values[0].data_element, "zrbmZYhP2gO");
        let issues: Vec<Issue> = checked.diagnostics.into_iter().map(|d| d.issue).collect();
        assert_eq!(
            invalid_columns(&issues),
            vec![("CD4 >= 200".to_string(), shown.clone())]
        );

        // bad part: both the source count and the derived count are reported
        let reshaped = reshaper.reshape_all(&cd4_row(Cell::Int(10), bad.clone()));
        assert_eq!(reshaped.facts.len(), 2);
        let checked = ValuePolicy::StrictlyPositive.apply(&reshaped.facts);
        assert!(checked.values.is_empty());
        let issues: Vec<Issue> = checked.diagnostics.into_iter().map(|d| d.issue).collect();
        assert_eq!(
            invalid_columns(&issues),
            vec![
                ("CD4<200".to_string(), shown.clone()),
                ("CD4 >= 200".to_string(), shown),
            ]
        );
    }
}
