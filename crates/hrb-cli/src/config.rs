//! TOML configuration for the bridge.
//!
//! ```toml
//! [aggregate]
//! element_columns = ["CD4<200", "CD4 >= 200"]
//! attribute_option_combo = "HllvX50cXC0"
//! category = { column = { column = "AHD_eligible_category" } }
//!
//! [lookups.org_units]
//! KCH_OPD1 = "RY0I8Ha0azq"
//! ```
//!
//! Secrets never live in the file: the aggregate API password and database
//! URLs come from the command line or the environment.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use hrb_migrate::MigrationSettings;
use hrb_model::{DimensionKind, DimensionResolver, DimensionTable};
use hrb_transform::{CategorySource, DerivedColumn, ReshapeConfig, ValuePolicy};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    pub aggregate: Option<AggregateSection>,
    pub dhis2: Option<Dhis2Section>,
    #[serde(default)]
    pub lookups: LookupSection,
    #[serde(default)]
    pub migration: MigrationSection,
}

impl BridgeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("parse config {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn aggregate(&self) -> Result<&AggregateSection> {
        self.aggregate
            .as_ref()
            .context("config has no [aggregate] section")
    }

    pub fn dhis2(&self) -> Result<&Dhis2Section> {
        self.dhis2.as_ref().context("config has no [dhis2] section")
    }
}

fn default_year_column() -> String {
    "Reporting_year".to_string()
}

fn default_month_column() -> String {
    "Reporting_month".to_string()
}

fn default_org_unit_column() -> String {
    "Facility".to_string()
}

/// Layout of the wide reporting form and how its values are submitted.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AggregateSection {
    #[serde(default = "default_year_column")]
    pub year_column: String,
    #[serde(default = "default_month_column")]
    pub month_column: String,
    #[serde(default = "default_org_unit_column")]
    pub org_unit_column: String,
    pub category: CategorySource,
    pub attribute_option_combo: String,
    pub element_columns: Vec<String>,
    #[serde(default)]
    pub derived: Vec<DerivedColumn>,
    #[serde(default)]
    pub value_policy: ValuePolicy,
}

impl AggregateSection {
    pub fn reshape_config(&self) -> ReshapeConfig {
        ReshapeConfig {
            year_column: self.year_column.clone(),
            month_column: self.month_column.clone(),
            org_unit_column: self.org_unit_column.clone(),
            category: self.category.clone(),
            attribute_option_combo: self.attribute_option_combo.clone(),
            element_columns: self.element_columns.clone(),
            derived: self.derived.clone(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Dhis2Section {
    pub base_url: String,
    pub username: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Dhis2Section {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Code to identifier tables for the aggregate dimensions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LookupSection {
    pub org_units: BTreeMap<String, String>,
    pub category_option_combos: BTreeMap<String, String>,
    pub data_elements: BTreeMap<String, String>,
}

impl LookupSection {
    pub fn resolver(&self) -> Result<DimensionResolver> {
        let table = |kind, entries: &BTreeMap<String, String>| {
            DimensionTable::from_entries(kind, entries.clone())
        };
        Ok(DimensionResolver::new()
            .with_table(table(DimensionKind::OrgUnit, &self.org_units)?)
            .with_table(table(
                DimensionKind::CategoryOptionCombo,
                &self.category_option_combos,
            )?)
            .with_table(table(DimensionKind::DataElement, &self.data_elements)?))
    }
}

fn default_lock_name() -> String {
    "health_bridge_migration".to_string()
}

fn default_lock_timeout_secs() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct MigrationSection {
    #[serde(flatten)]
    pub settings: MigrationSettings,
    /// Advisory lock held on the destination for the whole run.
    #[serde(default = "default_lock_name")]
    pub lock_name: String,
    #[serde(default = "default_lock_timeout_secs")]
    pub lock_timeout_secs: u32,
}

impl Default for MigrationSection {
    fn default() -> Self {
        Self {
            settings: MigrationSettings::default(),
            lock_name: default_lock_name(),
            lock_timeout_secs: default_lock_timeout_secs(),
        }
    }
}
