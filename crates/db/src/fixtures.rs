use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use evaka_finance_core::domain::family::{Parentship, Partnership};
use evaka_finance_core::domain::fee_alteration::FeeAlteration;
use evaka_finance_core::domain::income::Income;
use evaka_finance_core::domain::person::UnitId;
use evaka_finance_core::domain::placement::{Placement, ServiceNeed};
use evaka_finance_core::domain::pricing::PricingRow;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProviderType {
    Municipal,
    Purchased,
    Private,
    MunicipalSchool,
    PrivateServiceVoucher,
    External,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    #[serde(default)]
    pub name: String,
    pub provider_type: ProviderType,
    pub invoiced_by_municipality: bool,
}

impl Unit {
    pub fn bills_fee_decisions(&self) -> bool {
        self.invoiced_by_municipality
    }

    pub fn bills_voucher_value_decisions(&self) -> bool {
        self.provider_type == ProviderType::PrivateServiceVoucher && !self.invoiced_by_municipality
    }
}

/// Every record decision generation reads, as one JSON document.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinanceSnapshot {
    pub units: Vec<Unit>,
    pub partnerships: Vec<Partnership>,
    pub parentships: Vec<Parentship>,
    pub incomes: Vec<Income>,
    pub placements: Vec<Placement>,
    pub service_needs: Vec<ServiceNeed>,
    pub pricing: Vec<PricingRow>,
    pub fee_alterations: Vec<FeeAlteration>,
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("could not read snapshot `{path}`: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("could not parse snapshot `{path}`: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },
}

impl FinanceSnapshot {
    /// Two children of one single parent, one in a municipal daycare and the
    /// younger one in a service voucher unit from March 2024.
    pub const SAMPLE_JSON: &str = include_str!("../../../config/fixtures/finance_snapshot.json");

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| SnapshotError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_str(&raw)
            .map_err(|source| SnapshotError::Parse { path: path.to_path_buf(), source })
    }

    pub fn sample() -> Result<Self, serde_json::Error> {
        serde_json::from_str(Self::SAMPLE_JSON)
    }
}
