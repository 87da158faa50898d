//! Matching configuration

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::types::*;
use crate::utils::validation::{validate_credit_days, validate_tolerance};

pub const ENV_MAX_CREDIT_DAYS: &str = "RECON_MAX_CREDIT_DAYS";
pub const ENV_SALE_TOLERANCE: &str = "RECON_SALE_TOLERANCE";
pub const ENV_PURCHASE_TOLERANCE: &str = "RECON_PURCHASE_TOLERANCE";

pub const DEFAULT_MAX_CREDIT_DAYS: i64 = 30;

/// Tolerances and windows used by the matcher
///
/// Values are validated on construction, including when deserialized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MatchConfigParams")]
pub struct MatchConfig {
    max_credit_days: i64,
    sale_tolerance: BigDecimal,
    purchase_tolerance: BigDecimal,
}

impl MatchConfig {
    /// Create a validated configuration
    pub fn new(
        max_credit_days: i64,
        sale_tolerance: BigDecimal,
        purchase_tolerance: BigDecimal,
    ) -> ReconcileResult<Self> {
        validate_credit_days(max_credit_days)?;
        validate_tolerance("sale_tolerance", &sale_tolerance)?;
        validate_tolerance("purchase_tolerance", &purchase_tolerance)?;

        Ok(Self {
            max_credit_days,
            sale_tolerance,
            purchase_tolerance,
        })
    }

    /// Load configuration from environment variables, using defaults for unset ones
    pub fn from_env() -> ReconcileResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> ReconcileResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = MatchConfigParams::default();

        let max_credit_days = match lookup(ENV_MAX_CREDIT_DAYS) {
            Some(raw) => parse_setting::<i64>(ENV_MAX_CREDIT_DAYS, &raw)?,
            None => defaults.max_credit_days,
        };
        let sale_tolerance = match lookup(ENV_SALE_TOLERANCE) {
            Some(raw) => parse_setting::<BigDecimal>(ENV_SALE_TOLERANCE, &raw)?,
            None => defaults.sale_tolerance,
        };
        let purchase_tolerance = match lookup(ENV_PURCHASE_TOLERANCE) {
            Some(raw) => parse_setting::<BigDecimal>(ENV_PURCHASE_TOLERANCE, &raw)?,
            None => defaults.purchase_tolerance,
        };

        Self::new(max_credit_days, sale_tolerance, purchase_tolerance)
    }

    /// Maximum days between an invoice's date and the line that pays it
    pub fn max_credit_days(&self) -> i64 {
        self.max_credit_days
    }

    /// Allowed difference for deposits against sales and withholding records
    pub fn sale_tolerance(&self) -> &BigDecimal {
        &self.sale_tolerance
    }

    /// Allowed difference for withdrawals against purchases
    pub fn purchase_tolerance(&self) -> &BigDecimal {
        &self.purchase_tolerance
    }

    /// Tolerance that applies to a line of the given direction
    pub fn tolerance_for(&self, direction: Direction) -> &BigDecimal {
        match direction {
            Direction::Deposit => &self.sale_tolerance,
            Direction::Withdrawal => &self.purchase_tolerance,
        }
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        let params = MatchConfigParams::default();
        Self {
            max_credit_days: params.max_credit_days,
            sale_tolerance: params.sale_tolerance,
            purchase_tolerance: params.purchase_tolerance,
        }
    }
}

/// Unvalidated configuration as it appears in serialized form
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfigParams {
    pub max_credit_days: i64,
    pub sale_tolerance: BigDecimal,
    pub purchase_tolerance: BigDecimal,
}

impl Default for MatchConfigParams {
    fn default() -> Self {
        Self {
            max_credit_days: DEFAULT_MAX_CREDIT_DAYS,
            sale_tolerance: BigDecimal::from(1000),
            purchase_tolerance: BigDecimal::from(50),
        }
    }
}

impl TryFrom<MatchConfigParams> for MatchConfig {
    type Error = ReconcileError;

    fn try_from(params: MatchConfigParams) -> Result<Self, Self::Error> {
        Self::new(
            params.max_credit_days,
            params.sale_tolerance,
            params.purchase_tolerance,
        )
    }
}

fn parse_setting<T: FromStr>(key: &str, raw: &str) -> ReconcileResult<T> {
    raw.trim().parse::<T>().map_err(|_| {
        ReconcileError::Configuration(format!("{} has an invalid value: '{}'", key, raw))
    })
}
