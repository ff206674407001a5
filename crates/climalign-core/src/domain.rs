//! Source-agnostic identifiers shared by discovery, the calendar/grid
//! transforms, and the batch orchestrator: which product a file came from,
//! which meteorological variable it carries, and (for CPM) which ensemble
//! member.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which of the two input products a raster stack originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Product {
    /// Convection-permitting regional climate projection, 2.2 km, 360-day calendar.
    Cpm,
    /// Gridded observational product, 1 km, civil calendar.
    Hads,
}

impl Product {
    pub fn as_str(&self) -> &'static str {
        match self {
            Product::Cpm => "cpm",
            Product::Hads => "hads",
        }
    }

    /// HADS has no ensemble runs; only CPM does.
    pub fn has_runs(&self) -> bool {
        matches!(self, Product::Cpm)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The canonical meteorological variable. `pr` (CPM) and `rainfall` (HADS)
/// are the same quantity under different source names; the mapping is kept
/// in configuration (`VariableAlias`) rather than inferred, per the
/// pipeline's open question on cross-product naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Variable {
    Tasmax,
    Tasmin,
    Pr,
}

impl Variable {
    pub fn as_str(&self) -> &'static str {
        match self {
            Variable::Tasmax => "tasmax",
            Variable::Tasmin => "tasmin",
            Variable::Pr => "pr",
        }
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a variable's on-disk source-file token to the canonical `Variable`,
/// per product. Configuration, not inference: `spec.md`'s open question (a)
/// requires this table to live in config rather than be guessed from
/// similarity of names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableAlias {
    pub canonical: Variable,
    pub cpm_token: &'static str,
    pub hads_token: &'static str,
}

impl VariableAlias {
    pub const fn new(canonical: Variable, cpm_token: &'static str, hads_token: &'static str) -> Self {
        Self {
            canonical,
            cpm_token,
            hads_token,
        }
    }

    pub fn token_for(&self, product: Product) -> &'static str {
        match product {
            Product::Cpm => self.cpm_token,
            Product::Hads => self.hads_token,
        }
    }
}

/// Default alias table: `tasmax`/`tasmin` share a name across products;
/// `pr` (CPM) aliases to `rainfall` (HADS).
pub fn default_variable_aliases() -> Vec<VariableAlias> {
    vec![
        VariableAlias::new(Variable::Tasmax, "tasmax", "tasmax"),
        VariableAlias::new(Variable::Tasmin, "tasmin", "tasmin"),
        VariableAlias::new(Variable::Pr, "pr", "rainfall"),
    ]
}

/// Resolve a filename's leading token (before the first `_`) to a canonical
/// `Variable`, given a product and an alias table.
pub fn resolve_variable(
    token: &str,
    product: Product,
    aliases: &[VariableAlias],
) -> Option<Variable> {
    aliases
        .iter()
        .find(|alias| alias.token_for(product) == token)
        .map(|alias| alias.canonical)
}

/// A two-digit CPM ensemble-member label, e.g. `"05"`. HADS carries none.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnsembleRun(pub String);

impl fmt::Display for EnsembleRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named cropping region, e.g. `"Glasgow"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegionName(pub String);

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hads_has_no_runs() {
        assert!(!Product::Hads.has_runs());
        assert!(Product::Cpm.has_runs());
    }

    #[test]
    fn pr_resolves_from_rainfall_on_hads() {
        let aliases = default_variable_aliases();
        assert_eq!(
            resolve_variable("rainfall", Product::Hads, &aliases),
            Some(Variable::Pr)
        );
        assert_eq!(
            resolve_variable("pr", Product::Cpm, &aliases),
            Some(Variable::Pr)
        );
        assert_eq!(resolve_variable("rainfall", Product::Cpm, &aliases), None);
    }
}
