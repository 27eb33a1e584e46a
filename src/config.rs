use serde::{Deserialize, Deserializer, Serialize};

use crate::copies::CopyRounding;
use crate::error::{Error, Result};
use crate::types::{ItemType, Rect};

/// Everything one optimization run needs. Read-only for the duration of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    pub sheet: SheetConfig,
    pub item_types: Vec<ItemTypeConfig>,
    pub genetic: GeneticConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SheetConfig {
    pub width: f64,
    pub height: f64,
    pub max_pattern_count: usize,
    /// Charged once for every distinct pattern.
    pub base_cost: f64,
    /// Charged for every copy cut of a pattern.
    pub per_copy_cost: f64,
    pub allow_rotate: bool,
    pub copy_rounding: CopyRounding,
    /// Charge the base cost of patterns whose solved copy count is zero.
    pub charge_unused_patterns: bool,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            width: 100.0,
            height: 40.0,
            max_pattern_count: 999,
            base_cost: 20.0,
            per_copy_cost: 1.0,
            allow_rotate: true,
            copy_rounding: CopyRounding::Fractional,
            charge_unused_patterns: true,
        }
    }
}

impl SheetConfig {
    pub fn rect(&self) -> Rect {
        Rect::new(self.width, self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemTypeConfig {
    pub width: f64,
    pub height: f64,
    #[serde(deserialize_with = "deserialize_count")]
    pub min_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneticConfig {
    pub population_size: usize,
    pub generation_count: usize,
    /// Share of the population that survives each selection round.
    pub selection_fraction: f64,
    pub mutation_probability: f64,
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: 100,
            generation_count: 100,
            selection_fraction: 0.5,
            mutation_probability: 0.2,
            seed: None,
        }
    }
}

/// Accepts counts written as `20` or `20.0`.
pub fn deserialize_count<'de, D>(deserializer: D) -> std::result::Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.fract() != 0.0 || value < 0.0 || value > u32::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "expected a non-negative whole number, got {value}"
        )));
    }
    Ok(value as u32)
}

impl Config {
    /// Item types with their stable ids assigned by position.
    pub fn item_types(&self) -> Vec<ItemType> {
        self.item_types
            .iter()
            .enumerate()
            .map(|(id, t)| ItemType {
                id,
                rect: Rect::new(t.width, t.height),
                min_count: t.min_count,
            })
            .collect()
    }

    /// Rejects configurations no run could use, before any generation starts.
    pub fn validate(&self) -> Result<()> {
        let sheet = &self.sheet;
        if !(is_positive(sheet.width) && is_positive(sheet.height)) {
            return Err(Error::InvalidConfig(format!(
                "sheet dimensions must be positive, got {}x{}",
                sheet.width, sheet.height
            )));
        }
        if sheet.max_pattern_count == 0 {
            return Err(Error::InvalidConfig(
                "max pattern count must be at least 1".to_string(),
            ));
        }
        if !(is_non_negative(sheet.base_cost) && is_non_negative(sheet.per_copy_cost)) {
            return Err(Error::InvalidConfig(
                "pattern costs must be finite and non-negative".to_string(),
            ));
        }

        if self.item_types.is_empty() {
            return Err(Error::InvalidConfig(
                "at least one item type is required".to_string(),
            ));
        }
        let stock = sheet.rect();
        for item_type in self.item_types() {
            let rect = item_type.rect;
            if !(is_positive(rect.w) && is_positive(rect.h)) {
                return Err(Error::InvalidConfig(format!(
                    "item type {} dimensions must be positive, got {}",
                    item_type.id, rect
                )));
            }
            let fits = rect.fits_in(&stock) || (sheet.allow_rotate && rect.rotated().fits_in(&stock));
            if !fits {
                return Err(Error::InvalidItemGeometry {
                    item_type: item_type.id,
                    width: rect.w,
                    height: rect.h,
                });
            }
        }

        let genetic = &self.genetic;
        if genetic.population_size == 0 {
            return Err(Error::InvalidConfig(
                "population size must be at least 1".to_string(),
            ));
        }
        if !(genetic.selection_fraction > 0.0 && genetic.selection_fraction <= 1.0) {
            return Err(Error::InvalidConfig(format!(
                "selection fraction must be in (0, 1], got {}",
                genetic.selection_fraction
            )));
        }
        if !(0.0..=1.0).contains(&genetic.mutation_probability) {
            return Err(Error::InvalidConfig(format!(
                "mutation probability must be in [0, 1], got {}",
                genetic.mutation_probability
            )));
        }
        Ok(())
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn is_non_negative(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(items: &[(f64, f64, u32)]) -> Config {
        Config {
            item_types: items
                .iter()
                .map(|&(width, height, min_count)| ItemTypeConfig {
                    width,
                    height,
                    min_count,
                })
                .collect(),
            ..Config::default()
        }
    }

    #[test]
    fn test_parse_json_with_defaults() {
        let json = r#"{
            "sheet": { "width": 120, "height": 60, "maxPatternCount": 5 },
            "itemTypes": [ { "width": 10, "height": 20.5, "minCount": 20.0 } ],
            "genetic": { "populationSize": 10, "seed": 42 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.sheet.rect(), Rect::new(120.0, 60.0));
        assert_eq!(config.sheet.max_pattern_count, 5);
        assert_eq!(config.sheet.base_cost, 20.0);
        assert!(config.sheet.allow_rotate);
        assert_eq!(config.item_types[0].min_count, 20);
        assert_eq!(config.genetic.population_size, 10);
        assert_eq!(config.genetic.generation_count, 100);
        assert_eq!(config.genetic.seed, Some(42));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_fractional_count_rejected() {
        let json = r#"{ "itemTypes": [ { "width": 10, "height": 20, "minCount": 2.5 } ] }"#;
        assert!(serde_json::from_str::<Config>(json).is_err());
    }

    #[test]
    fn test_item_ids_follow_order() {
        let types = config(&[(10.0, 20.0, 3), (5.0, 5.0, 1)]).item_types();
        assert_eq!(types[0].id, 0);
        assert_eq!(types[1].id, 1);
        assert_eq!(types[1].rect, Rect::new(5.0, 5.0));
    }

    #[test]
    fn test_oversized_item_is_fatal() {
        let err = config(&[(10.0, 20.0, 3), (150.0, 10.0, 1)]).validate().unwrap_err();
        assert_eq!(
            err,
            Error::InvalidItemGeometry {
                item_type: 1,
                width: 150.0,
                height: 10.0
            }
        );
    }

    #[test]
    fn test_rotation_decides_geometry() {
        let mut config = config(&[(30.0, 90.0, 1)]);
        assert!(config.validate().is_ok());
        config.sheet.allow_rotate = false;
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidItemGeometry { .. })
        ));
    }

    #[test]
    fn test_invalid_settings() {
        assert!(matches!(
            config(&[]).validate(),
            Err(Error::InvalidConfig(_))
        ));

        let mut c = config(&[(10.0, 10.0, 1)]);
        c.genetic.selection_fraction = 0.0;
        assert!(matches!(c.validate(), Err(Error::InvalidConfig(_))));

        let mut c = config(&[(10.0, 10.0, 1)]);
        c.genetic.population_size = 0;
        assert!(matches!(c.validate(), Err(Error::InvalidConfig(_))));

        let mut c = config(&[(10.0, 10.0, 1)]);
        c.sheet.max_pattern_count = 0;
        assert!(matches!(c.validate(), Err(Error::InvalidConfig(_))));

        let mut c = config(&[(0.0, 10.0, 1)]);
        c.genetic.mutation_probability = 0.5;
        assert!(matches!(c.validate(), Err(Error::InvalidConfig(_))));
    }
}
