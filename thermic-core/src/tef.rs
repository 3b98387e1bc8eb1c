//! Baseline thermic effect from macronutrients.

use crate::constants::{
    KCAL_PER_GRAM_CARBS, KCAL_PER_GRAM_FAT, KCAL_PER_GRAM_PROTEIN, TEF_COEFFICIENT_CARBS,
    TEF_COEFFICIENT_FAT, TEF_COEFFICIENT_PROTEIN,
};
use crate::MealEntry;
use serde::{Deserialize, Serialize};

/// Baseline TEF totals for a meal list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseTef {
    /// Energy spent on digestion, kcal.
    pub total_tef: f64,
    /// Sum of logged calories, kcal.
    pub total_calories: f64,
    /// `total_tef / total_calories * 100`, zero when there are no calories.
    pub percentage: f64,
}

/// TEF contribution of a single entry, kcal.
pub fn entry_tef(entry: &MealEntry) -> f64 {
    let protein_kcal = entry.macros.protein() * KCAL_PER_GRAM_PROTEIN;
    let carbs_kcal = entry.macros.carbs() * KCAL_PER_GRAM_CARBS;
    let fat_kcal = entry.macros.fat() * KCAL_PER_GRAM_FAT;

    protein_kcal * TEF_COEFFICIENT_PROTEIN
        + carbs_kcal * TEF_COEFFICIENT_CARBS
        + fat_kcal * TEF_COEFFICIENT_FAT
}

/// Sum TEF and calories across entries.
pub fn base_tef(entries: &[MealEntry]) -> BaseTef {
    let (total_tef, total_calories) = entries.iter().fold((0.0, 0.0), |(tef, kcal), entry| {
        (tef + entry_tef(entry), kcal + entry.macros.calories())
    });

    let percentage = if total_calories > 0.0 {
        total_tef / total_calories * 100.0
    } else {
        0.0
    };

    BaseTef {
        total_tef,
        total_calories,
        percentage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Macros, MealType};

    #[test]
    fn test_coffee_is_protein_only() {
        let coffee = MealEntry::new(
            "Coffee",
            200.0,
            MealType::Breakfast,
            Macros::new(4.0, 0.6, 0.0, 0.0),
        );
        let base = base_tef(&[coffee]);
        assert!((base.total_tef - 0.6).abs() < 1e-9);
        assert_eq!(base.total_calories, 4.0);
        assert!((base.percentage - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_mixed_meal() {
        // 20g protein, 50g carbs, 10g fat
        // 80*0.25 + 200*0.08 + 90*0.02 = 20 + 16 + 1.8
        let meal = MealEntry::new(
            "Chicken rice bowl",
            350.0,
            MealType::Lunch,
            Macros::new(370.0, 20.0, 50.0, 10.0),
        );
        assert!((entry_tef(&meal) - 37.8).abs() < 1e-9);
    }

    #[test]
    fn test_zero_calories_gives_zero_percentage() {
        let water = MealEntry::new("Water", 500.0, MealType::Snack, Macros::default());
        let base = base_tef(&[water]);
        assert_eq!(base.total_tef, 0.0);
        assert_eq!(base.percentage, 0.0);
        assert_eq!(base_tef(&[]), BaseTef::default());
    }
}
