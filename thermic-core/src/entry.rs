//! Meal entry types.
//!
//! Entries are owned by the meal log; this crate only reads them. Numeric
//! fields are optional on the wire and every accessor defaults missing or
//! non-finite values to zero, so a malformed entry never raises.

use crate::{EntryId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// ============================================================================
// MEAL TYPE
// ============================================================================

/// Which meal of the day an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snack,
}

impl MealType {
    /// Stable string representation, used in the canonical projection.
    pub fn as_str(&self) -> &'static str {
        match self {
            MealType::Breakfast => "breakfast",
            MealType::Lunch => "lunch",
            MealType::Dinner => "dinner",
            MealType::Snack => "snack",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MealType {
    type Err = MealTypeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breakfast" => Ok(MealType::Breakfast),
            "lunch" => Ok(MealType::Lunch),
            "dinner" => Ok(MealType::Dinner),
            "snack" => Ok(MealType::Snack),
            _ => Err(MealTypeParseError(s.to_string())),
        }
    }
}

/// Error when parsing an invalid meal type string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MealTypeParseError(pub String);

impl fmt::Display for MealTypeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid meal type: {}", self.0)
    }
}

impl std::error::Error for MealTypeParseError {}

// ============================================================================
// DAY PERIOD
// ============================================================================

/// Coarse time-of-day bucket the log attaches for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayPeriod {
    Morning,
    Afternoon,
    Evening,
    Night,
}

// ============================================================================
// MACROS
// ============================================================================

/// The four tracked macronutrient values. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Macros {
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default)]
    pub carbs: Option<f64>,
    #[serde(default)]
    pub fat: Option<f64>,
}

impl Macros {
    pub fn new(calories: f64, protein: f64, carbs: f64, fat: f64) -> Self {
        Self {
            calories: Some(calories),
            protein: Some(protein),
            carbs: Some(carbs),
            fat: Some(fat),
        }
    }

    /// Calories in kcal, zero when absent.
    pub fn calories(&self) -> f64 {
        or_zero(self.calories)
    }

    /// Protein in grams, zero when absent.
    pub fn protein(&self) -> f64 {
        or_zero(self.protein)
    }

    /// Carbohydrate in grams, zero when absent.
    pub fn carbs(&self) -> f64 {
        or_zero(self.carbs)
    }

    /// Fat in grams, zero when absent.
    pub fn fat(&self) -> f64 {
        or_zero(self.fat)
    }
}

/// Missing, NaN and infinite values all read as zero.
pub(crate) fn or_zero(value: Option<f64>) -> f64 {
    match value {
        Some(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

// ============================================================================
// MEAL ENTRY
// ============================================================================

/// A single logged food item.
///
/// `id`, `timestamp`, `period`, `is_estimated` and `micronutrients` are
/// volatile: they never take part in cache identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealEntry {
    #[serde(default)]
    pub id: Option<EntryId>,
    pub name: String,
    #[serde(default)]
    pub consumed_grams: Option<f64>,
    pub meal_type: MealType,
    #[serde(default)]
    pub macros: Macros,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default)]
    pub period: Option<DayPeriod>,
    #[serde(default)]
    pub is_estimated: bool,
    #[serde(default)]
    pub micronutrients: BTreeMap<String, f64>,
}

impl MealEntry {
    /// Create an entry with the identity-relevant fields set and every
    /// volatile field empty.
    pub fn new(
        name: impl Into<String>,
        consumed_grams: f64,
        meal_type: MealType,
        macros: Macros,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            consumed_grams: Some(consumed_grams),
            meal_type,
            macros,
            timestamp: None,
            period: None,
            is_estimated: false,
            micronutrients: BTreeMap::new(),
        }
    }

    /// Set the volatile identity.
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set when the entry was consumed.
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Mark the entry as an estimate.
    pub fn estimated(mut self) -> Self {
        self.is_estimated = true;
        self
    }

    /// Consumed weight in grams, zero when absent.
    pub fn grams(&self) -> f64 {
        or_zero(self.consumed_grams)
    }
}
