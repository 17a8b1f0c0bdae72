// Gym calculators

use std::fmt;
use std::str::FromStr;

use crate::error::TrackerError;

pub const BAR_WEIGHT: f64 = 20.0;
pub const PLATES: [f64; 6] = [20.0, 15.0, 10.0, 5.0, 2.5, 1.25];
pub const MAX_ONE_RM_REPS: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OneRmFormula {
    #[default]
    Epley,
    Brzycki,
}

impl OneRmFormula {
    pub fn estimate(self, weight: f64, reps: f64) -> f64 {
        match self {
            OneRmFormula::Epley => weight * (1.0 + reps / 30.0),
            OneRmFormula::Brzycki => weight * 36.0 / (37.0 - reps),
        }
    }
}

impl FromStr for OneRmFormula {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "epley" => Ok(OneRmFormula::Epley),
            "brzycki" => Ok(OneRmFormula::Brzycki),
            other => Err(TrackerError::InvalidInput(format!("Unknown formula: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Goal {
    Cut,
    #[default]
    Maintain,
    Bulk,
}

impl FromStr for Goal {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cut" => Ok(Goal::Cut),
            "maintain" => Ok(Goal::Maintain),
            "bulk" => Ok(Goal::Bulk),
            other => Err(TrackerError::InvalidInput(format!("Unknown goal: {other}"))),
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Goal::Cut => "Cut",
            Goal::Maintain => "Maintain",
            Goal::Bulk => "Bulk",
        };
        f.write_str(name)
    }
}

fn positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OneRmEstimate {
    pub one_rm: f64,
    pub pct70: f64,
    pub pct80: f64,
    pub pct90: f64,
}

impl fmt::Display for OneRmEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "1RM: {:.1} kg  -  70% {:.1} kg  -  80% {:.1} kg  -  90% {:.1} kg",
            self.one_rm, self.pct70, self.pct80, self.pct90
        )
    }
}

pub fn estimate_one_rm(
    weight: f64,
    reps: f64,
    formula: OneRmFormula,
) -> Result<OneRmEstimate, TrackerError> {
    if !positive(weight) || !positive(reps) {
        return Err(TrackerError::InvalidInput("Enter weight and reps.".into()));
    }
    if !(1.0..=MAX_ONE_RM_REPS).contains(&reps) {
        return Err(TrackerError::InvalidInput("Reps must be 1-12.".into()));
    }
    let one_rm = formula.estimate(weight, reps);
    Ok(OneRmEstimate {
        one_rm,
        pct70: one_rm * 0.7,
        pct80: one_rm * 0.8,
        pct90: one_rm * 0.9,
    })
}

/// Plates per side as `(count, plate)` for a 20 kg bar, heaviest first.
/// An empty list means the bar alone.
pub fn plate_breakdown(target: f64) -> Result<Vec<(u32, f64)>, TrackerError> {
    if !target.is_finite() || target < BAR_WEIGHT {
        return Err(TrackerError::InvalidInput("Enter target >= 20kg.".into()));
    }
    let mut remaining = (target - BAR_WEIGHT) / 2.0;
    let mut out = Vec::new();
    for plate in PLATES {
        let count = (remaining / plate).floor();
        if count > 0.0 {
            out.push((count as u32, plate));
            remaining -= count * plate;
        }
    }
    Ok(out)
}

pub fn format_plates(plates: &[(u32, f64)]) -> String {
    if plates.is_empty() {
        return "Just the bar.".to_string();
    }
    plates
        .iter()
        .map(|(count, plate)| format!("{count}x{plate}kg"))
        .collect::<Vec<_>>()
        .join("  -  ")
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyEstimate {
    pub bmi: f64,
    pub daily_calories: f64,
}

/// BMI from kilograms and centimetres plus a goal-adjusted calorie target.
pub fn body_estimate(
    weight_kg: f64,
    height_cm: f64,
    age: f64,
    goal: Goal,
) -> Result<BodyEstimate, TrackerError> {
    if weight_kg == 0.0 || height_cm == 0.0 || age == 0.0 {
        return Err(TrackerError::InvalidInput(
            "Enter weight, height, and age.".into(),
        ));
    }
    if !positive(weight_kg) || !positive(height_cm) || !age.is_finite() {
        return Err(TrackerError::InvalidInput("Enter valid values.".into()));
    }
    let adjust = match goal {
        Goal::Cut => -300.0,
        Goal::Maintain => 0.0,
        Goal::Bulk => 300.0,
    };
    Ok(BodyEstimate {
        bmi: weight_kg / (height_cm / 100.0).powi(2),
        daily_calories: weight_kg * 30.0 + adjust,
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct NutritionPlan {
    pub goal: Goal,
    pub diet: String,
    pub calories: f64,
    pub protein_g: f64,
}

impl fmt::Display for NutritionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}  -  {}  -  {} kcal  -  {}g protein  -  Split meals into 3-4 servings with veggies + carbs.",
            self.goal, self.diet, self.calories, self.protein_g
        )
    }
}

pub fn nutrition_plan(weight_kg: f64, goal: Goal, diet: &str) -> Result<NutritionPlan, TrackerError> {
    if !positive(weight_kg) {
        return Err(TrackerError::InvalidInput("Enter body weight.".into()));
    }
    let base = weight_kg * 30.0;
    let calories = match goal {
        Goal::Cut => base - 400.0,
        Goal::Maintain => base,
        Goal::Bulk => base + 300.0,
    };
    Ok(NutritionPlan {
        goal,
        diet: diet.to_string(),
        calories,
        protein_g: (weight_kg * 2.0).round(),
    })
}
