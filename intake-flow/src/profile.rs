//! Answer types collected by the questionnaire and the form buffers that hold
//! them between events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "Under 18")]
    Under18,
    #[serde(rename = "18-25")]
    From18To25,
    #[serde(rename = "26-40")]
    From26To40,
    #[serde(rename = "41-60")]
    From41To60,
    #[serde(rename = "Over 60")]
    Over60,
}

impl AgeGroup {
    pub const ALL: [AgeGroup; 5] = [
        AgeGroup::Under18,
        AgeGroup::From18To25,
        AgeGroup::From26To40,
        AgeGroup::From41To60,
        AgeGroup::Over60,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AgeGroup::Under18 => "Under 18",
            AgeGroup::From18To25 => "18-25",
            AgeGroup::From26To40 => "26-40",
            AgeGroup::From41To60 => "41-60",
            AgeGroup::Over60 => "Over 60",
        }
    }
}

impl fmt::Display for AgeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AgeGroup {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AgeGroup::ALL
            .into_iter()
            .find(|group| group.label() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InsuranceProduct {
    #[serde(rename = "Mechanical Breakdown Insurance (MBI)")]
    MechanicalBreakdown,
    #[serde(rename = "Comprehensive Insurance")]
    Comprehensive,
    #[serde(rename = "Third Party Insurance")]
    ThirdParty,
}

impl InsuranceProduct {
    pub const ALL: [InsuranceProduct; 3] = [
        InsuranceProduct::MechanicalBreakdown,
        InsuranceProduct::Comprehensive,
        InsuranceProduct::ThirdParty,
    ];

    pub fn label(self) -> &'static str {
        match self {
            InsuranceProduct::MechanicalBreakdown => "Mechanical Breakdown Insurance (MBI)",
            InsuranceProduct::Comprehensive => "Comprehensive Insurance",
            InsuranceProduct::ThirdParty => "Third Party Insurance",
        }
    }
}

impl fmt::Display for InsuranceProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for InsuranceProduct {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InsuranceProduct::ALL
            .into_iter()
            .find(|product| product.label() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

/// A label outside one of the closed answer sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown label: {0}")]
pub struct UnknownLabel(pub String);

/// Insurance products picked so far. Toggling an already picked product
/// removes it; iteration follows the order products were picked in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InsuranceSelection(Vec<InsuranceProduct>);

impl InsuranceSelection {
    pub fn toggle(&mut self, product: InsuranceProduct) {
        if let Some(pos) = self.0.iter().position(|p| *p == product) {
            self.0.remove(pos);
        } else {
            self.0.push(product);
        }
    }

    pub fn contains(&self, product: InsuranceProduct) -> bool {
        self.0.contains(&product)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn products(&self) -> &[InsuranceProduct] {
        &self.0
    }

    /// Labels joined with `", "`, as echoed into the log and the prompt.
    pub fn joined(&self) -> String {
        self.0
            .iter()
            .map(|p| p.label())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromIterator<InsuranceProduct> for InsuranceSelection {
    fn from_iter<I: IntoIterator<Item = InsuranceProduct>>(iter: I) -> Self {
        let mut selection = InsuranceSelection::default();
        for product in iter {
            if !selection.contains(product) {
                selection.0.push(product);
            }
        }
        selection
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleField {
    Make,
    Model,
    Year,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDetails {
    pub make: String,
    pub model: String,
    pub year: String,
}

impl VehicleDetails {
    pub fn new(make: impl Into<String>, model: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            make: make.into(),
            model: model.into(),
            year: year.into(),
        }
    }

    pub fn set(&mut self, field: VehicleField, value: String) {
        match field {
            VehicleField::Make => self.make = value,
            VehicleField::Model => self.model = value,
            VehicleField::Year => self.year = value,
        }
    }

    /// All three fields hold something other than whitespace.
    ///
    /// Stricter than a plain emptiness check: a field of only spaces counts
    /// as missing, and [`describe`](Self::describe) echoes trimmed values.
    pub fn is_complete(&self) -> bool {
        [&self.make, &self.model, &self.year]
            .iter()
            .all(|field| !field.trim().is_empty())
    }

    /// `"make model, year"`
    pub fn describe(&self) -> String {
        format!(
            "{} {}, {}",
            self.make.trim(),
            self.model.trim(),
            self.year.trim()
        )
    }
}

/// Transient input state. Everything here goes back to its default on restart.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormBuffers {
    pub age_group: Option<AgeGroup>,
    pub insurance: InsuranceSelection,
    pub vehicle: VehicleDetails,
    pub additional_info: String,
    pub chat_input: String,
}

impl FormBuffers {
    pub fn clear(&mut self) {
        *self = FormBuffers::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_age_group_labels_parse() {
        for group in AgeGroup::ALL {
            assert_eq!(group.label().parse::<AgeGroup>(), Ok(group));
        }
        assert!("27".parse::<AgeGroup>().is_err());
        assert_eq!(
            "".parse::<AgeGroup>().unwrap_err().to_string(),
            "unknown label: "
        );
        assert_eq!(
            "Boat Insurance".parse::<InsuranceProduct>(),
            Err(UnknownLabel("Boat Insurance".to_string()))
        );
    }

    #[test]
    fn test_insurance_toggle_keeps_pick_order() {
        let mut selection = InsuranceSelection::default();
        selection.toggle(InsuranceProduct::ThirdParty);
        selection.toggle(InsuranceProduct::Comprehensive);
        assert_eq!(
            selection.joined(),
            "Third Party Insurance, Comprehensive Insurance"
        );

        selection.toggle(InsuranceProduct::ThirdParty);
        assert_eq!(selection.products(), &[InsuranceProduct::Comprehensive]);

        selection.toggle(InsuranceProduct::Comprehensive);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_vehicle_requires_every_field() {
        let mut vehicle = VehicleDetails::new("Toyota", "Corolla", "");
        assert!(!vehicle.is_complete());
        vehicle.set(VehicleField::Year, "   ".to_string());
        assert!(!vehicle.is_complete());
        vehicle.set(VehicleField::Year, "2015".to_string());
        assert!(vehicle.is_complete());
        assert_eq!(vehicle.describe(), "Toyota Corolla, 2015");
    }
}
