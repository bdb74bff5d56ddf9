//! Animal registry models.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{new_id, now_rfc3339, ParseLabelError};

/// Biological sex of an animal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Sex {
    type Err = ParseLabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Male" => Ok(Sex::Male),
            "Female" => Ok(Sex::Female),
            _ => Err(ParseLabelError::new("sex", s)),
        }
    }
}

/// An animal identity record. May belong to cohorts of several studies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Animal {
    /// Internal UUID
    pub id: String,
    /// Human-facing label (ear tag, tattoo); unique in the registry
    pub animal_id: String,
    pub species: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strain: Option<String>,
    pub sex: Sex,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<NaiveDate>,
    /// Body weight in grams
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub created_at: String,
}

/// Input for registering an animal.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAnimal {
    pub animal_id: String,
    pub species: String,
    pub strain: Option<String>,
    pub sex: Sex,
    pub birth_date: Option<NaiveDate>,
    pub weight: Option<f64>,
}

impl NewAnimal {
    /// Minimal input with the required fields only.
    pub fn new(animal_id: impl Into<String>, species: impl Into<String>, sex: Sex) -> Self {
        Self {
            animal_id: animal_id.into(),
            species: species.into(),
            strain: None,
            sex,
            birth_date: None,
            weight: None,
        }
    }
}

impl Animal {
    pub fn from_new(new: NewAnimal) -> Self {
        Self {
            id: new_id(),
            animal_id: new.animal_id,
            species: new.species,
            strain: new.strain,
            sex: new.sex,
            birth_date: new.birth_date,
            weight: new.weight,
            created_at: now_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optional_attributes_omitted() {
        let animal = Animal::from_new(NewAnimal::new("R-001", "Rat", Sex::Female));
        let json = serde_json::to_value(&animal).unwrap();
        assert!(json.get("strain").is_none());
        assert!(json.get("birth_date").is_none());
        assert!(json.get("weight").is_none());
        assert_eq!(json["sex"], "Female");
    }

    #[test]
    fn test_sex_parse() {
        assert_eq!("Male".parse::<Sex>().unwrap(), Sex::Male);
        assert!("M".parse::<Sex>().is_err());
    }
}
