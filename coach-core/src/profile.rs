//! User profile used to personalise answers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
            Gender::Other => "other",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Gender::Male),
            "female" | "f" => Ok(Gender::Female),
            "other" | "o" => Ok(Gender::Other),
            other => Err(format!("unknown gender '{other}'")),
        }
    }
}

/// Training-relevant attributes of a user.
///
/// A fresh session starts from [`UserProfile::default`], where every measured
/// field is unset. The row is keyed by the session's user id in the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub gender: Option<Gender>,
    /// Age in years.
    #[serde(default)]
    pub age: Option<u32>,
    /// Height in centimetres.
    #[serde(default)]
    pub height: Option<u32>,
    /// Weight in kilograms.
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub injury: bool,
    #[serde(default)]
    pub injury_description: String,
}

/// A single rule violated by a profile edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileIssue {
    GenderMissing,
    AgeMissing,
    AgeOutOfRange,
    HeightMissing,
    HeightOutOfRange,
    WeightMissing,
    WeightOutOfRange,
    InjuryDescriptionMissing,
}

impl std::fmt::Display for ProfileIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ProfileIssue::GenderMissing => "a gender must be selected",
            ProfileIssue::AgeMissing => "age is required",
            ProfileIssue::AgeOutOfRange => "age must be between 1 and 120",
            ProfileIssue::HeightMissing => "height is required",
            ProfileIssue::HeightOutOfRange => "height must be between 50 and 250 cm",
            ProfileIssue::WeightMissing => "weight is required",
            ProfileIssue::WeightOutOfRange => "weight must be between 20 and 300 kg",
            ProfileIssue::InjuryDescriptionMissing => {
                "describe the injury or clear the injury flag"
            }
        };
        f.write_str(text)
    }
}

fn check_range(
    value: Option<u32>,
    range: std::ops::RangeInclusive<u32>,
    missing: ProfileIssue,
    out_of_range: ProfileIssue,
    issues: &mut Vec<ProfileIssue>,
) {
    match value {
        None => issues.push(missing),
        Some(v) if !range.contains(&v) => issues.push(out_of_range),
        Some(_) => {}
    }
}

impl UserProfile {
    /// Check every rule an edited profile must satisfy before it is saved.
    ///
    /// Returns all violations at once; an empty vector means the profile is valid.
    pub fn validate(&self) -> Vec<ProfileIssue> {
        let mut issues = Vec::new();
        if self.gender.is_none() {
            issues.push(ProfileIssue::GenderMissing);
        }
        check_range(
            self.age,
            1..=120,
            ProfileIssue::AgeMissing,
            ProfileIssue::AgeOutOfRange,
            &mut issues,
        );
        check_range(
            self.height,
            50..=250,
            ProfileIssue::HeightMissing,
            ProfileIssue::HeightOutOfRange,
            &mut issues,
        );
        check_range(
            self.weight,
            20..=300,
            ProfileIssue::WeightMissing,
            ProfileIssue::WeightOutOfRange,
            &mut issues,
        );
        if self.injury && self.injury_description.trim().is_empty() {
            issues.push(ProfileIssue::InjuryDescriptionMissing);
        }
        issues
    }

    /// One-line description used when a prompt interpolates the profile.
    pub fn summary(&self) -> String {
        fn or_unknown(value: Option<u32>, unit: &str) -> String {
            value.map(|v| format!("{v}{unit}")).unwrap_or_else(|| "unknown".to_string())
        }
        let injury = if self.injury {
            format!("injured ({})", self.injury_description.trim())
        } else {
            "no injuries".to_string()
        };
        format!(
            "gender: {}, age: {}, height: {}, weight: {}, {}",
            self.gender.map(|g| g.as_str()).unwrap_or("unknown"),
            or_unknown(self.age, " years"),
            or_unknown(self.height, " cm"),
            or_unknown(self.weight, " kg"),
            injury
        )
    }
}
