//! Deterministic task drafting used when the language model cannot help.

use super::response::{RoleAssignment, TaskDraft};
use crate::geo::Coordinates;

const INAPPROPRIATE: &[&str] = &[
    "joke", "funny", "lol", "haha", "prank", "fake", "test123", "random",
];
const MASS_CASUALTY: &[&str] = &[
    "many people",
    "multiple people",
    "crowd",
    "group",
    "families",
];
const COMPLEX_EMERGENCY: &[&str] = &["major", "widespread", "multiple", "mass", "large scale"];
const NEEDS_FIRST_RESPONDER: &[&str] = &[
    "medical",
    "injury",
    "hurt",
    "bleeding",
    "unconscious",
    "rescue",
    "trapped",
    "fire",
    "emergency",
];
const URGENT_WORDS: &[&str] = &["urgent", "critical", "immediate", "asap"];
const HIGH_URGENCY_LEVELS: &[&str] = &["high", "urgent"];

pub const HEURISTIC_REASONING: &str = "Intelligent fallback assignment based on context analysis";
const CORRECTIVE_DESCRIPTION: &str =
    "Assess situation appropriately and provide guidance on proper emergency procedures.";

#[derive(Debug, Clone, Copy)]
pub struct HeuristicInput<'a> {
    pub help_text: &'a str,
    pub emergency_type: &'a str,
    pub urgency: &'a str,
    pub location: Coordinates,
    /// Name of the closest known resource, if any.
    pub nearest_resource: Option<&'a str>,
}

pub fn templated_description(help_text: &str, location: &Coordinates) -> String {
    format!(
        "Assist person needing {help_text} at location ({}, {}).",
        location.latitude, location.longitude
    )
}

/// Ordered keyword rules:
/// 1. inappropriate content -> volunteers with a corrective description;
/// 2. (mass casualty or complex emergency) and (needs responders or urgent) -> both;
/// 3. needs responders or urgent -> first responders;
/// 4. otherwise volunteers.
pub fn heuristic_draft(input: &HeuristicInput<'_>) -> TaskDraft {
    let help = input.help_text.to_lowercase();
    let emergency = input.emergency_type.to_lowercase();

    if mentions_any(&help, INAPPROPRIATE) {
        return TaskDraft {
            description: CORRECTIVE_DESCRIPTION.to_string(),
            assignment: RoleAssignment::Volunteer,
            reasoning: Some(HEURISTIC_REASONING.to_string()),
            resource_utilization: None,
        };
    }

    let mass_casualty = mentions_any(&help, MASS_CASUALTY);
    let complex_emergency = mentions_any(&emergency, COMPLEX_EMERGENCY);
    let needs_first_responder = mentions_any(&help, NEEDS_FIRST_RESPONDER);
    let high_urgency = HIGH_URGENCY_LEVELS.contains(&input.urgency.trim().to_lowercase().as_str())
        || mentions_any(&help, URGENT_WORDS);

    let assignment = if (mass_casualty || complex_emergency) && (needs_first_responder || high_urgency)
    {
        RoleAssignment::Both
    } else if needs_first_responder || high_urgency {
        RoleAssignment::FirstResponder
    } else {
        RoleAssignment::Volunteer
    };

    let mut description = templated_description(input.help_text, &input.location);
    let mut resource_utilization = None;
    if let Some(name) = input.nearest_resource {
        description.push_str(&format!(" Coordinate with {name} for assistance."));
        resource_utilization = Some(format!("Coordinate with {name}"));
    }

    TaskDraft {
        description,
        assignment,
        reasoning: Some(HEURISTIC_REASONING.to_string()),
        resource_utilization,
    }
}

fn mentions_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input<'a>(help_text: &'a str, emergency_type: &'a str, urgency: &'a str) -> HeuristicInput<'a> {
        HeuristicInput {
            help_text,
            emergency_type,
            urgency,
            location: Coordinates::new(12.0, 77.0),
            nearest_resource: None,
        }
    }

    #[test]
    fn trapped_in_fire_with_high_urgency_needs_first_responders() {
        let draft = heuristic_draft(&input("trapped on second floor, fire spreading", "wildfire", "high"));
        assert_eq!(draft.assignment, RoleAssignment::FirstResponder);
    }

    #[test]
    fn mass_casualty_with_rescue_needs_both() {
        let draft = heuristic_draft(&input("many people trapped near the fire", "wildfire", "high"));
        assert_eq!(draft.assignment, RoleAssignment::Both);
    }

    #[test]
    fn complex_emergency_type_with_urgency_needs_both() {
        let draft = heuristic_draft(&input("need water", "major flood", "urgent"));
        assert_eq!(draft.assignment, RoleAssignment::Both);
    }

    #[test]
    fn basic_needs_go_to_volunteers() {
        let draft = heuristic_draft(&input("need blankets and water", "flood", "low"));
        assert_eq!(draft.assignment, RoleAssignment::Volunteer);
        assert_eq!(
            draft.description,
            "Assist person needing need blankets and water at location (12, 77)."
        );
    }

    #[test]
    fn inappropriate_requests_get_corrective_volunteer_task() {
        let mut request = input("haha this is a prank, send a fire truck", "fire", "high");
        request.nearest_resource = Some("Central Shelter");
        let draft = heuristic_draft(&request);
        assert_eq!(draft.assignment, RoleAssignment::Volunteer);
        assert_eq!(draft.description, CORRECTIVE_DESCRIPTION);
        assert!(!draft.description.contains("Central Shelter"));
    }

    #[test]
    fn nearest_resource_is_referenced() {
        let mut request = input("need insulin", "flood", "medium");
        request.nearest_resource = Some("Central Shelter");
        let draft = heuristic_draft(&request);
        assert!(draft
            .description
            .ends_with("Coordinate with Central Shelter for assistance."));
    }
}
