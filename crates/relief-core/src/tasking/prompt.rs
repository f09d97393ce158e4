use crate::geo::Coordinates;
use crate::proximity::Ranked;
use crate::services::PromptPart;
use crate::types::ResourceCandidate;

/// Inputs shared by both task prompts.
#[derive(Debug, Clone)]
pub struct TaskContext {
    pub emergency_type: String,
    pub help_text: String,
    pub urgency: String,
    pub location: Coordinates,
    pub resources: Vec<Ranked<ResourceCandidate>>,
}

pub fn assignment_prompt(context: &TaskContext, resource_limit: usize) -> Vec<PromptPart> {
    let resource_info = describe_resources(&context.resources, resource_limit);
    let text = format!(
        r#"You are an emergency response coordinator AI. A citizen has submitted an emergency request that requires immediate response. Analyze the situation and determine both the appropriate response task AND which responder roles are needed.

EMERGENCY REQUEST DETAILS:
Emergency Type: {emergency_type}
Help Needed: {help}
Urgency Level: {urgency}
Location: ({lat}, {lon})

{resource_info}

AVAILABLE RESPONDER ROLES:
- "vol" (Volunteers): Community volunteers for basic needs, logistics, welfare checks
- "fr" (First Responders): Professional emergency responders for medical/rescue/safety
- "both": For complex situations requiring both professional expertise AND community support

ROLE ASSIGNMENT RULES:
1. Use "both" when: Mass casualty events, complex disasters, large-scale evacuations
2. Use "fr" when: Medical emergencies, technical rescues, life-threatening situations
3. Use "vol" when: Basic needs, welfare checks, non-emergency logistics

Generate JSON response:
{{
    "description": "Direct task for responders (max 2 sentences)",
    "roles": "exactly one: 'vol', 'fr', or 'both'",
    "reasoning": "Brief explanation of role assignment",
    "resource_utilization": "How to use nearby resources or 'none'"
}}

Respond ONLY with valid JSON."#,
        emergency_type = context.emergency_type,
        help = context.help_text,
        urgency = context.urgency,
        lat = context.location.latitude,
        lon = context.location.longitude,
    );
    vec![PromptPart::Text(text)]
}

pub fn retry_prompt(context: &TaskContext) -> Vec<PromptPart> {
    let text = format!(
        r#"Emergency: {help}
Type: {emergency_type}, Urgency: {urgency}

JSON response:
{{
    "description": "Task for responding to {help} at ({lat}, {lon})",
    "roles": "choose one: 'vol', 'fr', or 'both'"
}}"#,
        help = context.help_text,
        emergency_type = context.emergency_type,
        urgency = context.urgency,
        lat = context.location.latitude,
        lon = context.location.longitude,
    );
    vec![PromptPart::Text(text)]
}

fn describe_resources(resources: &[Ranked<ResourceCandidate>], limit: usize) -> String {
    if resources.is_empty() {
        return "No nearby resources identified.".to_string();
    }

    let blocks: Vec<String> = resources
        .iter()
        .take(limit)
        .map(|ranked| {
            let resource = &ranked.item;
            format!(
                "- {}: {} at ({}, {})\n  Description: {}\n  Contact: {}\n  Status: {}\n",
                resource.name.as_deref().unwrap_or("Unknown"),
                resource.resource_type.as_deref().unwrap_or("general"),
                resource.latitude.unwrap_or_default(),
                resource.longitude.unwrap_or_default(),
                resource.description.as_deref().unwrap_or("No description"),
                resource.contact.as_deref().unwrap_or("No contact"),
                resource.status.as_deref().unwrap_or("unknown"),
            )
        })
        .collect();
    format!("Available nearby resources:\n{}", blocks.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(name: &str, distance: f64) -> Ranked<ResourceCandidate> {
        Ranked {
            item: ResourceCandidate {
                resource_id: name.to_lowercase(),
                latitude: Some(1.0),
                longitude: Some(2.0),
                name: Some(name.to_string()),
                resource_type: Some("shelter".into()),
                description: None,
                contact: None,
                status: Some("open".into()),
            },
            distance,
        }
    }

    fn context(resources: Vec<Ranked<ResourceCandidate>>) -> TaskContext {
        TaskContext {
            emergency_type: "flood".into(),
            help_text: "stuck on roof".into(),
            urgency: "high".into(),
            location: Coordinates::new(1.5, 2.5),
            resources,
        }
    }

    fn text(parts: Vec<PromptPart>) -> String {
        match parts.into_iter().next() {
            Some(PromptPart::Text(text)) => text,
            other => panic!("unexpected prompt part: {other:?}"),
        }
    }

    #[test]
    fn assignment_prompt_lists_at_most_limit_resources() {
        let resources = vec![
            resource("Alpha", 0.1),
            resource("Bravo", 0.2),
            resource("Charlie", 0.3),
            resource("Delta", 0.4),
        ];
        let prompt = text(assignment_prompt(&context(resources), 3));
        assert!(prompt.contains("- Alpha: shelter at (1, 2)"));
        assert!(prompt.contains("Charlie"));
        assert!(!prompt.contains("Delta"));
        assert!(prompt.contains("Description: No description\n  Contact: No contact\n  Status: "));
        assert!(prompt.contains("Help Needed: stuck on roof"));
    }

    #[test]
    fn assignment_prompt_without_resources_says_so() {
        let prompt = text(assignment_prompt(&context(Vec::new()), 3));
        assert!(prompt.contains("No nearby resources identified."));
    }

    #[test]
    fn retry_prompt_is_minimal() {
        let prompt = text(retry_prompt(&context(Vec::new())));
        assert!(prompt.starts_with("Emergency: stuck on roof"));
        assert!(prompt.contains("\"roles\""));
        assert!(!prompt.contains("reasoning"));
    }
}
