//! Prompt text sent to the ranking provider.

use serde::Serialize;

use crate::common::GymId;
use crate::domains::directory::{Location, LocationKind, RankingCandidate};

use super::ranking::BatchRankingInput;

/// Prompt asking for a ranked id list for a single location.
pub fn single_location_prompt(candidates: &[RankingCandidate], location: &Location) -> String {
    let place = location.label();
    let gym_list = serde_json::to_string_pretty(candidates).unwrap_or_else(|_| "[]".to_string());

    format!(
        r#"You are a fitness industry expert curating a "Best Gyms" directory page.

Below is a list of gyms in our database for {place}. Each entry has an "id" (integer) and "name" (string):
{gym_list}

Use web search to research these gyms and identify which ones are the most popular, highest-rated, and best-regarded fitness centers in {place}. Consider: Google star rating, total number of customer reviews, brand reputation, and overall quality.

Return ONLY a valid JSON array of the gym IDs (integers) in ranked order, best first, maximum 10 gyms. Only include gyms that are genuinely popular and well-regarded. Do not include any explanation, markdown formatting, or extra text. Output the raw JSON array only.

Example output: [42, 7, 15, 3]"#
    )
}

#[derive(Serialize)]
struct ExampleEntry<'a> {
    location: &'a str,
    #[serde(rename = "type")]
    kind: LocationKind,
    gym_ids: Vec<GymId>,
}

/// Prompt asking for ranked id lists for several locations in one answer.
pub fn batch_prompt(inputs: &[BatchRankingInput]) -> String {
    let mut blocks = String::new();
    for input in inputs {
        let context = match input.location.kind() {
            LocationKind::City => format!("city in {}", input.location.state),
            LocationKind::State => "state".to_string(),
        };
        let gyms = serde_json::to_string(&input.candidates).unwrap_or_else(|_| "[]".to_string());
        blocks.push_str(&format!(
            "\nLocation \"{}\" ({}):\n{}\n",
            input.location.label(),
            context,
            gyms
        ));
    }

    let example = serde_json::to_string_pretty(&[
        ExampleEntry {
            location: "Austin, Texas",
            kind: LocationKind::City,
            gym_ids: vec![GymId::new(3), GymId::new(1)],
        },
        ExampleEntry {
            location: "Texas",
            kind: LocationKind::State,
            gym_ids: vec![GymId::new(7), GymId::new(5), GymId::new(6)],
        },
    ])
    .unwrap_or_default();

    format!(
        r#"You are a fitness industry expert curating "Best Gyms" directory pages.

Below are gyms from multiple locations. For each location, research the gyms by their IDs (provided below) and rank them by real-world popularity, Google star rating, total review count, and overall reputation. Only include gyms that are genuinely popular and well-regarded.
{blocks}
Your response should be a JSON array in the following format:

{example}

Notes:
- "location" must match the location name exactly as provided.
- "type" must be either "city" or "state", as given.
- "gym_ids" must be ranked with the best gyms first (based on popularity, reviews, and reputation).
- Return only gyms that are genuinely popular and well-regarded.
- If there are more than 10 gyms per location, limit the list to the top 10.

Only return the raw JSON array, with no markdown and no explanation."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates() -> Vec<RankingCandidate> {
        vec![
            RankingCandidate {
                id: GymId::new(1),
                name: "Iron Temple".to_string(),
            },
            RankingCandidate {
                id: GymId::new(2),
                name: "Pulse Fitness".to_string(),
            },
        ]
    }

    #[test]
    fn test_single_prompt_embeds_location_and_candidates() {
        let prompt = single_location_prompt(&candidates(), &Location::city("Texas", "Austin"));
        assert!(prompt.contains("for Austin, Texas"));
        assert!(prompt.contains("\"name\": \"Pulse Fitness\""));
        assert!(prompt.contains("maximum 10 gyms"));
    }

    #[test]
    fn test_batch_prompt_lists_each_location() {
        let inputs = vec![
            BatchRankingInput::new(Location::city("Texas", "Austin"), candidates()),
            BatchRankingInput::new(Location::state_wide("Texas"), candidates()),
        ];
        let prompt = batch_prompt(&inputs);
        assert!(prompt.contains("Location \"Austin, Texas\" (city in Texas):"));
        assert!(prompt.contains("Location \"Texas\" (state):"));
        assert!(prompt.contains("\"type\": \"city\""));
    }
}
