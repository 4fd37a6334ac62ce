// src/job_extraction/vocabulary.rs
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub const SKILL_VOCABULARY: &[&str] = &[
    "python",
    "javascript",
    "java",
    "react",
    "angular",
    "vue",
    "node.js",
    "sql",
    "postgresql",
    "mysql",
    "mongodb",
    "redis",
    "docker",
    "kubernetes",
    "aws",
    "azure",
    "gcp",
    "git",
    "jenkins",
    "ci/cd",
    "agile",
    "scrum",
    "machine learning",
    "ai",
    "data science",
    "analytics",
    "tableau",
    "power bi",
    "excel",
    "salesforce",
    "crm",
    "api",
    "rest",
    "graphql",
    "microservices",
    "devops",
    "linux",
    "bash",
    "powershell",
];

// Captures run up to the next period or comma; the experience pattern
// captures only the number of years.
const REQUIREMENT_PATTERNS: &[&str] = &[
    r"(\d+)\+?\s*years?\s*(?:of\s*)?experience",
    r"degree\s*in\s*([^.,]+)",
    r"bachelor'?s?\s*(?:degree\s*)?in\s*([^.,]+)",
    r"master'?s?\s*(?:degree\s*)?in\s*([^.,]+)",
    r"phd\s*(?:in\s*)?([^.,]+)",
    r"certification\s*in\s*([^.,]+)",
    r"proficient\s*in\s*([^.,]+)",
    r"experience\s*with\s*([^.,]+)",
    r"knowledge\s*of\s*([^.,]+)",
];

fn requirement_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        REQUIREMENT_PATTERNS
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    })
}

/// Upper-case every letter that follows a non-letter, lower-case the rest
/// ("node.js" -> "Node.Js", "ci/cd" -> "Ci/Cd").
pub fn title_case(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut previous_is_letter = false;

    for ch in text.chars() {
        if ch.is_alphabetic() {
            if previous_is_letter {
                result.extend(ch.to_lowercase());
            } else {
                result.extend(ch.to_uppercase());
            }
            previous_is_letter = true;
        } else {
            result.push(ch);
            previous_is_letter = false;
        }
    }

    result
}

/// Substring search of the vocabulary in the description, case-insensitive.
/// Result is de-duplicated and sorted.
pub fn detect_skills(description: &str) -> Vec<String> {
    let text = description.to_lowercase();

    SKILL_VOCABULARY
        .iter()
        .filter(|skill| text.contains(*skill))
        .map(|skill| title_case(skill))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn detect_requirements(description: &str) -> Vec<String> {
    let text = description.to_lowercase();

    requirement_patterns()
        .iter()
        .flat_map(|pattern| pattern.captures_iter(&text))
        .filter_map(|captures| captures.get(1))
        .map(|capture| capture.as_str().trim())
        .filter(|capture| !capture.is_empty())
        .map(title_case)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
