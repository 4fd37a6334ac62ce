// src/job_extraction/extractor.rs
use super::vocabulary::{detect_requirements, detect_skills};
use super::JobRecord;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

pub const TITLE_NOT_FOUND: &str = "Job Title Not Found";
pub const DESCRIPTION_NOT_FOUND: &str = "Job description not found";

/// A description candidate must be strictly longer than this many characters.
pub const MIN_DESCRIPTION_CHARS: usize = 100;

#[derive(Debug, Clone, Copy)]
enum Layout {
    /// All text nodes concatenated, then trimmed; inner whitespace is kept
    Plain,
    /// Each text node trimmed and empty ones dropped, concatenated as is
    Stripped,
    /// Each text node trimmed, empty ones dropped, joined by newlines
    Lines,
}

#[derive(Debug, Clone, Copy)]
enum Source {
    /// First element matching a CSS selector
    Css(&'static str),
    /// Every non-empty `<p>`, joined by newlines
    Paragraphs,
    /// The document `<title>`
    PageTitle,
}

/// One link of a selector chain: where to look, how to flatten the text and
/// whether the result is acceptable.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    source: Source,
    layout: Layout,
    accept: fn(&str) -> bool,
}

impl Rule {
    const fn css(selector: &'static str, layout: Layout, accept: fn(&str) -> bool) -> Self {
        Self {
            source: Source::Css(selector),
            layout,
            accept,
        }
    }

    fn apply(&self, document: &Html) -> Option<String> {
        let text = match self.source {
            Source::Css(css) => {
                let selector = Selector::parse(css).ok()?;
                let element = document.select(&selector).next()?;
                element_text(element, self.layout)
            }
            Source::Paragraphs => {
                let selector = Selector::parse("p").ok()?;
                document
                    .select(&selector)
                    .map(|p| element_text(p, self.layout))
                    .filter(|text| !text.is_empty())
                    .collect::<Vec<_>>()
                    .join("\n")
            }
            Source::PageTitle => {
                let selector = Selector::parse("title").ok()?;
                let element = document.select(&selector).next()?;
                element_text(element, self.layout)
            }
        };

        (self.accept)(&text).then_some(text)
    }
}

fn non_empty(text: &str) -> bool {
    !text.is_empty()
}

fn substantial(text: &str) -> bool {
    text.chars().count() > MIN_DESCRIPTION_CHARS
}

pub const TITLE_RULES: &[Rule] = &[
    Rule::css("h1.job-title", Layout::Plain, non_empty),
    Rule::css("h1[data-testid='job-title']", Layout::Plain, non_empty),
    Rule::css(".job-title h1", Layout::Plain, non_empty),
    Rule::css("h1", Layout::Plain, non_empty),
    Rule::css(".title", Layout::Plain, non_empty),
    Rule::css("[data-testid='job-title']", Layout::Plain, non_empty),
    Rule::css(".job-header h1", Layout::Plain, non_empty),
    Rule::css(".job-details h1", Layout::Plain, non_empty),
    Rule {
        source: Source::PageTitle,
        layout: Layout::Plain,
        accept: non_empty,
    },
];

pub const COMPANY_RULES: &[Rule] = &[
    Rule::css(".company-name", Layout::Plain, non_empty),
    Rule::css("[data-testid='company-name']", Layout::Plain, non_empty),
    Rule::css(".job-company", Layout::Plain, non_empty),
    Rule::css(".employer-name", Layout::Plain, non_empty),
    Rule::css(".company", Layout::Plain, non_empty),
    Rule::css(".job-header .company", Layout::Plain, non_empty),
    Rule::css(".job-details .company", Layout::Plain, non_empty),
];

pub const DESCRIPTION_RULES: &[Rule] = &[
    Rule::css(".job-description", Layout::Lines, substantial),
    Rule::css("[data-testid='job-description']", Layout::Lines, substantial),
    Rule::css(".job-details", Layout::Lines, substantial),
    Rule::css(".description", Layout::Lines, substantial),
    Rule::css(".job-content", Layout::Lines, substantial),
    Rule::css(".job-body", Layout::Lines, substantial),
    Rule::css(".job-summary", Layout::Lines, substantial),
    Rule {
        source: Source::Paragraphs,
        layout: Layout::Stripped,
        accept: substantial,
    },
];

/// Evaluate a chain in order; the first acceptable text wins.
pub fn first_match(document: &Html, rules: &[Rule]) -> Option<String> {
    rules.iter().find_map(|rule| rule.apply(document))
}

/// Extract a job record from raw HTML. Never fails: missing pieces become
/// sentinels (title, description), `None` (company) or empty lists.
pub fn extract(html: &str, source_url: &str) -> JobRecord {
    let document = Html::parse_document(html);

    let title = first_match(&document, TITLE_RULES).unwrap_or_else(|| TITLE_NOT_FOUND.to_string());
    let company = first_match(&document, COMPANY_RULES);
    let description = first_match(&document, DESCRIPTION_RULES)
        .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string());

    let skills = detect_skills(&description);
    let requirements = detect_requirements(&description);

    debug!(
        "Extracted '{}' from {} (company: {:?}, description: {} chars)",
        title,
        source_url,
        company,
        description.chars().count()
    );

    JobRecord {
        title,
        company,
        description,
        skills,
        requirements,
    }
}

fn element_text(element: ElementRef<'_>, layout: Layout) -> String {
    match layout {
        Layout::Plain => element.text().collect::<String>().trim().to_string(),
        Layout::Stripped => element
            .text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect(),
        Layout::Lines => element
            .text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    }
}
