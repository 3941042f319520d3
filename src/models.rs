use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::ScrapeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JobType {
    #[default]
    All,
    Internship,
    FullTime,
    PartTime,
}

impl FromStr for JobType {
    type Err = ScrapeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect();
        match normalized.as_str() {
            "" | "all" => Ok(JobType::All),
            "internship" | "stage" => Ok(JobType::Internship),
            "fulltime" | "cdi" => Ok(JobType::FullTime),
            "parttime" | "cdd" => Ok(JobType::PartTime),
            _ => Err(ScrapeError::Config(format!("unknown job type '{}'", s))),
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobType::All => "All",
            JobType::Internship => "Internship",
            JobType::FullTime => "Full-time",
            JobType::PartTime => "Part-time",
        };
        f.write_str(label)
    }
}

/// One search request. Never mutated by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub keywords: String,
    pub location: String,
    pub job_type: JobType,
    pub page: u32,
    pub fetch_all_pages: bool,
    pub max_pages: u32,
}

impl SearchCriteria {
    pub fn new(keywords: impl Into<String>, location: impl Into<String>) -> Self {
        SearchCriteria {
            keywords: keywords.into(),
            location: location.into(),
            job_type: JobType::All,
            page: 1,
            fetch_all_pages: false,
            max_pages: 3,
        }
    }

    pub fn with_job_type(mut self, job_type: JobType) -> Self {
        self.job_type = job_type;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn all_pages(mut self, max_pages: u32) -> Self {
        self.fetch_all_pages = true;
        self.max_pages = max_pages;
        self
    }
}

/// A result card. Any field may be missing without invalidating the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub link: Option<String>,
    /// Filled in later by a detail fetch keyed by `link`.
    #[serde(rename = "text")]
    pub detail_text: Option<String>,
}

impl JobSummary {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.company.is_none() && self.location.is_none() && self.link.is_none()
    }
}

/// Best-effort text of a job page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetail {
    /// The site's expected content skeleton (section + heading) was present.
    pub structure_found: bool,
    pub raw_text: String,
    pub cleaned_text: String,
    pub heading_text: Option<String>,
    pub lead_paragraph_text: Option<String>,
    pub excluded_fragments: Vec<String>,
}

impl JobDetail {
    pub fn new(raw_text: String, excluded_fragments: Vec<String>) -> Self {
        let cleaned_text = remove_fragments(&raw_text, &excluded_fragments);
        JobDetail {
            structure_found: false,
            raw_text,
            cleaned_text,
            heading_text: None,
            lead_paragraph_text: None,
            excluded_fragments,
        }
    }
}

/// Removes one occurrence of each fragment, in order.
pub fn remove_fragments(text: &str, fragments: &[String]) -> String {
    let mut cleaned = text.to_string();
    for fragment in fragments.iter().filter(|f| !f.is_empty()) {
        cleaned = cleaned.replacen(fragment.as_str(), "", 1);
    }
    cleaned
}

/// Labels made only of punctuation (a lone "×", "…", "+") say nothing about the page.
pub fn is_punctuation_only(text: &str) -> bool {
    let trimmed = text.trim();
    trimmed.is_empty()
        || trimmed
            .chars()
            .all(|c| c.is_ascii_punctuation() || c.is_whitespace() || matches!(c, '…' | '×' | '·' | '•' | '–' | '—' | '«' | '»'))
}
