use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{error, info, warn};
use serde::Deserialize;

use crate::models::{JobType, SearchCriteria};
use crate::sites::Site;

/// One row of a batch search file.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchRow {
    #[serde(rename = "Site", alias = "site", alias = "Source", alias = "source")]
    pub site: String,
    #[serde(rename = "Keywords", alias = "keywords", alias = "Job Title", alias = "query")]
    pub keywords: String,
    #[serde(rename = "Location", alias = "location", default)]
    pub location: String,
    #[serde(rename = "Job Type", alias = "job_type", alias = "Contract", default)]
    pub job_type: Option<String>,
    #[serde(rename = "Page", alias = "page", default)]
    pub page: Option<u32>,
    #[serde(rename = "All Pages", alias = "all_pages", default)]
    pub all_pages: Option<bool>,
    #[serde(rename = "Max Pages", alias = "max_pages", default)]
    pub max_pages: Option<u32>,
}

/// A validated row: which site to ask and what to ask it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub site: Site,
    pub criteria: SearchCriteria,
}

impl SearchRow {
    fn into_request(self, default_max_pages: u32) -> Result<SearchRequest, String> {
        let site: Site = self.site.parse().map_err(|e| format!("{}", e))?;
        if self.keywords.trim().is_empty() {
            return Err("empty keywords".to_string());
        }
        let job_type: JobType = self
            .job_type
            .as_deref()
            .unwrap_or_default()
            .parse()
            .map_err(|e| format!("{}", e))?;

        let mut criteria = SearchCriteria::new(self.keywords.trim(), self.location.trim())
            .with_job_type(job_type)
            .with_page(self.page.unwrap_or(1));
        if self.all_pages.unwrap_or(false) {
            criteria = criteria.all_pages(self.max_pages.unwrap_or(default_max_pages));
        }
        Ok(SearchRequest { site, criteria })
    }
}

/// Reads search requests from a CSV file. Unreadable or invalid rows are
/// logged and skipped.
pub fn load_requests<P: AsRef<Path>>(filename: P, default_max_pages: u32) -> Vec<SearchRequest> {
    let path = filename.as_ref();
    if !path.exists() {
        error!("Input file {:?} does not exist.", path);
        return Vec::new();
    }
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            error!("Could not open CSV file: {}", e);
            return Vec::new();
        }
    };
    let requests = read_requests(file, default_max_pages);
    info!("Loaded {} search requests from {:?}", requests.len(), path);
    requests
}

pub fn read_requests<R: Read>(reader: R, default_max_pages: u32) -> Vec<SearchRequest> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut requests = Vec::new();
    for (line, result) in rdr.deserialize::<SearchRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                error!("Error parsing CSV record: {}", e);
                continue;
            }
        };
        match row.into_request(default_max_pages) {
            Ok(request) => requests.push(request),
            Err(reason) => warn!("Skipping row {}: {}", line + 1, reason),
        }
    }
    requests
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reads_rows_with_defaults() {
        let csv = "\
Site,Keywords,Location,Job Type,Page,All Pages,Max Pages
hellowork,data scientist,Athis-Mons 91200,Internship,,,
wttj, ml engineer ,\"Paris, France\",full-time,2,true,
";
        let requests = read_requests(csv.as_bytes(), 3);
        assert_eq!(requests.len(), 2);

        assert_eq!(requests[0].site, Site::HelloWork);
        assert_eq!(
            requests[0].criteria,
            SearchCriteria::new("data scientist", "Athis-Mons 91200").with_job_type(JobType::Internship)
        );

        assert_eq!(requests[1].site, Site::WelcomeToTheJungle);
        assert_eq!(requests[1].criteria.keywords, "ml engineer");
        assert_eq!(requests[1].criteria.location, "Paris, France");
        assert_eq!(requests[1].criteria.page, 2);
        assert!(requests[1].criteria.fetch_all_pages);
        assert_eq!(requests[1].criteria.max_pages, 3);
    }

    #[test]
    fn test_lowercase_headers_and_missing_columns() {
        let csv = "site,keywords\nwttj,data\n";
        let requests = read_requests(csv.as_bytes(), 3);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].criteria.location, "");
        assert_eq!(requests[0].criteria.job_type, JobType::All);
    }

    #[test]
    fn test_invalid_rows_are_skipped() {
        let csv = "\
Site,Keywords,Location,Job Type
indeed,data,Paris,
hellowork,,Paris,
hellowork,data,Paris,freelance
hellowork,data,Paris,cdi
";
        let requests = read_requests(csv.as_bytes(), 3);
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].criteria.job_type, JobType::FullTime);
    }

    #[test]
    fn test_missing_file_is_empty() {
        assert!(load_requests("/nonexistent/searches.csv", 3).is_empty());
    }
}
