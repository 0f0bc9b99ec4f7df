use regex::Regex;
use reqwest::{Client, StatusCode};
use std::sync::OnceLock;
use tracing::debug;

use super::{StatusSource, StatusSourceError};

pub const USCIS_STATUS_URL: &str = "https://egov.uscis.gov/casestatus/mycasestatus.do";

/// Regexes used to scrape the status page, compiled once.
struct StatusRegex {
    section_open: Regex,
    tag: Regex,
    whitespace: Regex,
}

impl StatusRegex {
    fn get() -> Option<&'static Self> {
        static INSTANCE: OnceLock<Option<StatusRegex>> = OnceLock::new();
        INSTANCE
            .get_or_init(|| {
                Some(Self {
                    section_open: Regex::new(
                        r#"(?is)<div\b[^>]*\bclass\s*=\s*["'][^"']*\bcurrent-status-sec\b[^"']*["'][^>]*>"#,
                    )
                    .ok()?,
                    tag: Regex::new(r"(?s)<!--.*?-->|<(/?)([A-Za-z][A-Za-z0-9]*)\b[^>]*>").ok()?,
                    whitespace: Regex::new(r"\s+").ok()?,
                })
            })
            .as_ref()
    }
}

/// Extracts the text of the `current-status-sec` block. `<strong>` and
/// `<span>` elements are dropped together with everything inside them;
/// other tags only lose their markup.
#[must_use]
pub fn parse_status(html: &str) -> Option<String> {
    let re = StatusRegex::get()?;
    let body = &html[re.section_open.find(html)?.end()..];

    let mut text = String::new();
    let mut div_depth = 1usize;
    let mut hidden_depth = 0usize;
    let mut pos = 0;

    for caps in re.tag.captures_iter(body) {
        let Some(tag) = caps.get(0) else { continue };
        if hidden_depth == 0 {
            text.push_str(&body[pos..tag.start()]);
        }
        text.push(' ');
        pos = tag.end();

        let Some(name) = caps.get(2) else { continue };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        if tag.as_str().ends_with("/>") {
            continue;
        }

        let name = name.as_str().to_ascii_lowercase();
        match (name.as_str(), closing) {
            ("div", false) => div_depth += 1,
            ("div", true) => {
                div_depth -= 1;
                if div_depth == 0 {
                    break;
                }
            }
            ("strong" | "span", false) => hidden_depth += 1,
            ("strong" | "span", true) => hidden_depth = hidden_depth.saturating_sub(1),
            _ => {}
        }
    }
    if div_depth > 0 && hidden_depth == 0 {
        text.push_str(&body[pos..]);
    }

    let decoded = html_escape::decode_html_entities(&text);
    Some(re.whitespace.replace_all(decoded.trim(), " ").into_owned())
}

/// Form fields of the status search, as the USCIS page submits them.
fn status_form(case_id: &str) -> [(&'static str, &str); 4] {
    [
        ("completedActionsCurrentPage", "0"),
        ("upcomingActionsCurrentPage", "0"),
        ("appReceiptNum", case_id),
        ("caseStatusSearchBtn", "CHECK+STATUS"),
    ]
}

#[derive(Clone)]
pub struct UscisClient {
    client: Client,
    status_url: String,
}

impl UscisClient {
    #[must_use]
    pub fn with_shared_client(client: Client, status_url: &str) -> Self {
        Self {
            client,
            status_url: status_url.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl StatusSource for UscisClient {
    async fn fetch_status(&self, case_id: &str) -> Result<String, StatusSourceError> {
        let response = self
            .client
            .post(&self.status_url)
            .form(&status_form(case_id))
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(StatusSourceError::UnexpectedResponse(response.status()));
        }

        let html = response.text().await?;
        let status =
            parse_status(&html).ok_or_else(|| StatusSourceError::StatusNotFound(case_id.to_string()))?;

        debug!(case_id, status = %status, "Fetched case status");
        Ok(status)
    }
}
