//! Web page fetching and paragraph scraping.

use super::AcquisitionError;
use reqwest::{Client, header::USER_AGENT};
use scraper::{Html, Selector};
use std::sync::OnceLock;

static PARAGRAPH: OnceLock<Selector> = OnceLock::new();

/// GET `url` with a browser-like user agent and return the body of a 2xx response.
pub(super) async fn fetch_page(
    client: &Client,
    url: &str,
    user_agent: &str,
) -> Result<String, AcquisitionError> {
    tracing::info!(url, "Fetching webpage");
    let response = client
        .get(url)
        .header(USER_AGENT, user_agent)
        .send()
        .await
        .map_err(|error| classify_transport_error(url, error))?;

    let status = response.status();
    if !status.is_success() {
        return Err(AcquisitionError::Status {
            url: url.to_string(),
            status,
        });
    }

    response
        .text()
        .await
        .map_err(|error| classify_transport_error(url, error))
}

fn classify_transport_error(url: &str, error: reqwest::Error) -> AcquisitionError {
    if error.is_timeout() {
        AcquisitionError::Timeout(url.to_string())
    } else {
        AcquisitionError::Http(error)
    }
}

/// Concatenate the text of every `<p>` element, separated by single spaces, and trim the result.
pub fn paragraph_text(html: &str) -> String {
    let selector =
        PARAGRAPH.get_or_init(|| Selector::parse("p").expect("static paragraph selector"));
    let document = Html::parse_document(html);
    let paragraphs: Vec<String> = document
        .select(selector)
        .map(|paragraph| paragraph.text().collect::<String>())
        .collect();
    paragraphs.join(" ").trim().to_string()
}
