use regex::Regex;
use reqwest::StatusCode;
use std::sync::OnceLock;
use std::time::{Duration, Instant};
use crate::error::FetchError;
use crate::metrics::{UPSTREAM_FAILURES, UPSTREAM_LATENCY};
use crate::models::ElevationData;

const MODELS: [&str; 3] = ["EGM2008", "EGM96", "EGM84"];

// Client for the GeoidEval calculator page
pub struct GeoidClient {
    client: reqwest::Client,
    url: String,
}

impl GeoidClient {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    // Look up the geoid heights of one point, dropping the future aborts the request
    pub async fn fetch(&self, lat: f64, lon: f64) -> Result<ElevationData, FetchError> {
        let start = Instant::now();
        let result = self.fetch_page(lat, lon).await.and_then(|page| parse_page(&page));
        UPSTREAM_LATENCY.observe(start.elapsed().as_secs_f64());

        if result.is_err() {
            UPSTREAM_FAILURES.inc();
        }
        result
    }

    async fn fetch_page(&self, lat: f64, lon: f64) -> Result<String, FetchError> {
        let input = format!("{} {}", lat, lon);
        let res = self
            .client
            .get(&self.url)
            .query(&[("input", input.as_str()), ("option", "Submit")])
            .send()
            .await?;

        let status = res.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status));
        }
        Ok(res.text().await?)
    }
}

// Opening tag of the section holding the heights: <font size="4">
fn section_open_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<font\b[^>]*?\bsize\s*=\s*(?:"4"|'4'|4\b)[^>]*>"#)
            .expect("built-in section regex must compile")
    })
}

fn font_tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</?font\b[^>]*>").expect("built-in font regex must compile"))
}

// Inner HTML of the first size 4 font element, nested font tags included.
// An unclosed element runs to the end of the page.
fn find_section(html: &str) -> Option<&str> {
    let open = section_open_regex().find(html)?;
    let body = &html[open.end()..];

    let mut depth = 1;
    for tag in font_tag_regex().find_iter(body) {
        if tag.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Some(&body[..tag.start()]);
            }
        } else {
            depth += 1;
        }
    }
    Some(body)
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("built-in tag regex must compile"))
}

fn model_regexes() -> &'static [Regex; 3] {
    static RES: OnceLock<[Regex; 3]> = OnceLock::new();
    RES.get_or_init(|| {
        MODELS.map(|name| {
            Regex::new(&format!(r"\b{}\s*=\s*([+-]?\d+(?:\.\d+)?)", name))
                .expect("built-in model regex must compile")
        })
    })
}

// Pull the three model heights out of the calculator's HTML
pub fn parse_page(html: &str) -> Result<ElevationData, FetchError> {
    let section = find_section(html).ok_or(FetchError::MissingSection)?;

    let text = tag_regex().replace_all(section, " ");
    let text = text.replace("&nbsp;", " ");

    let mut values = [0.0; 3];
    for ((name, re), slot) in MODELS.into_iter().zip(model_regexes()).zip(values.iter_mut()) {
        let raw = re
            .captures(&text)
            .and_then(|c| c.get(1))
            .ok_or(FetchError::MissingModel(name))?;
        *slot = raw
            .as_str()
            .parse()
            .map_err(|_| FetchError::InvalidNumber(name, raw.as_str().to_string()))?;
    }

    let [egm2008, egm96, egm84] = values;
    Ok(ElevationData { egm2008, egm96, egm84 })
}
