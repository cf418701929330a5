use crate::listing::error::ListingError;
use crate::listing::filename::SourceFileName;
use chrono::{DateTime, Utc};
use log::info;
use scraper::{Html, Selector};
use std::path::{Path, PathBuf};
use url::Url;

/// Where source files live: an HTTP directory listing or a local folder.
#[derive(Debug, Clone)]
pub enum Source {
    Url(Url),
    Dir(PathBuf),
}

impl Source {
    /// Interprets a user-supplied location. Anything that is not an
    /// http(s) URL or an existing directory is a fatal configuration error.
    pub fn parse(location: &str) -> Result<Self, ListingError> {
        if let Ok(url) = Url::parse(location) {
            if matches!(url.scheme(), "http" | "https") {
                return Ok(Source::Url(url));
            }
        }
        let path = Path::new(location);
        if path.is_dir() {
            return Ok(Source::Dir(path.to_path_buf()));
        }
        Err(ListingError::InvalidSource(location.to_string()))
    }

    /// Resolves the full location of one file under this source.
    pub(crate) fn resolve(&self, filename: &str) -> Result<FileLocation, ListingError> {
        match self {
            Source::Url(url) => {
                let file_url = url
                    .join(filename)
                    .map_err(|e| ListingError::FileUrl(filename.to_string(), e))?;
                Ok(FileLocation::Url(file_url))
            }
            Source::Dir(dir) => Ok(FileLocation::Path(dir.join(filename))),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) enum FileLocation {
    Url(Url),
    Path(PathBuf),
}

/// Enumerates candidate source files and keeps the ones newer than a given
/// watermark.
///
/// Listing order is passed through untouched for remote sources; callers rely
/// on the listing being chronological, which holds for the known sources
/// because the names sort by timestamp. Local directory entries are sorted by
/// name explicitly since filesystem enumeration order guarantees nothing.
pub struct SourceLister {
    http: reqwest::Client,
}

impl SourceLister {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Lists filenames in `source` whose embedded timestamp is strictly newer
    /// than `after`.
    ///
    /// Names not matching the `stations_<date>T<time>Z` pattern are dropped
    /// silently. Fewer than two pattern matches means the source holds no
    /// usable data and is an error; an empty result after the `after` filter
    /// is not (there is simply nothing new to fetch).
    pub async fn list_new(
        &self,
        source: &Source,
        after: DateTime<Utc>,
    ) -> Result<Vec<SourceFileName>, ListingError> {
        let names = match source {
            Source::Url(url) => self.list_remote(url).await?,
            Source::Dir(dir) => list_dir(dir)?,
        };
        let tested = names.len();
        info!("{} names found in source listing", tested);

        let matches: Vec<SourceFileName> = names
            .iter()
            .filter_map(|name| SourceFileName::parse(name))
            .collect();
        if matches.len() < 2 {
            return Err(ListingError::NoMatchingFilenames { tested });
        }
        info!("{} filenames are in the expected format", matches.len());

        let due: Vec<SourceFileName> = matches
            .into_iter()
            .filter(|file| file.timestamp() > after)
            .collect();
        info!("{} filenames are newer than {}", due.len(), after);
        Ok(due)
    }

    async fn list_remote(&self, url: &Url) -> Result<Vec<String>, ListingError> {
        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ListingError::ListingRequest(url.to_string(), e))?;
        let response = response.error_for_status().map_err(|e| {
            if let Some(status) = e.status() {
                ListingError::HttpStatus {
                    url: url.to_string(),
                    status,
                    source: e,
                }
            } else {
                ListingError::ListingRequest(url.to_string(), e)
            }
        })?;
        let body = response
            .text()
            .await
            .map_err(|e| ListingError::ListingRequest(url.to_string(), e))?;
        Ok(extract_link_targets(&body))
    }
}

impl Default for SourceLister {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls the `href` target out of every anchor in an HTML directory listing.
fn extract_link_targets(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let anchors = Selector::parse("a").expect("valid anchor selector");
    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .map(|href| href.to_string())
        .collect()
}

fn list_dir(dir: &Path) -> Result<Vec<String>, ListingError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| ListingError::DirRead(dir.to_path_buf(), e))?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ListingError::DirRead(dir.to_path_buf(), e))?;
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    // Enumeration order is filesystem-dependent; the names sort chronologically.
    names.sort();
    Ok(names)
}
