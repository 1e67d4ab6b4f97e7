//! Extraction of app name and certificate expiration from provisioning profiles.
//!
//! A `.mobileprovision` file is a signed envelope around an XML property list.
//! Only a handful of lines of that plist are read, by fixed convention.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use std::ops::Range;
use std::path::Path;
use tracing::{debug, warn};

use crate::errors::{CertWatchError, CertWatchResult};

/// Lines known to hold the profile's Name entry
const IDENTITY_WINDOW: Range<usize> = 4..7;
const DATE_OPEN: &str = "<date>";
const DATE_CLOSE: &str = "</date>";
const EXPIRATION_KEY: &str = "<key>ExpirationDate</key>";
const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Certificate information for one tracked app
#[derive(Debug, Clone, PartialEq)]
pub struct AppCertInfo {
    pub app_name: String,
    pub expiration: DateTime<Tz>,
    pub cert_path: String,
}

pub struct ProfileParser {
    identity_prefix: String,
    identity_pattern: Regex,
    excluded_keywords: Vec<String>,
    timezone: Tz,
}

impl ProfileParser {
    pub fn new(
        identity_prefix: &str,
        excluded_keywords: &[String],
        timezone: Tz,
    ) -> CertWatchResult<Self> {
        let pattern = format!("<string>{}(.*?)</string>", regex::escape(identity_prefix));
        let identity_pattern = Regex::new(&pattern).map_err(|e| {
            CertWatchError::config(format!("invalid identity prefix '{}': {}", identity_prefix, e))
        })?;

        Ok(Self {
            identity_prefix: identity_prefix.to_string(),
            identity_pattern,
            excluded_keywords: excluded_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            timezone,
        })
    }

    /// Read and parse a profile from disk
    pub async fn parse_file(&self, path: &Path) -> CertWatchResult<Option<AppCertInfo>> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CertWatchError::file_system("read profile", path, e))?;
        self.parse_bytes(&bytes, &path.display().to_string())
    }

    /// Parse raw profile bytes. `Ok(None)` means the app is deliberately not tracked.
    pub fn parse_bytes(&self, bytes: &[u8], cert_path: &str) -> CertWatchResult<Option<AppCertInfo>> {
        let lines: Vec<String> = bytes
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect();
        self.parse_lines(&lines, cert_path)
    }

    pub fn parse_lines(&self, lines: &[String], cert_path: &str) -> CertWatchResult<Option<AppCertInfo>> {
        let app_name = self.extract_app_name(lines, cert_path)?;

        if app_name.trim().is_empty() {
            debug!("Skipping profile with empty app name ({})", cert_path);
            return Ok(None);
        }

        if self.is_excluded(&app_name) {
            debug!("Skipping excluded app '{}' ({})", app_name, cert_path);
            return Ok(None);
        }

        let raw_date = extract_expiration(lines)
            .ok_or_else(|| CertWatchError::parse(cert_path, "expiration date line not found"))?;
        let expiration = self.parse_timestamp(raw_date, cert_path)?;

        Ok(Some(AppCertInfo {
            app_name,
            expiration,
            cert_path: cert_path.to_string(),
        }))
    }

    pub fn is_excluded(&self, app_name: &str) -> bool {
        let lowered = app_name.to_lowercase();
        self.excluded_keywords.iter().any(|k| lowered.contains(k.as_str()))
    }

    fn extract_app_name(&self, lines: &[String], cert_path: &str) -> CertWatchResult<String> {
        let window = lines
            .get(IDENTITY_WINDOW.start..IDENTITY_WINDOW.end.min(lines.len()))
            .unwrap_or_default();

        let line = window
            .iter()
            .find(|line| line.contains(&self.identity_prefix))
            .ok_or_else(|| {
                CertWatchError::parse(
                    cert_path,
                    format!("no line containing '{}'", self.identity_prefix.trim_end()),
                )
            })?;

        match self.identity_pattern.captures(line) {
            Some(captures) => Ok(captures[1].to_string()),
            None => {
                warn!("Could not find app name in: {}", line.trim());
                Err(CertWatchError::parse(
                    cert_path,
                    format!("could not find app name in: {}", line.trim()),
                ))
            }
        }
    }

    fn parse_timestamp(&self, raw: &str, cert_path: &str) -> CertWatchResult<DateTime<Tz>> {
        let naive = NaiveDateTime::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
            CertWatchError::parse(cert_path, format!("invalid expiration date '{}': {}", raw, e))
        })?;
        Ok(Utc.from_utc_datetime(&naive).with_timezone(&self.timezone))
    }
}

/// Find the raw expiration timestamp.
///
/// Prefers the date following the `ExpirationDate` key; otherwise the second
/// `<date>` line of the file (the first being the creation date).
fn extract_expiration(lines: &[String]) -> Option<&str> {
    let keyed = lines
        .iter()
        .position(|line| line.contains(EXPIRATION_KEY))
        .and_then(|idx| {
            let line = &lines[idx];
            let after_key = &line[line.find(EXPIRATION_KEY)? + EXPIRATION_KEY.len()..];
            date_value(after_key).or_else(|| lines.get(idx + 1).and_then(|next| date_value(next)))
        });

    keyed.or_else(|| {
        lines
            .iter()
            .filter_map(|line| date_value(line))
            .nth(1)
    })
}

fn date_value(line: &str) -> Option<&str> {
    let start = line.find(DATE_OPEN)? + DATE_OPEN.len();
    let len = line[start..].find(DATE_CLOSE)?;
    Some(&line[start..start + len])
}
