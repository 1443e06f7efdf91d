//! Login cookies for the weapi client.
//!
//! The tool does not log in by itself: the user pastes the `Cookie` header
//! from a logged-in browser session once and it is stored for later runs.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::config::Store;

/// Cookie jar keyed by cookie name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cookies(BTreeMap<String, String>);

impl Cookies {
    /// Parse a `Cookie` header: `k=v; k2=v2`. Pieces without `=` are dropped;
    /// values may contain `=`.
    pub fn parse(header: &str) -> Self {
        let jar = header
            .split(';')
            .filter_map(|item| {
                let (key, value) = item.trim().split_once('=')?;
                let key = key.trim();
                (!key.is_empty()).then(|| (key.to_string(), value.trim().to_string()))
            })
            .collect();
        Cookies(jar)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Header form, names in sorted order.
    pub fn header_value(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Where the cookies for this run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CookieSource {
    CommandLine,
    Stored,
    Prompt,
    /// Nothing available; requests go out anonymous
    Empty,
}

/// Cookies in use for one run.
#[derive(Debug, Clone)]
pub struct Session {
    pub cookies: Cookies,
    pub source: CookieSource,
}

impl Session {
    /// Resolve cookies: an explicit header wins and is saved; otherwise the
    /// stored jar; otherwise `prompt` is asked and a non-empty answer saved.
    pub fn resolve<S, P>(store: &S, explicit: Option<&str>, prompt: P) -> Result<Self>
    where
        S: Store<Cookies>,
        P: FnOnce() -> Result<String>,
    {
        if let Some(header) = explicit {
            let cookies = Cookies::parse(header);
            if !cookies.is_empty() {
                store.save(&cookies)?;
                info!(count = cookies.0.len(), "using cookies from command line");
                return Ok(Self {
                    cookies,
                    source: CookieSource::CommandLine,
                });
            }
        }

        if let Some(cookies) = store.load()?.filter(|c| !c.is_empty()) {
            info!("loaded stored cookies");
            return Ok(Self {
                cookies,
                source: CookieSource::Stored,
            });
        }

        let cookies = Cookies::parse(&prompt()?);
        if cookies.is_empty() {
            return Ok(Self {
                cookies,
                source: CookieSource::Empty,
            });
        }
        store.save(&cookies)?;
        Ok(Self {
            cookies,
            source: CookieSource::Prompt,
        })
    }
}
