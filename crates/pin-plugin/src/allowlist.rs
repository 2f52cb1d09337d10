//! Compiled-in domain allow-list for plugin HTTP calls: a host-API call
//! is only permitted when its target domain matches an allowed entry.

use regex::Regex;

pub struct AllowList {
    patterns: Vec<Regex>,
}

impl AllowList {
    /// Builds an allow-list from exact domain names; each becomes an
    /// anchored pattern matching that host or any subdomain of it.
    pub fn new(domains: &[&str]) -> Self {
        let patterns = domains
            .iter()
            .map(|d| {
                let escaped = regex::escape(d);
                Regex::new(&format!(r"^https?://([a-zA-Z0-9-]+\.)*{escaped}(/.*)?$"))
                    .expect("allow-list pattern compiles")
            })
            .collect();
        Self { patterns }
    }

    pub fn is_allowed(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(url))
    }
}
