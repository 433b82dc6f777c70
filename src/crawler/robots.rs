//! Minimal robots.txt handling.
//!
//! Only the `User-agent: *` group is read and only `Disallow` prefixes are
//! honoured, with `*` and `$` wildcards. That is enough to stay out of
//! admin areas and carts on small sites.

use regex::Regex;

#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    present: bool,
    disallow: Vec<Rule>,
}

#[derive(Debug, Clone)]
struct Rule {
    prefix: String,
    regex: Option<Regex>,
}

impl RobotsRules {
    /// Parse a robots.txt body
    pub fn parse(content: &str) -> Self {
        let mut present = false;
        let mut disallow = Vec::new();
        let mut in_wildcard_group = false;
        let mut last_was_agent = false;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default().trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();

            match key.as_str() {
                "user-agent" => {
                    present = true;
                    // Consecutive agent lines share one group
                    if !last_was_agent {
                        in_wildcard_group = false;
                    }
                    in_wildcard_group |= value == "*";
                    last_was_agent = true;
                }
                "disallow" => {
                    last_was_agent = false;
                    if in_wildcard_group && !value.is_empty() {
                        disallow.push(Rule::new(value));
                    }
                }
                _ => last_was_agent = false,
            }
        }

        Self { present, disallow }
    }

    /// Whether the file declared at least one user-agent group
    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Whether `path` may be crawled
    pub fn allows(&self, path: &str) -> bool {
        !self.disallow.iter().any(|rule| rule.matches(path))
    }
}

impl Rule {
    fn new(pattern: &str) -> Self {
        let regex = if pattern.contains('*') || pattern.ends_with('$') {
            let escaped = regex::escape(pattern)
                .replace("\\*", ".*")
                .replace("\\$", "$");
            Regex::new(&format!("^{}", escaped)).ok()
        } else {
            None
        };
        Self {
            prefix: pattern.to_string(),
            regex,
        }
    }

    fn matches(&self, path: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(path),
            None => path.starts_with(&self.prefix),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wildcard_group_only() {
        let robots = RobotsRules::parse(
            r#"
User-agent: Googlebot
Disallow: /google-only/

User-agent: *
Disallow: /wp-admin/
Disallow: /panier
"#,
        );
        assert!(robots.is_present());
        assert!(!robots.allows("/wp-admin/options.php"));
        assert!(!robots.allows("/panier/ajout"));
        assert!(robots.allows("/google-only/page"));
        assert!(robots.allows("/blog"));
    }

    #[test]
    fn test_shared_group_and_wildcards() {
        let robots = RobotsRules::parse(
            "User-agent: Bingbot\nUser-agent: *\nDisallow: /*?print=\nDisallow: /*.php$\n",
        );
        assert!(!robots.allows("/article?print=1"));
        assert!(!robots.allows("/index.php"));
        assert!(robots.allows("/index.php/blog"));
    }

    #[test]
    fn test_empty_disallow_allows_everything() {
        let robots = RobotsRules::parse("User-agent: *\nDisallow:\n");
        assert!(robots.allows("/anything"));
    }

    #[test]
    fn test_not_a_robots_file() {
        let robots = RobotsRules::parse("<html><body>404</body></html>");
        assert!(!robots.is_present());
        assert!(robots.allows("/"));
    }
}
