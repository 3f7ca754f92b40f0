use std::sync::OnceLock;

use regex::Regex;

const PULL_REQUEST_URL_PATTERN: &str =
    r"^(?:https://)?(?:www\.)?github\.com/([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)/pull/([0-9]+)/?$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestUrl {
    pub org: String,
    pub repo: String,
    pub number: u64,
}

impl PullRequestUrl {
    pub fn canonical(&self) -> String {
        format!(
            "https://github.com/{}/{}/pull/{}",
            self.org, self.repo, self.number
        )
    }
}

fn pull_request_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(PULL_REQUEST_URL_PATTERN).unwrap_or_else(|error| {
            unreachable!("pull request url pattern is a valid literal: {error}")
        })
    })
}

/// Parses `[https://][www.]github.com/<org>/<repo>/pull/<number>`.
pub fn parse_pull_request_url(input: &str) -> Option<PullRequestUrl> {
    let captures = pull_request_regex().captures(input.trim())?;
    let org = captures.get(1)?.as_str();
    let repo = captures.get(2)?.as_str();
    let number = captures.get(3)?.as_str().parse::<u64>().ok()?;
    if number == 0 {
        return None;
    }
    Some(PullRequestUrl {
        org: org.to_owned(),
        repo: repo.to_owned(),
        number,
    })
}

pub fn validate_pull_request_url(input: &str) -> bool {
    parse_pull_request_url(input).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_scheme_less_and_www_urls() {
        assert!(validate_pull_request_url("github.com/org/repo/pull/42"));
        assert!(validate_pull_request_url("https://www.github.com/org/repo/pull/42"));
        assert!(validate_pull_request_url(
            "  https://github.com/octo-cat/hive.rs/pull/7/  "
        ));
    }

    #[test]
    fn rejects_other_hosts_and_shapes() {
        assert!(!validate_pull_request_url("https://example.com/pull/42"));
        assert!(!validate_pull_request_url("http://github.com/org/repo/pull/42"));
        assert!(!validate_pull_request_url("https://github.com/org/repo/issues/42"));
        assert!(!validate_pull_request_url("https://github.com/org/repo/pull/abc"));
        assert!(!validate_pull_request_url("https://github.com/org/pull/42"));
        assert!(!validate_pull_request_url(""));
    }

    #[test]
    fn parse_extracts_components() {
        let parsed = parse_pull_request_url("github.com/octocat/hive/pull/108")
            .expect("valid pull request url");
        assert_eq!(parsed.org, "octocat");
        assert_eq!(parsed.repo, "hive");
        assert_eq!(parsed.number, 108);
        assert_eq!(parsed.canonical(), "https://github.com/octocat/hive/pull/108");
    }
}
