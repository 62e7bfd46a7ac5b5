//! Platform table and per-platform "found" rules

use std::collections::HashSet;

/// Placeholder replaced with the username when resolving a profile URL
pub const USERNAME_SLOT: &str = "{username}";

/// How a `200 OK` response is interpreted for a platform.
///
/// Detection relies on incidental redirect behaviour of third-party sites,
/// so these rules are approximate by nature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FoundRule {
    /// Any 200 counts as an existing profile
    Status200,
    /// 200 counts only when no redirect moved us off the requested URL
    RedirectMustMatch,
    /// 200 counts only when the final URL does not contain the marker
    RedirectMustNotContain(&'static str),
}

impl FoundRule {
    /// Decide whether a 200 response landing on `final_url` is a real profile
    pub fn accepts(&self, requested_url: &str, final_url: &str) -> bool {
        match self {
            FoundRule::Status200 => true,
            FoundRule::RedirectMustMatch => {
                requested_url.trim_end_matches('/') == final_url.trim_end_matches('/')
            }
            FoundRule::RedirectMustNotContain(marker) => !final_url.contains(marker),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSpec {
    pub name: String,
    pub url_template: String,
    pub rule: FoundRule,
}

impl PlatformSpec {
    pub fn new(name: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url_template: url_template.into(),
            rule: FoundRule::Status200,
        }
    }

    pub fn with_rule(mut self, rule: FoundRule) -> Self {
        self.rule = rule;
        self
    }

    /// Substitute the username into the URL template
    pub fn resolve_url(&self, username: &str) -> String {
        self.url_template.replacen(USERNAME_SLOT, username, 1)
    }
}

const PLATFORM_TABLE: &[(&str, &str)] = &[
    ("github", "https://github.com/{username}"),
    ("twitter", "https://twitter.com/{username}"),
    ("instagram", "https://instagram.com/{username}"),
    ("facebook", "https://facebook.com/{username}"),
    ("linkedin", "https://linkedin.com/in/{username}"),
    ("reddit", "https://reddit.com/user/{username}"),
    ("pinterest", "https://pinterest.com/{username}"),
    ("tumblr", "https://{username}.tumblr.com"),
    ("medium", "https://medium.com/@{username}"),
    ("dev.to", "https://dev.to/{username}"),
    ("stackoverflow", "https://stackoverflow.com/users/{username}"),
    ("hackernews", "https://news.ycombinator.com/user?id={username}"),
    ("producthunt", "https://www.producthunt.com/@{username}"),
    ("behance", "https://www.behance.net/{username}"),
    ("dribbble", "https://dribbble.com/{username}"),
    ("twitch", "https://www.twitch.tv/{username}"),
    ("steam", "https://steamcommunity.com/id/{username}"),
    ("youtube", "https://www.youtube.com/@{username}"),
    ("tiktok", "https://www.tiktok.com/@{username}"),
    ("spotify", "https://open.spotify.com/user/{username}"),
    ("soundcloud", "https://soundcloud.com/{username}"),
    ("flickr", "https://www.flickr.com/people/{username}"),
    ("gitlab", "https://gitlab.com/{username}"),
    ("bitbucket", "https://bitbucket.org/{username}"),
    ("quora", "https://www.quora.com/profile/{username}"),
    ("aboutme", "https://about.me/{username}"),
    ("etsy", "https://www.etsy.com/shop/{username}"),
    ("ebay", "https://www.ebay.com/usr/{username}"),
    ("goodreads", "https://www.goodreads.com/user/show/{username}"),
    ("keybase", "https://keybase.io/{username}"),
    ("npm", "https://www.npmjs.com/~{username}"),
    ("pypi", "https://pypi.org/user/{username}"),
    ("dockerhub", "https://hub.docker.com/u/{username}"),
    ("hackerone", "https://hackerone.com/{username}"),
    ("codepen", "https://codepen.io/{username}"),
    ("replit", "https://replit.com/@{username}"),
    ("vimeo", "https://vimeo.com/{username}"),
    ("patreon", "https://www.patreon.com/{username}"),
    ("kofi", "https://ko-fi.com/{username}"),
    ("buymeacoffee", "https://www.buymeacoffee.com/{username}"),
    ("lastfm", "https://www.last.fm/user/{username}"),
    ("mixcloud", "https://www.mixcloud.com/{username}"),
    ("bandcamp", "https://{username}.bandcamp.com"),
    ("chess.com", "https://www.chess.com/member/{username}"),
    ("lichess", "https://lichess.org/@/{username}"),
    ("imgur", "https://imgur.com/user/{username}"),
    ("wattpad", "https://www.wattpad.com/user/{username}"),
    ("letterboxd", "https://letterboxd.com/{username}"),
    ("telegram", "https://t.me/{username}"),
    ("mastodon", "https://mastodon.social/@{username}"),
    ("gravatar", "https://en.gravatar.com/{username}"),
];

/// Named overrides of the default `Status200` rule
fn rule_for(name: &str) -> FoundRule {
    match name {
        // GitHub sends unknown users to a search page
        "github" => FoundRule::RedirectMustNotContain("/search?"),
        // Instagram bounces missing profiles to its login page
        "instagram" => FoundRule::RedirectMustMatch,
        _ => FoundRule::Status200,
    }
}

/// The built-in platform table, in scan order
pub fn default_platforms() -> Vec<PlatformSpec> {
    PLATFORM_TABLE
        .iter()
        .map(|(name, template)| PlatformSpec::new(*name, *template).with_rule(rule_for(name)))
        .collect()
}

/// Check that names are unique and every template has exactly one username slot
pub fn validate_platforms(platforms: &[PlatformSpec]) -> Result<(), String> {
    let mut seen = HashSet::new();
    for platform in platforms {
        if !seen.insert(platform.name.as_str()) {
            return Err(format!("duplicate platform name: {}", platform.name));
        }
        if platform.url_template.matches(USERNAME_SLOT).count() != 1 {
            return Err(format!(
                "platform {} must have exactly one {} slot",
                platform.name, USERNAME_SLOT
            ));
        }
    }
    Ok(())
}

/// Keep only the named platforms (case-insensitive).
///
/// Falls back to the full table when nothing matches.
pub fn filter_platforms(
    platforms: Vec<PlatformSpec>,
    names: Option<&[String]>,
) -> Vec<PlatformSpec> {
    let Some(names) = names else {
        return platforms;
    };

    let filtered: Vec<PlatformSpec> = platforms
        .iter()
        .filter(|p| names.iter().any(|n| n.trim().eq_ignore_ascii_case(&p.name)))
        .cloned()
        .collect();

    if filtered.is_empty() {
        platforms
    } else {
        filtered
    }
}
