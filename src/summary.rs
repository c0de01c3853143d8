//! Human-oriented summaries of the raw release table: monthly trend per
//! repository, most released modules and release share per author.

use std::collections::{BTreeMap, HashMap};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::info;

use crate::release::ReleaseEvent;

/// Monorepo tags look like `@scope/module@1.2.3`; the module is the text
/// between the first two `@`.
static MODULE_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"@(.*?)@").unwrap());

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub repository: String,
    /// `YYYY-MM` in the release's own offset.
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranked {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total: usize,
    pub monthly: Vec<MonthlyCount>,
    pub top_modules: Vec<Ranked>,
    pub authors: Vec<Ranked>,
}

/// Module name encoded in a release tag, if any.
pub fn module_of(tag: &str) -> Option<&str> {
    MODULE_TAG
        .captures(tag)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .filter(|m| !m.is_empty())
}

fn ranked(counts: HashMap<&str, usize>) -> Vec<Ranked> {
    let mut out: Vec<Ranked> = counts
        .into_iter()
        .map(|(name, count)| Ranked {
            name: name.to_string(),
            count,
        })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    out
}

/// Builds a [`Summary`], keeping the `top` most released modules.
pub fn summarize(events: &[ReleaseEvent], top: usize) -> Summary {
    let mut monthly: BTreeMap<(&str, String), usize> = BTreeMap::new();
    let mut modules: HashMap<&str, usize> = HashMap::new();
    let mut authors: HashMap<&str, usize> = HashMap::new();

    for event in events {
        let month = event.published_at.format("%Y-%m").to_string();
        *monthly.entry((event.repository.as_str(), month)).or_insert(0) += 1;

        if let Some(module) = event.tag.as_deref().and_then(module_of) {
            *modules.entry(module).or_insert(0) += 1;
        }

        *authors.entry(event.author.as_str()).or_insert(0) += 1;
    }

    let mut top_modules = ranked(modules);
    top_modules.truncate(top);

    Summary {
        total: events.len(),
        monthly: monthly
            .into_iter()
            .map(|((repository, month), count)| MonthlyCount {
                repository: repository.to_string(),
                month,
                count,
            })
            .collect(),
        top_modules,
        authors: ranked(authors),
    }
}

/// Logs a summary as structured lines.
pub fn log_summary(summary: &Summary) {
    info!(total = summary.total, "Release summary");
    for m in &summary.monthly {
        info!(repository = %m.repository, month = %m.month, count = m.count, "Monthly releases");
    }
    for (rank, m) in summary.top_modules.iter().enumerate() {
        info!(rank = rank + 1, module = %m.name, count = m.count, "Top module");
    }
    for a in &summary.authors {
        let share = if summary.total == 0 {
            0.0
        } else {
            a.count as f64 / summary.total as f64 * 100.0
        };
        info!(author = %a.name, count = a.count, share = %format!("{share:.1}%"), "Author");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn event(repo: &str, ts: &str, tag: Option<&str>, author: &str) -> ReleaseEvent {
        let mut e = ReleaseEvent::new(repo, DateTime::parse_from_rfc3339(ts).unwrap());
        e.tag = tag.map(str::to_string);
        e.author = author.to_string();
        e
    }

    fn sample() -> Vec<ReleaseEvent> {
        vec![
            event("stackflow", "2024-01-10T00:00:00Z", Some("@stackflow/core@1.0.0"), "kim"),
            event("stackflow", "2024-01-20T00:00:00Z", Some("@stackflow/core@1.1.0"), "lee"),
            event("stackflow", "2024-02-01T00:00:00Z", Some("@stackflow/react@1.0.0"), "kim"),
            event("seed-design", "2024-01-15T00:00:00Z", Some("v2.0.0"), "park"),
        ]
    }

    #[test]
    fn test_module_of() {
        assert_eq!(module_of("@stackflow/core@1.0.0"), Some("stackflow/core"));
        assert_eq!(module_of("v1.0.0"), None);
        assert_eq!(module_of("@@1.0.0"), None);
    }

    #[test]
    fn test_monthly_trend() {
        let summary = summarize(&sample(), 10);

        assert_eq!(summary.total, 4);
        assert_eq!(
            summary.monthly,
            vec![
                MonthlyCount {
                    repository: "seed-design".into(),
                    month: "2024-01".into(),
                    count: 1
                },
                MonthlyCount {
                    repository: "stackflow".into(),
                    month: "2024-01".into(),
                    count: 2
                },
                MonthlyCount {
                    repository: "stackflow".into(),
                    month: "2024-02".into(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_top_modules_ranked_and_truncated() {
        let summary = summarize(&sample(), 1);

        assert_eq!(
            summary.top_modules,
            vec![Ranked {
                name: "stackflow/core".into(),
                count: 2
            }]
        );
    }

    #[test]
    fn test_authors_ranked_with_name_tiebreak() {
        let summary = summarize(&sample(), 10);
        let names: Vec<_> = summary.authors.iter().map(|a| a.name.as_str()).collect();

        assert_eq!(names, vec!["kim", "lee", "park"]);
        assert_eq!(summary.authors[0].count, 2);
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[], 10);
        assert_eq!(summary.total, 0);
        assert!(summary.monthly.is_empty());
        log_summary(&summary);
    }
}
