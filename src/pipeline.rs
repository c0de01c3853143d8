//! Batch run: fetch every configured repository, aggregate, write both tables.

use tracing::info;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::fetch::{HttpClient, fetch_releases};
use crate::output::{TableLayout, write_table};
use crate::release::{ReleaseEvent, normalize};
use crate::stats::{AggregateOptions, StatRow, aggregate};

/// What a completed run produced.
#[derive(Debug)]
pub struct RunReport {
    pub events: Vec<ReleaseEvent>,
    pub stats: Vec<StatRow>,
}

/// Fetches and normalizes releases for all repositories, one after another.
///
/// Any fetch failure or malformed record aborts the whole collection.
pub async fn collect_events<C: HttpClient>(
    client: &C,
    config: &PipelineConfig,
) -> Result<Vec<ReleaseEvent>> {
    let mut events = Vec::new();

    for source in &config.repositories {
        let raw = fetch_releases(client, source, config.per_page, config.max_pages).await?;
        for release in raw {
            events.push(normalize(&source.name, release)?);
        }
    }

    Ok(events)
}

#[tracing::instrument(skip_all, fields(repositories = config.repositories.len(), exclude_weekends = config.exclude_weekends))]
pub async fn run<C: HttpClient>(client: &C, config: &PipelineConfig) -> Result<RunReport> {
    config.validate()?;

    let events = collect_events(client, config).await?;
    let stats = aggregate(
        &events,
        AggregateOptions {
            exclude_weekends: config.exclude_weekends,
        },
    );
    info!(events = events.len(), rows = stats.len(), "Releases aggregated");

    write_table(&config.raw_path, &TableLayout::raw_events(), &events)?;
    write_table(&config.stats_path, &TableLayout::stat_rows(), &stats)?;
    info!(
        raw_path = %config.raw_path.display(),
        stats_path = %config.stats_path.display(),
        "Tables written"
    );

    Ok(RunReport { events, stats })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepoSource;
    use crate::error::Error;
    use crate::fetch::testing::FakeClient;
    use tempfile::tempdir;

    fn config(dir: &std::path::Path) -> PipelineConfig {
        PipelineConfig {
            repositories: vec![
                RepoSource {
                    name: "a".to_string(),
                    url: "https://api.test/a".to_string(),
                },
                RepoSource {
                    name: "b".to_string(),
                    url: "https://api.test/b".to_string(),
                },
            ],
            raw_path: dir.join("raw.csv"),
            stats_path: dir.join("stats.csv"),
            ..PipelineConfig::default()
        }
    }

    #[tokio::test]
    async fn test_malformed_release_aborts_before_writing() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new()
            .with_page(
                "https://api.test/a?per_page=100&page=1",
                200,
                r#"[{"published_at":"2024-03-04T10:00:00Z"}]"#,
            )
            .with_page(
                "https://api.test/b?per_page=100&page=1",
                200,
                r#"[{"tag_name":"v1","published_at":null}]"#,
            );

        let err = run(&client, &config(dir.path())).await.unwrap_err();

        assert!(matches!(err, Error::MalformedEvent { ref repository, .. } if repository == "b"));
        assert!(!dir.path().join("raw.csv").exists());
        assert!(!dir.path().join("stats.csv").exists());
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_run() {
        let dir = tempdir().unwrap();
        let client = FakeClient::new().with_page(
            "https://api.test/a?per_page=100&page=1",
            200,
            r#"[{"published_at":"2024-03-04T10:00:00Z"}]"#,
        );

        let err = run(&client, &config(dir.path())).await.unwrap_err();

        assert!(matches!(err, Error::Fetch { ref repository, .. } if repository == "b"));
        assert!(!dir.path().join("stats.csv").exists());
    }

    #[tokio::test]
    async fn test_repositories_fetched_in_order() {
        let client = FakeClient::new()
            .with_page("https://api.test/a?per_page=100&page=1", 200, "[]")
            .with_page("https://api.test/b?per_page=100&page=1", 200, "[]");
        let dir = tempdir().unwrap();

        let events = collect_events(&client, &config(dir.path())).await.unwrap();

        assert!(events.is_empty());
        let urls: Vec<_> = client.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.test/a?per_page=100&page=1",
                "https://api.test/b?per_page=100&page=1"
            ]
        );
    }
}
