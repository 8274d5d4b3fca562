//! Collects track titles from a list and prints matching releases.

use std::io::Write;

use anyhow::Context;
use tracing::{debug, info, warn};
use tracklist_core::{MusicApi, SearchRequest, SearchResult, Song, TaskApi};

const RULE: &str = "-------";

#[derive(Debug, Clone)]
pub struct Options {
    /// Every list with this exact title is read.
    pub list: String,
    pub per_page: u32,
}

/// Counters reported at the end of a run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub titles: usize,
    pub searched: usize,
    pub releases: usize,
    pub failed: usize,
}

/// Task titles from every list named `list`, sorted.
pub fn collect_titles(tasks: &impl TaskApi, list: &str) -> anyhow::Result<Vec<String>> {
    let lists = tasks.lists().context("error getting lists")?;
    let mut titles = Vec::new();
    let mut found = false;
    for l in lists.iter().filter(|l| l.title == list) {
        found = true;
        let list_tasks = tasks
            .tasks_for_list(l.id)
            .with_context(|| format!("error getting tasks for list {}", l.id))?;
        titles.extend(list_tasks.into_iter().map(|t| t.title));
    }
    if !found {
        warn!(list, "no list with that title");
    }
    titles.sort();
    Ok(titles)
}

/// Search every parsable title and print the hits to `out`.
///
/// A failed search is logged and skipped; only write errors abort the run.
pub fn run(
    tasks: &impl TaskApi,
    music: &impl MusicApi,
    options: &Options,
    out: &mut impl Write,
) -> anyhow::Result<Summary> {
    let titles = collect_titles(tasks, &options.list)?;
    let mut summary = Summary {
        titles: titles.len(),
        ..Summary::default()
    };

    for title in &titles {
        let Some(song) = Song::parse(title) else {
            debug!(%title, "not an \"artist - track\" title");
            continue;
        };
        let request = SearchRequest {
            q: Some(title.clone()),
            artist: Some(song.artist),
            per_page: Some(options.per_page),
            ..SearchRequest::default()
        };
        summary.searched += 1;
        match music.search(&request) {
            Ok(found) => {
                for release in &found.results {
                    write_release(out, title, release)?;
                    summary.releases += 1;
                }
            }
            Err(e) => {
                warn!(%title, error = %e, "search failed");
                summary.failed += 1;
            }
        }
    }

    info!(
        titles = summary.titles,
        searched = summary.searched,
        releases = summary.releases,
        failed = summary.failed,
        "done"
    );
    Ok(summary)
}

fn write_release(out: &mut impl Write, title: &str, release: &SearchResult) -> std::io::Result<()> {
    writeln!(out, "{RULE}")?;
    writeln!(out, "Canción: {title}\nDisco: {}", release.title)?;
    for style in &release.style {
        writeln!(out, "Estilo: {style}")?;
    }
    writeln!(out, "{RULE}")
}
