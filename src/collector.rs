use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::parser::ids;
use crate::progress;
use crate::session::PageSession;
use crate::settings::Settings;
use crate::store::{self, PipelineStats};

/// Visit each workflow page and save its JSON download as `workflow_<id>.json`.
pub async fn download_all<S: PageSession>(
    session: &mut S,
    urls: &[String],
    settings: &Settings,
) -> Result<PipelineStats> {
    let out_dir = &settings.workflows_dir;
    store::ensure_dir(out_dir)?;

    let mut stats = PipelineStats {
        total: urls.len(),
        ..Default::default()
    };
    let pb = progress::bar(urls.len())?;

    for (i, url) in urls.iter().enumerate() {
        pb.set_message(url.clone());
        match download_one(session, url, out_dir).await {
            Ok(path) => {
                info!(url = %url, file = %path.display(), "downloaded");
                stats.record(true);
            }
            Err(e) => {
                warn!(url = %url, "download failed: {:#}", e);
                stats.record(false);
            }
        }
        pb.inc(1);

        if i + 1 < urls.len() {
            tokio::time::sleep(settings.request_delay()).await;
        }
    }

    pb.finish_and_clear();
    info!(
        "Downloaded {} workflows ({} ok, {} failed)",
        stats.total, stats.ok, stats.failed
    );
    Ok(stats)
}

async fn download_one<S: PageSession>(session: &mut S, url: &str, out_dir: &Path) -> Result<PathBuf> {
    let id = ids::workflow_id_from_url(url).ok_or_else(|| anyhow!("no workflow id in url"))?;

    session.goto(url).await?;
    let bytes = session
        .download()
        .await?
        .ok_or_else(|| anyhow!("could not find download button on {}", url))?;

    let path = ids::workflow_file(out_dir, &id);
    std::fs::write(&path, bytes).with_context(|| format!("Failed to save {}", path.display()))?;
    Ok(path)
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::mock::{MockPage, MockSession};
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> Settings {
        Settings {
            workflows_dir: dir.path().join("downloaded_workflows"),
            request_delay_ms: 0,
            ..Settings::default()
        }
    }

    fn page_with_download(body: &str) -> MockPage {
        MockPage {
            download: Some(body.as_bytes().to_vec()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn saves_download_verbatim() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let raw = "{\"nodes\": [],\n \"name\": \"Lead Gen\"}";
        let mut session =
            MockSession::new().with_page("https://x.test/w/abc", page_with_download(raw));

        let urls = vec!["https://x.test/w/abc".to_string()];
        let stats = download_all(&mut session, &urls, &settings).await.unwrap();

        assert_eq!(stats, PipelineStats { total: 1, ok: 1, failed: 0 });
        let saved = std::fs::read_to_string(settings.workflows_dir.join("workflow_abc.json")).unwrap();
        assert_eq!(saved, raw);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_run() {
        let dir = TempDir::new().unwrap();
        let settings = settings(&dir);
        let mut session = MockSession::new()
            .with_page("https://x.test/w/nobutton", MockPage::default())
            .with_page("https://x.test/w/ok", page_with_download("{}"));

        let urls = vec![
            "https://x.test/w/missing".to_string(),
            "https://x.test/w/nobutton".to_string(),
            "https://x.test/".to_string(),
            "https://x.test/w/ok".to_string(),
        ];
        let stats = download_all(&mut session, &urls, &settings).await.unwrap();

        assert_eq!(stats, PipelineStats { total: 4, ok: 1, failed: 3 });
        assert_eq!(store::count_workflow_files(&settings.workflows_dir).unwrap(), 1);
        assert!(settings.workflows_dir.join("workflow_ok.json").exists());
        // the id-less URL is rejected before navigation
        assert_eq!(session.visited.len(), 3);
    }
}
