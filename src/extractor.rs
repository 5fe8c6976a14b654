use anyhow::Result;
use tracing::{debug, info, warn};

use crate::parser::{ids, labels};
use crate::progress;
use crate::session::PageSession;
use crate::settings::Settings;
use crate::store::{self, PipelineStats, RawMetadataRecord, AGGREGATE_FILE};

/// Scrape every workflow page into `workflow_<id>.json`, keeping
/// `all_workflows.json` refreshed every `aggregate_every` pages and at the end.
pub async fn scrape_all<S: PageSession>(
    session: &mut S,
    urls: &[String],
    settings: &Settings,
) -> Result<PipelineStats> {
    let out_dir = &settings.metadata_dir;
    store::ensure_dir(out_dir)?;
    let aggregate_path = out_dir.join(AGGREGATE_FILE);

    let mut stats = PipelineStats {
        total: urls.len(),
        ..Default::default()
    };
    let mut all: Vec<RawMetadataRecord> = Vec::with_capacity(urls.len());
    let pb = progress::bar(urls.len())?;

    for (i, url) in urls.iter().enumerate() {
        pb.set_message(url.clone());
        let record = scrape_page(session, url).await;

        let saved = if record.workflow_id.is_empty() {
            warn!(url = %url, "no workflow id in url, record kept in aggregate only");
            true
        } else {
            let path = ids::workflow_file(out_dir, &record.workflow_id);
            match store::write_json(&path, &record) {
                Ok(()) => true,
                Err(e) => {
                    warn!(url = %url, file = %path.display(), "could not save record: {:#}", e);
                    false
                }
            }
        };
        stats.record(saved && record.is_success());
        all.push(record);

        if (i + 1) % settings.aggregate_every == 0 {
            match store::write_json(&aggregate_path, &all) {
                Ok(()) => debug!(records = all.len(), "progress saved"),
                Err(e) => warn!(file = %aggregate_path.display(), "could not save progress: {:#}", e),
            }
        }
        pb.inc(1);

        if i + 1 < urls.len() {
            tokio::time::sleep(settings.request_delay()).await;
        }
    }

    store::write_json(&aggregate_path, &all)?;
    pb.finish_and_clear();
    info!(
        "Scraped {} workflows ({} ok, {} failed)",
        stats.total, stats.ok, stats.failed
    );
    Ok(stats)
}

/// Visit one page and build its record. Never fails: navigation problems
/// become an error record, text/title/html problems leave the field out.
pub async fn scrape_page<S: PageSession>(session: &mut S, url: &str) -> RawMetadataRecord {
    let Some(workflow_id) = ids::workflow_id_from_url(url) else {
        return RawMetadataRecord::failed(url, "", "no workflow id in url");
    };

    if let Err(e) = session.goto(url).await {
        warn!(url = %url, "scrape failed: {}", e);
        return RawMetadataRecord::failed(url, &workflow_id, e.to_string());
    }

    if let Some(landed) = session.current_url().filter(|landed| *landed != url) {
        debug!(url = %url, landed = %landed, "redirected");
    }

    let mut record = RawMetadataRecord::new(url, &workflow_id);

    match session.body_text() {
        Ok(text) => {
            record.fields = labels::extract_page_fields(&text);
            record.full_page_text = Some(text);
        }
        Err(e) => warn!(url = %url, "could not read page text: {}", e),
    }
    match session.title() {
        Ok(title) => record.page_title = Some(title),
        Err(e) => debug!(url = %url, "no title: {}", e),
    }
    match session.content() {
        Ok(html) => record.page_html = Some(html),
        Err(e) => debug!(url = %url, "no html: {}", e),
    }

    info!(
        workflow_id = %workflow_id,
        "scraped {}",
        record.workflow_name().unwrap_or(workflow_id.as_str())
    );
    record
}

// ── Tests ──
