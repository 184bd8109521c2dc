use crate::error::{IoContext, Result};
use crate::registry::{INDEX_FILE_NAME, SitemapRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn clean_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        fs::remove_dir_all(output_dir).io_context("cleaning output directory", output_dir)?;
    }
    Ok(())
}

/// Writes the index and every sitemap page into `output_dir`, returning the
/// written paths with the index first.
pub fn write_sitemaps(
    registry: &SitemapRegistry,
    base_url: &str,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(output_dir).io_context("creating output directory", output_dir)?;

    let pages = registry.render_all()?;
    let index = registry.render_index(base_url)?;

    let mut written = Vec::with_capacity(pages.len() + 1);

    let index_path = output_dir.join(INDEX_FILE_NAME);
    fs::write(&index_path, index.body).io_context("writing sitemap index", &index_path)?;
    written.push(index_path);

    for page in pages {
        let path = output_dir.join(&page.file_name);
        fs::write(&path, page.response.body).io_context("writing sitemap", &path)?;
        written.push(path);
    }

    info!(count = written.len(), output = %output_dir.display(), "wrote sitemaps");

    Ok(written)
}
