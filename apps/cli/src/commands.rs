use axum::Router;
use axum::extract::{Path as UrlPath, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use sitemaps::{
    LiveRepository, RewriteRules, SitemapConfig, SitemapRegistry, SitemapResponse,
    clean_output_dir, write_sitemaps,
};
use std::error::Error;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::sync::mpsc::{RecvTimeoutError, channel};
use std::time::{Duration, Instant};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const DEBOUNCE_DURATION: Duration = Duration::from_millis(300);

struct LoadedSite {
    config: SitemapConfig,
    repository: Arc<LiveRepository>,
    registry: SitemapRegistry,
}

fn load_site(config_path: &Path, base_url: Option<&str>) -> Result<LoadedSite, Box<dyn Error>> {
    let mut config = SitemapConfig::load(config_path)?;
    if let Some(url) = base_url {
        config.set_base_url(url);
    }

    let config_dir = config_path.parent().unwrap_or(Path::new("."));
    let repository = Arc::new(LiveRepository::open(
        config.content_path(config_dir),
        &config.base_url,
    )?);
    let registry = SitemapRegistry::from_config(&config, repository.clone())?;

    Ok(LoadedSite {
        config,
        repository,
        registry,
    })
}

pub fn build_sitemaps(
    config_path: &Path,
    output: &Path,
    base_url: Option<&str>,
    clean: bool,
) -> Result<(), Box<dyn Error>> {
    if clean {
        clean_output_dir(output)?;
    }

    println!("Building sitemaps...");
    let start = Instant::now();

    let site = load_site(config_path, base_url)?;
    let written = write_sitemaps(&site.registry, &site.config.base_url, output)?;

    println!(
        "Built {} sitemaps and the index to {} in {:.2?}",
        written.len().saturating_sub(1),
        output.display(),
        start.elapsed()
    );

    Ok(())
}

pub fn list_sitemaps(config_path: &Path) -> Result<(), Box<dyn Error>> {
    let site = load_site(config_path, None)?;
    for slug in site.registry.sitemaps()? {
        println!("{slug}");
    }
    Ok(())
}

#[derive(Clone)]
pub struct AppState {
    registry: Arc<SitemapRegistry>,
    rules: Arc<RewriteRules>,
    base_url: Arc<str>,
}

impl AppState {
    fn new(site: LoadedSite) -> Result<Self, Box<dyn Error>> {
        let rules = RewriteRules::new(&site.registry)?;
        Ok(Self {
            registry: Arc::new(site.registry),
            rules: Arc::new(rules),
            base_url: Arc::from(site.config.base_url.as_str()),
        })
    }
}

fn into_http(result: sitemaps::Result<SitemapResponse>) -> Response {
    match result {
        Ok(response) => {
            let status = StatusCode::from_u16(response.status.code())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                [(header::CONTENT_TYPE, response.content_type)],
                response.body,
            )
                .into_response()
        }
        Err(error) => {
            error!(%error, "sitemap request failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

async fn sitemap_index(State(state): State<AppState>) -> Response {
    into_http(state.registry.render_index(&state.base_url))
}

async fn sitemap_page(State(state): State<AppState>, UrlPath(file): UrlPath<String>) -> Response {
    match state.rules.resolve(&file) {
        Some(request) => into_http(state.registry.dispatch(&request)),
        None => into_http(Ok(SitemapResponse::not_found())),
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/sitemap.xml", get(sitemap_index))
        .route("/{file}", get(sitemap_page))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn watch_content(repository: Arc<LiveRepository>) -> Result<RecommendedWatcher, Box<dyn Error>> {
    let (notify_tx, notify_rx) = channel::<notify::Result<Event>>();

    let mut watcher = RecommendedWatcher::new(
        notify_tx,
        Config::default().with_poll_interval(Duration::from_millis(200)),
    )?;

    // Editors often replace the file, so watch its directory.
    let content_path = repository.path().to_path_buf();
    let watch_dir = content_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or(Path::new("."))
        .to_path_buf();
    watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

    let file_name = content_path.file_name().map(|name| name.to_os_string());

    std::thread::spawn(move || {
        loop {
            match notify_rx.recv() {
                Ok(Ok(event)) => {
                    let touches_content = event
                        .paths
                        .iter()
                        .any(|path| path.file_name().map(|name| name.to_os_string()) == file_name);
                    if !touches_content {
                        continue;
                    }

                    loop {
                        match notify_rx.recv_timeout(DEBOUNCE_DURATION) {
                            Ok(_) => continue,
                            Err(RecvTimeoutError::Timeout) => break,
                            Err(RecvTimeoutError::Disconnected) => return,
                        }
                    }

                    match repository.reload() {
                        Ok(()) => info!(path = %content_path.display(), "reloaded content"),
                        Err(error) => error!(%error, "content reload failed, keeping previous content"),
                    }
                }
                Ok(Err(error)) => warn!(%error, "watch error"),
                Err(_) => break,
            }
        }
    });

    Ok(watcher)
}

/// Served URLs use the configured base URL unless `base_url` overrides it.
fn serve_state(
    config_path: &Path,
    base_url: Option<&str>,
) -> Result<(AppState, Arc<LiveRepository>), Box<dyn Error>> {
    let site = load_site(config_path, base_url)?;
    let repository = site.repository.clone();
    Ok((AppState::new(site)?, repository))
}

pub async fn serve_sitemaps(
    config_path: &Path,
    port: u16,
    base_url: Option<&str>,
) -> Result<(), Box<dyn Error>> {
    let (state, repository) = serve_state(config_path, base_url)?;
    let _watcher = watch_content(repository)?;
    let app = router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    println!("Serving sitemap index at http://{addr}/sitemap.xml");
    println!("Press Ctrl+C to stop");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
