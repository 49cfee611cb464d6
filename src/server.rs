use crate::config::AppConfig;
use anyhow::Result;
use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{info, warn};

/// Static routes over the generated output directory; `/` resolves to `index.html`.
pub fn router(config: &AppConfig) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(&config.output.dir))
        .layer(CorsLayer::permissive())
}

pub async fn start_server(config: AppConfig) -> Result<()> {
    let port = config.server.port;
    let addr = SocketAddr::from(([127, 0, 0, 1], port));

    if !config.output.dir.join("index.html").exists() {
        warn!(dir = ?config.output.dir, "No generated page found, run `generate` first");
    }

    info!("Starting server on http://{}", addr);

    let app = router(&config);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OutputConfig;

    async fn spawn(config: &AppConfig) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(config);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[tokio::test]
    async fn serves_generated_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<html>page</html>").unwrap();
        std::fs::write(dir.path().join("map.svg"), "<svg/>").unwrap();

        let config = AppConfig {
            output: OutputConfig { dir: dir.path().to_path_buf() },
            ..AppConfig::default()
        };
        let addr = spawn(&config).await;

        let index = reqwest::get(format!("http://{addr}/")).await.unwrap();
        assert!(index.status().is_success());
        assert_eq!(index.text().await.unwrap(), "<html>page</html>");

        let map = reqwest::get(format!("http://{addr}/map.svg")).await.unwrap();
        assert_eq!(map.text().await.unwrap(), "<svg/>");

        let missing = reqwest::get(format!("http://{addr}/icon_chart.svg")).await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
