use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::Command;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use log::{info, trace};
use mime_guess::mime::TEXT_HTML;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::TcpListener;

const PORT: u16 = 8000;

/// Serves the assembled bundle on port 8000 until SIGINT or SIGTERM.
pub async fn serve(dir: PathBuf) -> io::Result<()> {
    let listener = bind_reusable(PORT)?;

    let url = format!("http://localhost:{PORT}/game");
    open_browser(&url);
    info!("Serving at {url}");

    serve_until(listener, dir, shutdown_signal()).await
}

// SO_REUSEADDR, so a restart doesn't trip over the previous instance's
// socket lingering in TIME_WAIT.
fn bind_reusable(port: u16) -> io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(128)?;
    TcpListener::from_std(socket.into())
}

async fn serve_until(
    listener: TcpListener,
    dir: PathBuf,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> io::Result<()> {
    let router = Router::new()
        .route("/", get(root))
        .route("/*path", get(static_path))
        .with_state(dir);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutting down server...");
}

fn open_browser(url: &str) {
    if let Err(err) = webbrowser::open(url) {
        trace!("could not open a browser: {err}");
    }

    // Termux has no default browser; its URL opener is a separate helper
    // binary which plain Linux installs won't have.
    match Command::new("termux-open-url").arg(url).status() {
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => trace!("termux-open-url failed: {err}"),
        Ok(_) => {}
    }
}

async fn static_path(State(dir): State<PathBuf>, Path(path): Path<String>) -> Response {
    let path = path.trim_start_matches('/');
    if path.split('/').any(|part| part == "..") {
        return not_found();
    }

    let mut file_path = dir.join(path);
    if let Ok(metadata) = tokio::fs::metadata(&file_path).await {
        if metadata.is_dir() {
            file_path.push("index.html");
        }
    }

    let mime_type = mime_guess::from_path(&file_path).first_or(TEXT_HTML);
    trace!("Serving {} as {mime_type}", file_path.display());

    match tokio::fs::read(&file_path).await {
        Ok(contents) => Response::builder()
            .status(StatusCode::OK)
            .header(
                header::CONTENT_TYPE,
                HeaderValue::from_str(mime_type.as_ref()).unwrap(),
            )
            .body(Body::from(contents))
            .unwrap(),
        Err(_) => not_found(),
    }
}

async fn root(State(dir): State<PathBuf>) -> Response {
    static_path(State(dir), Path("index.html".to_string())).await
}

fn not_found() -> Response {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Body::empty())
        .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;

    fn bundle_dir() -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("game")).unwrap();
        fs::write(tmp.path().join("index.html"), "<html>root</html>").unwrap();
        fs::write(tmp.path().join("game/index.html"), "<html>game</html>").unwrap();
        fs::write(tmp.path().join("game/game.wasm"), b"\0asm").unwrap();
        tmp
    }

    async fn request(dir: &tempfile::TempDir, path: &str) -> Response {
        static_path(
            State(dir.path().to_path_buf()),
            Path(path.to_string()),
        )
        .await
    }

    #[tokio::test]
    async fn serves_files_with_their_content_type() {
        let dir = bundle_dir();
        let response = request(&dir, "game/game.wasm").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("application/wasm")
        );
    }

    #[tokio::test]
    async fn directory_paths_fall_back_to_index_html() {
        let dir = bundle_dir();
        let response = request(&dir, "game").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            HeaderValue::from_static("text/html")
        );
    }

    #[tokio::test]
    async fn missing_files_are_not_found() {
        let dir = bundle_dir();
        let response = request(&dir, "game/missing.png").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn parent_traversal_is_rejected() {
        let dir = bundle_dir();
        let response = request(&dir, "../secret.txt").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn shutdown_future_stops_the_serve_loop() {
        let dir = bundle_dir();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        let server = tokio::spawn(serve_until(listener, dir.path().to_path_buf(), async {
            rx.await.ok();
        }));

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server did not shut down")
            .unwrap()
            .unwrap();
    }
}
