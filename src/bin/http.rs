use std::net::SocketAddr;
use std::sync::Arc;

use cronograma::http_api::{self, AppState};
use cronograma::persistence::{JsonFileStore, PersistenceError};
use cronograma::session::{Role, ScheduleSession};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "cronograma.json".to_string());
    let store = JsonFileStore::new(path.clone());
    let session = match ScheduleSession::load(&store, Role::Administrator) {
        Ok(session) => session,
        Err(PersistenceError::NotFound) => ScheduleSession::with_default_rows(Role::Administrator),
        Err(err) => {
            eprintln!("Refusing to start on corrupt schedule: {err}");
            std::process::exit(1);
        }
    };

    let state = AppState::new(session, Arc::new(store));
    let app = http_api::router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], 8765));
    tracing::info!(%addr, file = %path, "serving schedule api");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("bind http listener");
    axum::serve(listener, app).await.expect("serve http api");
}
