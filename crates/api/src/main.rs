use verihire_api::app::{self, AppConfig};
use verihire_pii::FieldCipher;

#[tokio::main]
async fn main() {
    verihire_observability::init();

    let cipher = match std::env::var("VERIHIRE_ENCRYPTION_KEY") {
        Ok(key) => FieldCipher::from_base64(&key).expect("VERIHIRE_ENCRYPTION_KEY is not a valid base64url 32-byte key"),
        Err(_) => {
            tracing::warn!("VERIHIRE_ENCRYPTION_KEY not set; using insecure dev key");
            FieldCipher::new(&[0u8; 32])
        }
    };

    let config = AppConfig {
        cipher,
        database_url: std::env::var("DATABASE_URL").ok(),
        admin_password: std::env::var("VERIHIRE_ADMIN_PASSWORD").ok(),
    };

    let app = app::build_app(config).await.expect("failed to build application");

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080")
        .await
        .expect("failed to bind 0.0.0.0:8080");

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .unwrap();
}
