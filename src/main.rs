use terminus::config::ServerConfig;
use terminus::net::server::Server;
use tracing_subscriber::EnvFilter;

fn main() -> std::io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => ServerConfig::from_file(path),
        None => ServerConfig::default(),
    };

    async_std::task::block_on(async {
        let server = Server::bind(config).await?;
        server.run().await
    })
}
