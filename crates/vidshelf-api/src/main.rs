use vidshelf_core::Config;

// mimalloc keeps fragmentation low for long-running streaming workloads,
// especially on musl-based container images.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let config = Config::from_env()?;

    let (_state, router) = vidshelf_api::setup::initialize_app(config.clone()).await?;

    vidshelf_api::setup::server::start_server(&config, router).await?;

    Ok(())
}
