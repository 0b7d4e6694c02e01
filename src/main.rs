// Entrypoint for the terminal front-end.
// - Keeps `main` small: load configuration, build the API client and hand
//   it to the UI loop.
// - Returns `anyhow::Result` so setup failures print with context.

use anyhow::Context;
use rembg_front::{api::ApiClient, config::Config, ui::main_menu};

fn main() -> anyhow::Result<()> {
    // Log to stderr; warnings only unless RUST_LOG says otherwise, so the
    // menu stays readable.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // REMBG_API_URL > config file > http://localhost:3080. See `config`.
    let config = Config::load().context("Failed to load configuration")?;
    let api = ApiClient::from_config(&config).context("Failed to build HTTP client")?;

    // Blocks until the user exits.
    main_menu(api, config)?;
    Ok(())
}
