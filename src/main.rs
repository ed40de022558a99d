mod app;
mod config;
mod store;
mod utils;

use color_eyre::Result;
use dotenv::dotenv;

#[actix_web::main]
async fn main() -> Result<()> {
  dotenv().ok();
  // Default to info level logging when RUST_LOG is absent
  // from both the environment and the .env file:
  if std::env::var("RUST_LOG").is_err() {
    std::env::set_var("RUST_LOG", "info");
  }
  env_logger::init();

  app::run().await
}
