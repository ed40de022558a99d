use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use color_eyre::Result;
use eyre::WrapErr;
use log::{debug, info};
use crate::config::Config;
use crate::store::{CommentRepo, StatsRepo};
mod handlers;
mod dtos;
mod error;
mod helpers;

// Declare app state struct:
pub struct AppState {
  pub stats: StatsRepo,
  pub comments: CommentRepo
}

// Function to start the server.
// Has to be async because there should be a .await at the end.
pub async fn run() -> Result<()> {
  let config = Config::from_env()
    .expect("Configuration (environment or .env file) is missing");
  debug!("Current config: {:?}", config);

  // Both stores validate their file on open, so a corrupt
  // JSON document stops the server right here with some
  // context instead of failing on the first request:
  let stats = StatsRepo::open(&config.stats_file_path)
    .context("Opening the stats store")?;
  let comments = CommentRepo::open(&config.comments_file_path)
    .context("Opening the comments store")?;

  let app_state = web::Data::new(
    AppState {
      stats,
      comments
    }
  );

  info!("Starting server on {}", config.bind_address);
  HttpServer::new(move|| {
    // Cors isn't Clone so it's built once per worker. The
    // frontend lives on another origin and sends the
    // visitor_id cookie, so credentials have to be allowed,
    // which in turn means echoing the origin instead of
    // responding with a wildcard.
    let cors = Cors::default()
      .allow_any_origin()
      .allow_any_method()
      .allow_any_header()
      .supports_credentials();
    App::new()
      .app_data(app_state.clone())
      .app_data(web::JsonConfig::default().error_handler(|_, _| {
        error::Error::BadRequest("无效的请求数据".to_string()).into()
      }))
      .app_data(web::QueryConfig::default().error_handler(|_, _| {
        error::Error::BadRequest("无效的查询参数".to_string()).into()
      }))
      .wrap(middleware::Logger::default())
      .wrap(cors)
      .configure(api_endpoints_config)
      .default_service(web::route().to(handlers::not_found))
  })
  .bind(&config.bind_address)?
  .run()
  .await
  .context("Start Actix web server")
}

// Route configuration:
fn api_endpoints_config(cfg: &mut web::ServiceConfig) {
  cfg.route("/api/record-visitor", web::get().to(handlers::record_visitor))
    .route("/api/record-article-visit", web::post().to(handlers::record_article_visit))
    .route("/api/record-page-view", web::post().to(handlers::record_page_view))
    .route("/api/stats", web::get().to(handlers::stats))
    .route("/api/comments/get", web::get().to(handlers::get_comments))
    .route("/api/comments/post", web::post().to(handlers::post_comment))
    .route("/api/health", web::get().to(handlers::health));
}
