use actix_web::{
  error::ResponseError,
  HttpResponse
};
use derive_more::Display;
use log::error;
use serde::Serialize;

// Client-facing messages stay in the site's display locale,
// like the rest of the API. Internal detail only goes to the
// logs, never into a response body.
#[derive(Debug, Display)]
pub enum Error {
  #[display(fmt = "服务器处理错误")]
  InternalServerError(String),
  #[display(fmt = "{}", _0)]
  BadRequest(String),
  #[display(fmt = "{}", _0)]
  NotFound(String)
}

// All error responses share the {success, message} JSON
// shape the clients already parse.
#[derive(Serialize)]
struct ErrorBody {
  success: bool,
  message: String
}

impl ResponseError for Error {
  fn error_response(&self) -> HttpResponse {
    let body = ErrorBody {
      success: false,
      message: self.to_string()
    };
    match self {
      Error::InternalServerError(_) =>
        HttpResponse::InternalServerError().json(body),
      Error::BadRequest(_) => HttpResponse::BadRequest().json(body),
      Error::NotFound(_) => HttpResponse::NotFound().json(body)
    }
  }
}

// Store failures all map to the same opaque 500, the report
// with its full context chain lands in the log.
pub fn map_store_error(e: color_eyre::Report) -> Error {
  error!("Store operation failed - {:#}", e);
  Error::InternalServerError(e.to_string())
}
