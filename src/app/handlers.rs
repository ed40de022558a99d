use actix_web::{
  web,
  HttpRequest,
  HttpResponse,
  Result
};
use crate::store::NewComment;
use super::dtos::*;
use super::error::{map_store_error, Error};
use super::helpers;
use super::AppState;

// All the API handlers. Each one is a single pass:
// validate, hit the store, build the JSON response.

pub async fn record_visitor(
  app_state: web::Data<AppState>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  match helpers::visitor_id(&req) {
    // Known visitor, plain read:
    Some(_) => {
      let count = app_state.stats.visitor_count()
        .map_err(map_store_error)?;
      Ok(HttpResponse::Ok().json(VisitorCountDto {
        success: true,
        visitor_count: count
      }))
    },
    // No cookie means new visitor: count them and hand
    // out an identity:
    None => {
      let count = app_state.stats.record_new_visitor()
        .map_err(map_store_error)?;
      Ok(
        HttpResponse::Ok()
          .cookie(helpers::visitor_cookie(&helpers::new_visitor_id()))
          .json(VisitorCountDto {
            success: true,
            visitor_count: count
          })
      )
    }
  }
}

pub async fn record_article_visit(
  app_state: web::Data<AppState>,
  body: web::Json<ArticleIdBody>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let article_id = body.into_inner().article_id
    .filter(|id| !id.is_empty());
  let (visitor_id, article_id) = match (helpers::visitor_id(&req), article_id) {
    (Some(visitor_id), Some(article_id)) => (visitor_id, article_id),
    _ => return Err(Error::BadRequest("缺少访客ID或文章ID".to_string()))
  };

  let total_visits = app_state.stats
    .record_article_visit(&article_id, &visitor_id)
    .map_err(map_store_error)?;
  Ok(HttpResponse::Ok().json(TotalVisitsDto {
    success: true,
    total_visits
  }))
}

pub async fn record_page_view(
  app_state: web::Data<AppState>,
  body: web::Json<ArticleIdBody>
) -> Result<HttpResponse, Error> {
  let article_id = body.into_inner().article_id
    .filter(|id| !id.is_empty())
    .ok_or_else(|| Error::BadRequest("缺少文章ID".to_string()))?;

  let page_views = app_state.stats.record_page_view(&article_id)
    .map_err(map_store_error)?;
  Ok(HttpResponse::Ok().json(PageViewsDto {
    success: true,
    page_views
  }))
}

pub async fn stats(
  app_state: web::Data<AppState>,
  query: web::Query<StatsQuery>
) -> Result<HttpResponse, Error> {
  // An empty articleId means site-wide, same as no
  // articleId at all:
  let article_id = query.into_inner().article_id
    .filter(|id| !id.is_empty());
  let snapshot = app_state.stats.snapshot(article_id.as_deref())
    .map_err(map_store_error)?;
  Ok(HttpResponse::Ok().json(StatsDto::from(snapshot)))
}

pub async fn get_comments(
  app_state: web::Data<AppState>,
  query: web::Query<CommentsQuery>
) -> Result<HttpResponse, Error> {
  let path = query.into_inner().path
    .filter(|p| !p.is_empty())
    .ok_or_else(|| Error::BadRequest("缺少页面路径".to_string()))?;

  let comments = app_state.comments.comments_for_page(&path)
    .map_err(map_store_error)?;
  Ok(HttpResponse::Ok().json(comments))
}

pub async fn post_comment(
  app_state: web::Data<AppState>,
  form: web::Json<CommentForm>,
  req: HttpRequest
) -> Result<HttpResponse, Error> {
  let form = form.into_inner();
  let (content, path) = match (form.content, form.path) {
    (Some(content), Some(path)) => (content, path),
    _ => return Err(Error::BadRequest("缺少必要参数".to_string()))
  };
  if content.trim().is_empty() {
    return Err(Error::BadRequest("评论内容不能为空".to_string()));
  }
  let parent_id = form.parent_id.unwrap_or(0);
  // Replying to the thread root unless told otherwise:
  let reply_to_id = form.reply_to_id.unwrap_or(parent_id);

  // A commenter without a cookie gets an identity minted on
  // the spot. Unlike record_visitor this doesn't touch the
  // global visitors counter.
  let (visitor_id, is_new_visitor) = match helpers::visitor_id(&req) {
    Some(visitor_id) => (visitor_id, false),
    None => (helpers::new_visitor_id(), true)
  };

  let comment = app_state.comments
    .append_comment(&path, NewComment {
      content,
      parent_id,
      reply_to_id,
      visitor_id: visitor_id.clone()
    })
    .map_err(map_store_error)?;

  let mut response = HttpResponse::Ok();
  if is_new_visitor {
    response.cookie(helpers::visitor_cookie(&visitor_id));
  }
  Ok(response.json(PostedCommentDto::from(comment)))
}

pub async fn health() -> HttpResponse {
  HttpResponse::Ok().json(HealthDto { status: "healthy" })
}

// Default response when no route matched the request:
pub async fn not_found() -> Result<HttpResponse, Error> {
  Err(Error::NotFound(String::from("Endpoint doesn't exist")))
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{CommentRepo, StatsRepo};
  use actix_web::cookie::Cookie;
  use actix_web::http::{header, StatusCode};
  use actix_web::{test, App};
  use serde_json::{json, Value};
  use tempfile::TempDir;

  fn test_state() -> (TempDir, web::Data<AppState>) {
    let dir = TempDir::new().unwrap();
    let stats = StatsRepo::open(dir.path().join("stats.json")).unwrap();
    let comments = CommentRepo::open(dir.path().join("comments.json")).unwrap();
    (dir, web::Data::new(AppState { stats, comments }))
  }

  // init_service returns an unnameable type so a macro it
  // is. The TempDir has to stay alive next to the service
  // or the store files vanish.
  macro_rules! test_app {
    ($state:expr) => {
      test::init_service(
        App::new()
          .app_data($state.clone())
          .configure(super::super::api_endpoints_config)
      )
      .await
    };
  }

  async fn body_json(
    resp: actix_web::dev::ServiceResponse
  ) -> Value {
    let body = test::read_body(resp).await;
    serde_json::from_slice(&body).unwrap()
  }

  #[actix_rt::test]
  async fn health_reports_healthy() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::get().uri("/api/health").to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "status": "healthy" }));
  }

  #[actix_rt::test]
  async fn first_contact_counts_the_visitor_and_sets_a_cookie() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::get().uri("/api/record-visitor").to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp.headers().get(header::SET_COOKIE)
      .expect("a visitor_id cookie should be set")
      .to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("visitor_id="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("SameSite=Lax"));
    let body = body_json(resp).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["visitorCount"], json!(1));
  }

  #[actix_rt::test]
  async fn returning_visitor_is_not_recounted() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    // First contact, no cookie:
    let req = test::TestRequest::get().uri("/api/record-visitor").to_request();
    test::call_service(&mut app, req).await;
    // Same client comes back with its cookie:
    let req = test::TestRequest::get()
      .uri("/api/record-visitor")
      .cookie(Cookie::new("visitor_id", "some-known-visitor"))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
    let body = body_json(resp).await;
    assert_eq!(body["visitorCount"], json!(1));
  }

  #[actix_rt::test]
  async fn article_visit_without_cookie_is_rejected() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::post()
      .uri("/api/record-article-visit")
      .set_json(&json!({ "articleId": "intro" }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body, json!({ "success": false, "message": "缺少访客ID或文章ID" }));
  }

  #[actix_rt::test]
  async fn article_visits_are_idempotent_per_visitor() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    for _ in 0..3 {
      let req = test::TestRequest::post()
        .uri("/api/record-article-visit")
        .cookie(Cookie::new("visitor_id", "visitor-a"))
        .set_json(&json!({ "articleId": "intro" }))
        .to_request();
      let resp = test::call_service(&mut app, req).await;
      assert_eq!(resp.status(), StatusCode::OK);
      let body = body_json(resp).await;
      assert_eq!(body["totalVisits"], json!(1));
    }
  }

  #[actix_rt::test]
  async fn page_view_without_article_id_is_rejected() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::post()
      .uri("/api/record-page-view")
      .set_json(&json!({}))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body, json!({ "success": false, "message": "缺少文章ID" }));
  }

  #[actix_rt::test]
  async fn page_views_add_up_per_call() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    for expected in 1..=3 {
      let req = test::TestRequest::post()
        .uri("/api/record-page-view")
        .set_json(&json!({ "articleId": "intro" }))
        .to_request();
      let body = body_json(test::call_service(&mut app, req).await).await;
      assert_eq!(body["pageViews"], json!(expected));
    }
  }

  #[actix_rt::test]
  async fn site_wide_stats_have_no_page_views_field() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::get().uri("/api/stats").to_request();
    let body = body_json(test::call_service(&mut app, req).await).await;
    assert_eq!(body, json!({ "visitorCount": 0, "totalVisits": 0 }));
  }

  #[actix_rt::test]
  async fn stats_for_an_unknown_article_are_zero() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::get()
      .uri("/api/stats?articleId=never-seen")
      .to_request();
    let body = body_json(test::call_service(&mut app, req).await).await;
    assert_eq!(body["pageViews"], json!(0));
  }

  #[actix_rt::test]
  async fn comments_without_a_path_are_rejected() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::get().uri("/api/comments/get").to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], json!("缺少页面路径"));
  }

  #[actix_rt::test]
  async fn comments_for_an_unknown_page_are_an_empty_list() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::get()
      .uri("/api/comments/get?path=/blog/missing")
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!([]));
  }

  #[actix_rt::test]
  async fn first_cookieless_comment_is_guest_one() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::post()
      .uri("/api/comments/post")
      .set_json(&json!({ "content": "hello", "path": "/blog/a" }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let set_cookie = resp.headers().get(header::SET_COOKIE)
      .expect("a visitor_id cookie should be set")
      .to_str().unwrap().to_string();
    assert!(set_cookie.starts_with("visitor_id="));
    let body = body_json(resp).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["id"], json!(1));
    assert_eq!(body["author"], json!("游客 1"));
    assert_eq!(body["parent_id"], json!(0));
    assert_eq!(body["reply_to_id"], json!(0));
  }

  #[actix_rt::test]
  async fn guest_numbers_are_global_across_pages() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::post()
      .uri("/api/comments/post")
      .cookie(Cookie::new("visitor_id", "visitor-a"))
      .set_json(&json!({ "content": "first", "path": "/blog/a" }))
      .to_request();
    let body = body_json(test::call_service(&mut app, req).await).await;
    assert_eq!(body["author"], json!("游客 1"));
    // A second identity on a completely different page still
    // gets the next number, not 1:
    let req = test::TestRequest::post()
      .uri("/api/comments/post")
      .cookie(Cookie::new("visitor_id", "visitor-b"))
      .set_json(&json!({ "content": "second", "path": "/blog/b" }))
      .to_request();
    let body = body_json(test::call_service(&mut app, req).await).await;
    assert_eq!(body["author"], json!("游客 2"));
  }

  #[actix_rt::test]
  async fn commenting_with_a_cookie_sets_no_new_cookie() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::post()
      .uri("/api/comments/post")
      .cookie(Cookie::new("visitor_id", "visitor-a"))
      .set_json(&json!({ "content": "hello", "path": "/blog/a" }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers().get(header::SET_COOKIE).is_none());
  }

  #[actix_rt::test]
  async fn blank_comment_content_is_rejected() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::post()
      .uri("/api/comments/post")
      .set_json(&json!({ "content": "   ", "path": "/blog/a" }))
      .to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body = body_json(resp).await;
    assert_eq!(body["message"], json!("评论内容不能为空"));
  }

  #[actix_rt::test]
  async fn reply_to_id_defaults_to_parent_id() {
    let (_dir, state) = test_state();
    let mut app = test_app!(state);
    let req = test::TestRequest::post()
      .uri("/api/comments/post")
      .cookie(Cookie::new("visitor_id", "visitor-a"))
      .set_json(&json!({ "content": "reply", "path": "/blog/a", "parent_id": 7 }))
      .to_request();
    let body = body_json(test::call_service(&mut app, req).await).await;
    assert_eq!(body["parent_id"], json!(7));
    assert_eq!(body["reply_to_id"], json!(7));
  }

  #[actix_rt::test]
  async fn unknown_routes_get_a_json_404() {
    let (_dir, state) = test_state();
    let mut app = test::init_service(
      App::new()
        .app_data(state.clone())
        .configure(super::super::api_endpoints_config)
        .default_service(web::route().to(super::not_found))
    )
    .await;
    let req = test::TestRequest::get().uri("/api/nope").to_request();
    let resp = test::call_service(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  }

}
