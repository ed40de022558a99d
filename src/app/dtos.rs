use serde::{Deserialize, Serialize};
use crate::store::{Comment, StatsSnapshot};

// Response DTOs are camelCase like the historical API,
// comments keep their stored snake_case shape.

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorCountDto {
  pub success: bool,
  pub visitor_count: u64
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TotalVisitsDto {
  pub success: bool,
  pub total_visits: u64
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageViewsDto {
  pub success: bool,
  pub page_views: u64
}

// Site-wide requests don't get a pageViews field at all,
// hence the Option:
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDto {
  pub visitor_count: u64,
  pub total_visits: u64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub page_views: Option<u64>
}

impl From<StatsSnapshot> for StatsDto {
  fn from(snapshot: StatsSnapshot) -> Self {
    Self {
      visitor_count: snapshot.visitor_count,
      total_visits: snapshot.total_visits,
      page_views: snapshot.page_views
    }
  }
}

// The posted comment echoed back with a success flag:
#[derive(Debug, Serialize)]
pub struct PostedCommentDto {
  pub success: bool,
  pub id: i64,
  pub author: String,
  pub content: String,
  pub parent_id: i64,
  pub reply_to_id: i64,
  pub visitor_id: String,
  pub date: i64
}

impl From<Comment> for PostedCommentDto {
  fn from(comment: Comment) -> Self {
    Self {
      success: true,
      id: comment.id,
      author: comment.author,
      content: comment.content,
      parent_id: comment.parent_id,
      reply_to_id: comment.reply_to_id,
      visitor_id: comment.visitor_id,
      date: comment.date
    }
  }
}

#[derive(Debug, Serialize)]
pub struct HealthDto {
  pub status: &'static str
}

/* --- Request body and query objects --- */

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleIdBody {
  pub article_id: Option<String>
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
  pub article_id: Option<String>
}

#[derive(Debug, Deserialize)]
pub struct CommentsQuery {
  pub path: Option<String>
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
  pub content: Option<String>,
  pub path: Option<String>,
  pub parent_id: Option<i64>,
  pub reply_to_id: Option<i64>
}
