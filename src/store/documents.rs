use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// The two documents mirror the JSON files on disk. I'm
// using strict structs instead of free-form maps so a
// malformed file fails at load time and not somewhere
// in the middle of a request.

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsDocument {
  // Distinct visitor identities we ever issued a cookie to:
  pub visitors: u64,
  // Distinct (article, visitor) pairs, see record_article_visit:
  pub total_visits: u64,
  pub articles: BTreeMap<String, ArticleStats>
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ArticleStats {
  // Raw page views, not deduplicated in any way:
  pub views: u64,
  // Kept as a list in the file. Membership is checked
  // before inserting so it behaves like a set:
  pub visitors: Vec<String>
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CommentDocument {
  // Page path to ordered comment list:
  #[serde(default)]
  pub pages: BTreeMap<String, Vec<Comment>>,
  // Visitor identity to display number. The number is
  // assigned once, the first time an identity posts,
  // and reused forever after:
  #[serde(default)]
  pub guests: BTreeMap<String, u64>
}

impl CommentDocument {

  // Returns the existing display number for a visitor or
  // assigns the next free one.
  pub fn guest_number(&mut self, visitor_id: &str) -> u64 {
    if let Some(number) = self.guests.get(visitor_id) {
      return *number;
    }
    let next = self.guests.values().max().copied().unwrap_or(0) + 1;
    self.guests.insert(visitor_id.to_string(), next);
    next
  }

}

// Comments keep the snake_case field names, they're
// written to the file and sent to clients as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  // Unique within a single page's list only:
  pub id: i64,
  pub author: String,
  pub content: String,
  // 0 means top-level:
  pub parent_id: i64,
  // The comment being directly replied to, which may
  // differ from the thread root in parent_id:
  pub reply_to_id: i64,
  pub visitor_id: String,
  // Unix timestamp, assigned server-side:
  pub date: i64
}
