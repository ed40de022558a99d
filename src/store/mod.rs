use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use color_eyre::Result;
use eyre::{WrapErr, eyre};
use log::info;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::utils::time_utils;

mod documents;
pub use documents::{ArticleStats, Comment, CommentDocument, StatsDocument};

/**
 * File-backed JSON document stores. Each store is a single
 * document read in full at the start of every operation and
 * rewritten in full after every mutation. The per-store mutex
 * covers the whole load-apply-save cycle so two concurrent
 * requests can't clobber each other's increments.
 */

// What a mutation closure decided, so read-only code paths
// don't rewrite the file for nothing:
pub enum Outcome<R> {
  Changed(R),
  Unchanged(R)
}

pub struct JsonStore<T> {
  path: PathBuf,
  lock: Mutex<()>,
  document: PhantomData<T>
}

impl<T> JsonStore<T>
where
  T: Serialize + DeserializeOwned + Default
{

  // Creates the file with the default document when it's
  // missing. An existing file that doesn't parse is an error
  // right away, not on the first request that needs it.
  pub fn open<P: AsRef<Path>>(path: P) -> Result<JsonStore<T>> {
    let path = path.as_ref().to_path_buf();
    if path.exists() {
      load_document::<T>(&path)?;
    } else {
      save_document(&path, &T::default())?;
      info!("Created store file at {}", path.display());
    }
    Ok(JsonStore {
      path,
      lock: Mutex::new(()),
      document: PhantomData
    })
  }

  pub fn read<R, F>(&self, operation: F) -> Result<R>
  where
    F: FnOnce(&T) -> R
  {
    let _guard = self.lock.lock()
      .map_err(|_| eyre!("Store lock is poisoned - {}", self.path.display()))?;
    let document = load_document::<T>(&self.path)?;
    Ok(operation(&document))
  }

  pub fn update<R, F>(&self, operation: F) -> Result<R>
  where
    F: FnOnce(&mut T) -> Outcome<R>
  {
    let _guard = self.lock.lock()
      .map_err(|_| eyre!("Store lock is poisoned - {}", self.path.display()))?;
    let mut document = load_document::<T>(&self.path)?;
    match operation(&mut document) {
      Outcome::Changed(result) => {
        save_document(&self.path, &document)?;
        Ok(result)
      },
      Outcome::Unchanged(result) => Ok(result)
    }
  }

}

fn load_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
  let file = File::open(path)
    .context(format!("Opening store file {}", path.display()))?;
  serde_json::from_reader(BufReader::new(file))
    .context(format!("Parsing store file {}", path.display()))
}

fn save_document<T: Serialize>(path: &Path, document: &T) -> Result<()> {
  let file = File::create(path)
    .context(format!("Creating store file {}", path.display()))?;
  // Pretty-printed like the historical files, they get
  // hand-inspected from time to time:
  serde_json::to_writer_pretty(BufWriter::new(file), document)
    .context(format!("Writing store file {}", path.display()))
}

// Read-only view used by the stats endpoint. page_views is
// only present when a specific article was asked for.
#[derive(Debug)]
pub struct StatsSnapshot {
  pub visitor_count: u64,
  pub total_visits: u64,
  pub page_views: Option<u64>
}

pub struct StatsRepo {
  store: JsonStore<StatsDocument>
}

impl StatsRepo {

  pub fn open<P: AsRef<Path>>(path: P) -> Result<StatsRepo> {
    Ok(StatsRepo {
      store: JsonStore::open(path)?
    })
  }

  // Only called for clients that didn't carry a visitor
  // cookie. Clients that clear cookies get recounted, there
  // is no server-side dedup beyond the cookie itself.
  pub fn record_new_visitor(&self) -> Result<u64> {
    self.store.update(|stats| {
      stats.visitors += 1;
      Outcome::Changed(stats.visitors)
    })
  }

  pub fn visitor_count(&self) -> Result<u64> {
    self.store.read(|stats| stats.visitors)
  }

  // Idempotent per (visitor, article) pair: the visitor list
  // of the article doubles as the dedup set for total_visits.
  pub fn record_article_visit(
    &self,
    article_id: &str,
    visitor_id: &str
  ) -> Result<u64> {
    self.store.update(|stats| {
      let article = stats.articles
        .entry(article_id.to_string())
        .or_default();
      if article.visitors.iter().any(|v| v == visitor_id) {
        return Outcome::Unchanged(stats.total_visits);
      }
      article.visitors.push(visitor_id.to_string());
      stats.total_visits += 1;
      Outcome::Changed(stats.total_visits)
    })
  }

  // Raw view counter, every single call increments:
  pub fn record_page_view(&self, article_id: &str) -> Result<u64> {
    self.store.update(|stats| {
      let article = stats.articles
        .entry(article_id.to_string())
        .or_default();
      article.views += 1;
      Outcome::Changed(article.views)
    })
  }

  // Pure read: asking for an article that was never visited
  // must not create an entry for it.
  pub fn snapshot(&self, article_id: Option<&str>) -> Result<StatsSnapshot> {
    self.store.read(|stats| StatsSnapshot {
      visitor_count: stats.visitors,
      total_visits: stats.total_visits,
      page_views: article_id.map(|id| {
        stats.articles.get(id).map(|a| a.views).unwrap_or(0)
      })
    })
  }

}

// Everything needed to build a comment except what the
// store assigns itself (id, author, date):
pub struct NewComment {
  pub content: String,
  pub parent_id: i64,
  pub reply_to_id: i64,
  pub visitor_id: String
}

pub struct CommentRepo {
  store: JsonStore<CommentDocument>
}

impl CommentRepo {

  pub fn open<P: AsRef<Path>>(path: P) -> Result<CommentRepo> {
    Ok(CommentRepo {
      store: JsonStore::open(path)?
    })
  }

  // Comments sorted by ascending date. The sort is stable so
  // same-second comments keep their insertion order.
  pub fn comments_for_page(&self, path: &str) -> Result<Vec<Comment>> {
    self.store.read(|document| {
      let mut comments = document.pages
        .get(path)
        .cloned()
        .unwrap_or_default();
      comments.sort_by_key(|c| c.date);
      comments
    })
  }

  pub fn append_comment(
    &self,
    page: &str,
    new_comment: NewComment
  ) -> Result<Comment> {
    self.store.update(|document| {
      let author = format!(
        "游客 {}",
        document.guest_number(&new_comment.visitor_id)
      );
      let comments = document.pages
        .entry(page.to_string())
        .or_insert_with(Vec::new);
      // Ids only have to be unique within the page:
      let id = comments.iter().map(|c| c.id).max().unwrap_or(0) + 1;
      let comment = Comment {
        id,
        author,
        content: new_comment.content,
        parent_id: new_comment.parent_id,
        reply_to_id: new_comment.reply_to_id,
        visitor_id: new_comment.visitor_id,
        date: time_utils::current_timestamp()
      };
      comments.push(comment.clone());
      Outcome::Changed(comment)
    })
  }

}
