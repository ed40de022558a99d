use chrono::Local;

// Comment dates are plain Unix timestamps with second
// resolution, the clients do their own formatting.
pub fn current_timestamp() -> i64 {
  Local::now().timestamp()
}
