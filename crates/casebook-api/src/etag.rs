//! ETags for composed reports.
//!
//! The tag is a SHA-256 hash over the composed sections, so it changes
//! whenever any rendered line does and never otherwise.

use axum::http::{HeaderMap, header};
use casebook_core::compose::Section;
use sha2::{Digest, Sha256};

/// Compute a quoted strong ETag for `sections`.
pub fn compute_etag(sections: &[Section]) -> String {
  let mut hasher = Sha256::new();
  for section in sections {
    hasher.update([section.number]);
    hasher.update(section.title.as_bytes());
    hasher.update([0u8]);
    for line in &section.lines {
      hasher.update((line.len() as u64).to_le_bytes());
      hasher.update(line.as_bytes());
    }
    hasher.update([0xffu8]);
  }
  format!("\"{}\"", hex::encode(hasher.finalize()))
}

/// Whether the request's `If-None-Match` header already names `etag`.
pub fn not_modified(headers: &HeaderMap, etag: &str) -> bool {
  headers
    .get_all(header::IF_NONE_MATCH)
    .iter()
    .filter_map(|v| v.to_str().ok())
    .flat_map(|v| v.split(','))
    .map(|tag| tag.trim().trim_start_matches("W/"))
    .any(|tag| tag == "*" || tag == etag)
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn sections(lines: &[&str]) -> Vec<Section> {
    vec![Section {
      number: 1,
      title:  "Executive summary".into(),
      lines:  lines.iter().map(|l| l.to_string()).collect(),
    }]
  }

  #[test]
  fn same_sections_same_etag() {
    assert_eq!(compute_etag(&sections(&["a", "b"])), compute_etag(&sections(&["a", "b"])));
  }

  #[test]
  fn line_boundaries_matter() {
    assert_ne!(compute_etag(&sections(&["ab", "c"])), compute_etag(&sections(&["a", "bc"])));
  }

  #[test]
  fn if_none_match_accepts_lists_and_wildcards() {
    let etag = compute_etag(&sections(&["a"]));
    let mut headers = HeaderMap::new();
    assert!(!not_modified(&headers, &etag));

    headers.insert(
      header::IF_NONE_MATCH,
      HeaderValue::from_str(&format!("\"other\", {etag}")).unwrap(),
    );
    assert!(not_modified(&headers, &etag));

    headers.insert(header::IF_NONE_MATCH, HeaderValue::from_static("*"));
    assert!(not_modified(&headers, &etag));
  }
}
