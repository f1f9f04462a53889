// vitrine/src/models/reference.rs

//! External references: correlation ids the gateway echoes back on redirect.

use chrono::{DateTime, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

const PREFIX: &str = "vt";

/// `vt-<buyer uuid>-<unix millis>-<8 hex>`, unique per checkout attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalReference {
  pub buyer_id: Uuid,
  pub timestamp_millis: i64,
  pub suffix: String,
}

impl ExternalReference {
  pub fn generate(buyer_id: Uuid, now: DateTime<Utc>) -> Self {
    let suffix = Uuid::new_v4().simple().to_string()[..8].to_string();
    Self {
      buyer_id,
      timestamp_millis: now.timestamp_millis(),
      suffix,
    }
  }

  pub fn created_at(&self) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(self.timestamp_millis).single()
  }
}

impl fmt::Display for ExternalReference {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}-{}-{}", PREFIX, self.buyer_id, self.timestamp_millis, self.suffix)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed external reference '{0}'")]
pub struct MalformedReference(pub String);

impl FromStr for ExternalReference {
  type Err = MalformedReference;

  fn from_str(raw: &str) -> Result<Self, Self::Err> {
    let malformed = || MalformedReference(raw.to_string());
    let rest = raw.strip_prefix(PREFIX).and_then(|r| r.strip_prefix('-')).ok_or_else(malformed)?;
    // A hyphenated UUID is 36 chars and contains hyphens itself.
    if rest.len() < 36 || !rest.is_char_boundary(36) {
      return Err(malformed());
    }
    let (uuid_part, tail) = rest.split_at(36);
    let buyer_id = Uuid::parse_str(uuid_part).map_err(|_| malformed())?;
    let mut parts = tail.strip_prefix('-').ok_or_else(malformed)?.splitn(2, '-');
    let timestamp_millis = parts
      .next()
      .and_then(|t| t.parse::<i64>().ok())
      .ok_or_else(malformed)?;
    let suffix = parts.next().ok_or_else(malformed)?;
    if suffix.len() != 8 || !suffix.chars().all(|c| c.is_ascii_hexdigit()) {
      return Err(malformed());
    }
    Ok(Self {
      buyer_id,
      timestamp_millis,
      suffix: suffix.to_string(),
    })
  }
}
