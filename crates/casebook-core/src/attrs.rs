//! Structured list attributes: small records kept as serialised text in a
//! single column instead of a dedicated table.
//!
//! Stored text has accumulated several legacy shapes (a bare string, a list of
//! strings, a list of objects). [`decode`] accepts all of them and never fails;
//! malformed data degrades to an empty list (or a one-element list for plain
//! string lists). The strict path for user input is [`decode_submitted`]
//! followed by [`validate_nonempty`].
//!
//! [`encode`] is deterministic: record keys are written in declaration order,
//! so identical values always produce identical text.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

// ─── Item trait ──────────────────────────────────────────────────────────────

/// One element of a structured list attribute.
pub trait ListItem: Sized + Serialize {
  /// Decode a single element of a stored list. `None` drops the element.
  fn from_value(value: &Value) -> Option<Self>;

  /// Fallback applied when the whole stored text is not structured at all.
  fn from_unstructured(_text: &str) -> Option<Self> { None }

  /// Trim every text field; `None` when nothing meaningful remains.
  fn normalize(self) -> Option<Self>;
}

/// Read a text-ish field out of a JSON object. Numbers are stringified;
/// anything else counts as blank.
fn text_field(map: &Map<String, Value>, key: &str) -> String {
  match map.get(key) {
    Some(Value::String(s)) => s.trim().to_owned(),
    Some(Value::Number(n)) => n.to_string(),
    _ => String::new(),
  }
}

fn trimmed(s: String) -> String {
  let t = s.trim();
  if t.len() == s.len() { s } else { t.to_owned() }
}

// ─── Plain strings (names, aliases, phone numbers) ───────────────────────────

impl ListItem for String {
  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }

  fn from_unstructured(text: &str) -> Option<Self> { Some(text.to_owned()) }

  fn normalize(self) -> Option<Self> {
    let s = trimmed(self);
    (!s.is_empty()).then_some(s)
  }
}

// ─── Zone of influence ───────────────────────────────────────────────────────

/// An area where an organization operates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
  pub neighborhood: String,
  pub locality:     String,
  pub city:         String,
  pub province:     String,
}

impl Zone {
  /// "neighborhood, locality, city, province" with blank parts skipped.
  pub fn summary(&self) -> String {
    join_present([
      &self.neighborhood,
      &self.locality,
      &self.city,
      &self.province,
    ])
  }
}

impl ListItem for Zone {
  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Object(map) => Some(Zone {
        neighborhood: text_field(map, "neighborhood"),
        locality:     text_field(map, "locality"),
        city:         text_field(map, "city"),
        province:     text_field(map, "province"),
      }),
      // Older rows stored each zone as just a city name.
      Value::String(s) => Some(Zone { city: s.clone(), ..Zone::default() }),
      _ => None,
    }
  }

  fn normalize(self) -> Option<Self> {
    let zone = Zone {
      neighborhood: trimmed(self.neighborhood),
      locality:     trimmed(self.locality),
      city:         trimmed(self.city),
      province:     trimmed(self.province),
    };
    let blank = zone.neighborhood.is_empty()
      && zone.locality.is_empty()
      && zone.city.is_empty()
      && zone.province.is_empty();
    (!blank).then_some(zone)
  }
}

/// All zone summaries joined with " / ".
pub fn zones_summary(zones: &[Zone]) -> String {
  zones
    .iter()
    .map(Zone::summary)
    .filter(|s| !s.is_empty())
    .collect::<Vec<_>>()
    .join(" / ")
}

// ─── Antecedent ──────────────────────────────────────────────────────────────

/// A user-entered background entry on an organization report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Antecedent {
  pub title:       String,
  pub description: String,
}

impl ListItem for Antecedent {
  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Object(map) => Some(Antecedent {
        title:       text_field(map, "title"),
        description: text_field(map, "description"),
      }),
      _ => None,
    }
  }

  fn normalize(self) -> Option<Self> {
    let a = Antecedent {
      title:       trimmed(self.title),
      description: trimmed(self.description),
    };
    (!(a.title.is_empty() && a.description.is_empty())).then_some(a)
  }
}

// ─── Profile sub-records ─────────────────────────────────────────────────────

/// A known address of an individual.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
  pub street:       String,
  pub number:       String,
  pub neighborhood: String,
  pub city:         String,
  pub province:     String,
}

impl ListItem for Address {
  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Object(map) => Some(Address {
        street:       text_field(map, "street"),
        number:       text_field(map, "number"),
        neighborhood: text_field(map, "neighborhood"),
        city:         text_field(map, "city"),
        province:     text_field(map, "province"),
      }),
      Value::String(s) => Some(Address { street: s.clone(), ..Address::default() }),
      _ => None,
    }
  }

  fn normalize(self) -> Option<Self> {
    let a = Address {
      street:       trimmed(self.street),
      number:       trimmed(self.number),
      neighborhood: trimmed(self.neighborhood),
      city:         trimmed(self.city),
      province:     trimmed(self.province),
    };
    let blank = [&a.street, &a.number, &a.neighborhood, &a.city, &a.province]
      .iter()
      .all(|s| s.is_empty());
    (!blank).then_some(a)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
  pub make:  String,
  pub model: String,
  /// Licence plate.
  pub plate: String,
  pub color: String,
}

impl ListItem for Vehicle {
  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Object(map) => Some(Vehicle {
        make:  text_field(map, "make"),
        model: text_field(map, "model"),
        plate: text_field(map, "plate"),
        color: text_field(map, "color"),
      }),
      _ => None,
    }
  }

  fn normalize(self) -> Option<Self> {
    let v = Vehicle {
      make:  trimmed(self.make),
      model: trimmed(self.model),
      plate: trimmed(self.plate),
      color: trimmed(self.color),
    };
    let blank = [&v.make, &v.model, &v.plate, &v.color]
      .iter()
      .all(|s| s.is_empty());
    (!blank).then_some(v)
  }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employer {
  pub name:   String,
  pub tax_id: String,
  /// ISO dates as entered; kept as text because legacy rows are inconsistent.
  pub since:  String,
  pub until:  String,
}

impl ListItem for Employer {
  fn from_value(value: &Value) -> Option<Self> {
    match value {
      Value::Object(map) => Some(Employer {
        name:   text_field(map, "name"),
        tax_id: text_field(map, "tax_id"),
        since:  text_field(map, "since"),
        until:  text_field(map, "until"),
      }),
      Value::String(s) => Some(Employer { name: s.clone(), ..Employer::default() }),
      _ => None,
    }
  }

  fn normalize(self) -> Option<Self> {
    let e = Employer {
      name:   trimmed(self.name),
      tax_id: trimmed(self.tax_id),
      since:  trimmed(self.since),
      until:  trimmed(self.until),
    };
    (!e.name.is_empty()).then_some(e)
  }
}

// ─── Codec ───────────────────────────────────────────────────────────────────

/// Decode a stored attribute into a list. Never fails.
///
/// - `null` → `[]`
/// - a native list → each element decoded and kept as given; elements of the
///   wrong shape are dropped
/// - a string → parsed as JSON and normalised. A JSON string literal is the
///   bare value itself. On parse failure the item type's unstructured
///   fallback applies (one element for string lists, nothing for records)
/// - anything else → `[]`
pub fn decode<T: ListItem>(raw: &Value) -> Vec<T> {
  match raw {
    Value::Null => Vec::new(),
    Value::Array(items) => items.iter().filter_map(T::from_value).collect(),
    Value::String(text) => match serde_json::from_str::<Value>(text) {
      Ok(Value::Array(items)) => items
        .iter()
        .filter_map(T::from_value)
        .filter_map(T::normalize)
        .collect(),
      Ok(Value::Null) => Vec::new(),
      Ok(Value::String(inner)) => unstructured(&inner),
      Ok(_) | Err(_) => {
        tracing::debug!(text = %text, "unstructured list attribute; using fallback");
        unstructured(text)
      }
    },
    other => {
      tracing::debug!(value = %other, "unexpected list attribute shape; treating as empty");
      Vec::new()
    }
  }
}

fn unstructured<T: ListItem>(text: &str) -> Vec<T> {
  T::from_unstructured(text)
    .and_then(T::normalize)
    .into_iter()
    .collect()
}

/// Decode a nullable text column.
pub fn decode_text<T: ListItem>(text: Option<&str>) -> Vec<T> {
  match text {
    None => Vec::new(),
    Some(s) if s.trim().is_empty() => Vec::new(),
    Some(s) => decode(&Value::String(s.to_owned())),
  }
}

/// Serialise a list back to its stored text form.
pub fn encode<T: Serialize>(items: &[T]) -> Result<String> {
  Ok(serde_json::to_string(items)?)
}

/// Strictly decode a user-submitted attribute: it must be a list (or JSON
/// text holding one) and every element must decode.
pub fn decode_submitted<T: ListItem>(field: &str, raw: &Value) -> Result<Vec<T>> {
  let parsed;
  let list = match raw {
    Value::Array(items) => items,
    Value::String(text) => {
      parsed = serde_json::from_str::<Value>(text)
        .map_err(|_| Error::invalid(field, "expected a structured list"))?;
      match &parsed {
        Value::Array(items) => items,
        _ => return Err(Error::invalid(field, "expected a structured list")),
      }
    }
    Value::Null => return Ok(Vec::new()),
    _ => return Err(Error::invalid(field, "expected a structured list")),
  };

  list
    .iter()
    .enumerate()
    .map(|(i, item)| {
      T::from_value(item)
        .ok_or_else(|| Error::invalid(field, format!("entry {i} is malformed")))
    })
    .collect()
}

/// Reject an empty or all-blank list. Surviving entries are normalised.
pub fn validate_nonempty<T: ListItem>(field: &str, items: Vec<T>) -> Result<Vec<T>> {
  let kept: Vec<T> = items.into_iter().filter_map(T::normalize).collect();
  if kept.is_empty() {
    return Err(Error::invalid(field, "at least one non-blank entry is required"));
  }
  Ok(kept)
}

/// Normalise without the non-empty requirement (optional list fields).
pub fn normalize_all<T: ListItem>(items: Vec<T>) -> Vec<T> {
  items.into_iter().filter_map(T::normalize).collect()
}

// ─── Location (single record) ────────────────────────────────────────────────

/// Where an incident took place. Stored as one structured attribute rather
/// than normalised columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
  pub street:       String,
  pub number:       String,
  pub neighborhood: String,
  pub locality:     String,
  pub city:         String,
  pub province:     String,
}

impl Location {
  /// Decode a stored location. Never fails; non-JSON text becomes the city.
  pub fn decode(raw: &Value) -> Self {
    match raw {
      Value::Object(map) => Self::from_map(map),
      Value::String(text) => match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Self::from_map(&map),
        Ok(Value::Null) => Self::default(),
        Ok(_) | Err(_) => Location { city: text.trim().to_owned(), ..Self::default() },
      },
      _ => Self::default(),
    }
  }

  pub fn decode_text(text: Option<&str>) -> Self {
    text
      .map(|s| Self::decode(&Value::String(s.to_owned())))
      .unwrap_or_default()
  }

  pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  fn from_map(map: &Map<String, Value>) -> Self {
    Location {
      street:       text_field(map, "street"),
      number:       text_field(map, "number"),
      neighborhood: text_field(map, "neighborhood"),
      locality:     text_field(map, "locality"),
      city:         text_field(map, "city"),
      province:     text_field(map, "province"),
    }
  }

  /// Human-readable one-liner used in reports.
  pub fn summary(&self) -> String {
    let street = match (self.street.trim(), self.number.trim()) {
      ("", "") => String::new(),
      (street, "") => street.to_owned(),
      ("", number) => format!("No. {number}"),
      (street, number) => format!("{street} {number}"),
    };
    let text = join_present([
      &street,
      &self.neighborhood,
      &self.locality,
      &self.city,
      &self.province,
    ]);
    if text.is_empty() { "location not recorded".to_owned() } else { text }
  }
}

fn join_present<'a>(parts: impl IntoIterator<Item = &'a String>) -> String {
  parts
    .into_iter()
    .map(|p| p.trim())
    .filter(|p| !p.is_empty())
    .collect::<Vec<_>>()
    .join(", ")
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn zone(n: &str, l: &str, c: &str, p: &str) -> Zone {
    Zone {
      neighborhood: n.into(),
      locality:     l.into(),
      city:         c.into(),
      province:     p.into(),
    }
  }

  #[test]
  fn zones_survive_encode_then_decode_up_to_trimming() {
    let zones = vec![
      zone("  Centro ", "", "Rosario", "Santa Fe "),
      zone("", "", "", ""),
      zone("Ludueña", "Rosario", "", ""),
    ];
    let text = encode(&zones).unwrap();
    let decoded: Vec<Zone> = decode_text(Some(&text));
    assert_eq!(decoded, normalize_all(zones));
    assert_eq!(decoded[0].neighborhood, "Centro");
    assert_eq!(decoded.len(), 2);
  }

  #[test]
  fn encode_is_deterministic_with_declared_key_order() {
    let text = encode(&[zone("a", "b", "c", "d")]).unwrap();
    assert_eq!(
      text,
      r#"[{"neighborhood":"a","locality":"b","city":"c","province":"d"}]"#
    );
  }

  #[test]
  fn garbage_text_decodes_to_empty_record_list() {
    let zones: Vec<Zone> = decode(&json!("not valid structured text"));
    assert!(zones.is_empty());
    let antecedents: Vec<Antecedent> = decode_text(Some("{{{"));
    assert!(antecedents.is_empty());
  }

  #[test]
  fn garbage_text_decodes_to_single_string_for_name_lists() {
    let names: Vec<String> = decode(&json!("not valid structured text"));
    assert_eq!(names, vec!["not valid structured text".to_owned()]);
  }

  #[test]
  fn null_and_odd_shapes_decode_to_empty() {
    assert!(decode::<String>(&Value::Null).is_empty());
    assert!(decode::<Zone>(&json!(42)).is_empty());
    assert!(decode::<Zone>(&json!({"city": "Rosario"})).is_empty());
    assert!(decode_text::<String>(None).is_empty());
    assert!(decode_text::<String>(Some("   ")).is_empty());
  }

  #[test]
  fn native_list_is_returned_as_is() {
    let names: Vec<String> = decode(&json!(["Los Halcones", "Halcones"]));
    assert_eq!(names, vec!["Los Halcones", "Halcones"]);

    let untouched: Vec<String> = decode(&json!([" Los Monos ", ""]));
    assert_eq!(untouched, vec![" Los Monos ", ""]);
  }

  #[test]
  fn stored_text_lists_are_normalised() {
    let names: Vec<String> = decode_text(Some(r#"[" Los Monos ", ""]"#));
    assert_eq!(names, vec!["Los Monos"]);
  }

  #[test]
  fn json_string_literal_is_the_bare_name() {
    let names: Vec<String> = decode_text(Some(r#""Los Monos""#));
    assert_eq!(names, vec!["Los Monos"]);

    let padded: Vec<String> = decode_text(Some(r#"" Los Monos ""#));
    assert_eq!(padded, vec!["Los Monos"]);

    let zones: Vec<Zone> = decode_text(Some(r#""Rosario""#));
    assert!(zones.is_empty());
  }

  #[test]
  fn bare_string_zone_items_become_cities() {
    let zones: Vec<Zone> = decode(&json!(["Rosario", {"city": "Funes"}]));
    assert_eq!(zones[0], zone("", "", "Rosario", ""));
    assert_eq!(zones[1].city, "Funes");
  }

  #[test]
  fn numeric_phone_numbers_are_stringified() {
    let phones: Vec<String> = decode(&json!([3415551234_u64, "341-555"]));
    assert_eq!(phones, vec!["3415551234", "341-555"]);
  }

  #[test]
  fn validate_nonempty_rejects_blank_lists() {
    let err = validate_nonempty("zones", vec![zone(" ", "", "", "")]).unwrap_err();
    assert!(matches!(err, Error::Validation(ref f) if f.0[0].field == "zones"));
    assert!(validate_nonempty::<String>("names", vec![]).is_err());
  }

  #[test]
  fn validate_nonempty_trims_and_keeps_partial_zones() {
    let kept = validate_nonempty(
      "zones",
      vec![zone("", "", " Rosario ", ""), zone("", "", "", "")],
    )
    .unwrap();
    assert_eq!(kept, vec![zone("", "", "Rosario", "")]);
  }

  #[test]
  fn submitted_payload_must_be_a_list() {
    assert!(decode_submitted::<Zone>("zones", &json!("nope")).is_err());
    assert!(decode_submitted::<Zone>("zones", &json!({"city": "x"})).is_err());
    assert!(decode_submitted::<Zone>("zones", &json!([1, 2])).is_err());
    let ok = decode_submitted::<Zone>("zones", &json!(r#"[{"city":"x"}]"#)).unwrap();
    assert_eq!(ok[0].city, "x");
  }

  #[test]
  fn location_summary_skips_blanks() {
    let loc = Location {
      street: "San Martín".into(),
      number: "1200".into(),
      city: "Rosario".into(),
      ..Location::default()
    };
    assert_eq!(loc.summary(), "San Martín 1200, Rosario");
    let only_number = Location { number: "55".into(), ..Location::default() };
    assert_eq!(only_number.summary(), "No. 55");
    assert_eq!(Location::default().summary(), "location not recorded");
  }

  #[test]
  fn legacy_location_text_becomes_city() {
    let loc = Location::decode_text(Some("Villa Gobernador Gálvez"));
    assert_eq!(loc.city, "Villa Gobernador Gálvez");
    let round = Location::decode_text(Some(&loc.encode().unwrap()));
    assert_eq!(round, loc);
  }

  #[test]
  fn zones_summary_joins_with_slash() {
    let zones = vec![zone("Centro", "", "Rosario", ""), zone("", "", "Funes", "")];
    assert_eq!(zones_summary(&zones), "Centro, Rosario / Funes");
  }
}
