// core/src/rules/city.rs

/// Canonical city name: trimmed, single-spaced, each word title-cased
/// (including the part after a hyphen).
pub fn normalize_city(raw: &str) -> String {
  raw
    .split_whitespace()
    .map(|word| word.split('-').map(title_case).collect::<Vec<_>>().join("-"))
    .collect::<Vec<_>>()
    .join(" ")
}

fn title_case(word: &str) -> String {
  let mut chars = word.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
    None => String::new(),
  }
}

pub fn covers_city(cities_covered: &[String], city: &str) -> bool {
  let wanted = normalize_city(city);
  !wanted.is_empty() && cities_covered.iter().any(|c| normalize_city(c) == wanted)
}
