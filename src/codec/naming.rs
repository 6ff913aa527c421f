//! camelCase member naming policy
//!
//! Only struct members are renamed. Names that are already camelCase (or were
//! renamed explicitly with serde attributes) come out unchanged, and map keys
//! are data, so they never pass through here.

/// Convert a member name to its wire form
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for (i, ch) in name.chars().enumerate() {
        if ch == '_' {
            // Leading underscores are kept, inner ones start a new word
            if out.is_empty() && i == 0 {
                out.push(ch);
            } else {
                upper_next = true;
            }
            continue;
        }
        if upper_next && !out.trim_start_matches('_').is_empty() {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        upper_next = false;
    }

    out
}

/// Resolve a wire key against the declared member names of a struct
///
/// An exact match wins, then a member whose camelCase form equals the key.
/// Unknown keys come back unchanged.
pub fn member_name(key: String, members: &[&'static str]) -> String {
    if members.contains(&key.as_str()) {
        return key;
    }
    members
        .iter()
        .find(|member| to_camel_case(member) == key)
        .map(|member| (*member).to_string())
        .unwrap_or(key)
}
