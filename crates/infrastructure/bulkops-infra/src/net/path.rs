use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde_json::Value;

use super::RestError;

// Path segment encode set: everything that would end or restructure a segment.
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

fn encode(value: &str) -> String {
    utf8_percent_encode(value, SEGMENT).to_string()
}

/// Fills `{field}` placeholders from the item's JSON fields. `{pulp_id}` falls
/// back to the id parsed from the item's `pulp_href`.
pub fn expand_item_path(template: &str, item: &Value) -> Result<String, RestError> {
    fill(template, |name| {
        let value = match item.get(name) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ if name == "pulp_id" => item
                .get("pulp_href")
                .and_then(Value::as_str)
                .and_then(parse_pulp_id_from_href)
                .map(str::to_string),
            _ => None,
        }?;
        Some(encode(&value))
    })
}

fn fill(
    template: &str,
    mut lookup: impl FnMut(&str) -> Option<String>,
) -> Result<String, RestError> {
    let mut out = String::with_capacity(template.len() + 16);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            RestError::InvalidUrl(format!("unclosed placeholder in '{template}'"))
        })?;
        let name = after[..end].trim();
        let value = lookup(name).ok_or_else(|| {
            RestError::InvalidUrl(format!(
                "no value for placeholder '{{{name}}}' in '{template}'"
            ))
        })?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Last non-empty segment of a pulp href, e.g. the id in
/// `/pulp/api/v3/remotes/ansible/collection/0190a1b2/`.
pub fn parse_pulp_id_from_href(href: &str) -> Option<&str> {
    href.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn item_fields_fill_named_placeholders() {
        let item = json!({ "id": 12, "name": "stream one" });
        assert_eq!(
            expand_item_path("/event-streams/{id}/", &item).unwrap(),
            "/event-streams/12/"
        );
        assert_eq!(
            expand_item_path("/by-name/{name}/", &item).unwrap(),
            "/by-name/stream%20one/"
        );
        assert_eq!(
            expand_item_path("/namespaces/{name}/", &json!({ "name": "my ns/x" })).unwrap(),
            "/namespaces/my%20ns%2Fx/"
        );
        assert!(expand_item_path("/x/{missing}/", &item).is_err());
    }

    #[test]
    fn pulp_id_comes_from_href() {
        let item = json!({ "pulp_href": "/pulp/api/v3/remotes/ansible/collection/0190a1b2/" });
        assert_eq!(
            expand_item_path("/remotes/ansible/collection/{pulp_id}/", &item).unwrap(),
            "/remotes/ansible/collection/0190a1b2/"
        );
        assert_eq!(parse_pulp_id_from_href(""), None);
    }
}
