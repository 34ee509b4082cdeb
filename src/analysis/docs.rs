use std::collections::HashMap;

/// The parts of an XML documentation comment the analysis reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocComment {
    pub summary: String,
    pub returns: String,
    params: HashMap<String, String>,
}

impl DocComment {
    pub fn parse(xml: Option<&str>) -> Self {
        let Some(xml) = xml else {
            return Self::default();
        };
        let mut params = HashMap::new();
        let mut rest = xml;
        while let Some((open, body, after)) = next_element(rest, "param") {
            if let Some(name) = attribute(open, "name") {
                params.insert(name, render(body));
            }
            rest = after;
        }
        Self {
            summary: next_element(xml, "summary").map(|(_, body, _)| render(body)).unwrap_or_default(),
            returns: next_element(xml, "returns").map(|(_, body, _)| render(body)).unwrap_or_default(),
            params,
        }
    }

    pub fn parameter(&self, name: &str) -> &str {
        self.params.get(name).map(String::as_str).unwrap_or("")
    }
}

/// First `<tag ...>body</tag>` in `xml`: the opening tag's text, the body and what follows.
fn next_element<'a>(xml: &'a str, tag: &str) -> Option<(&'a str, &'a str, &'a str)> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let mut offset = 0;
    while let Some(found) = xml[offset..].find(&open) {
        let start = offset + found;
        let after_name = start + open.len();
        // `<param` must not match `<paramref`
        if !xml[after_name..].starts_with(|c: char| c == '>' || c == '/' || c.is_whitespace()) {
            offset = after_name;
            continue;
        }
        let open_end = xml[start..].find('>')? + start;
        let opening = &xml[start..open_end];
        if opening.ends_with('/') {
            return Some((opening, "", &xml[open_end + 1..]));
        }
        let body_start = open_end + 1;
        let body_end = xml[body_start..].find(&close).map_or(xml.len(), |end| end + body_start);
        let rest = xml.get(body_end + close.len()..).unwrap_or("");
        return Some((opening, &xml[body_start..body_end], rest));
    }
    None
}

fn attribute(tag: &str, name: &str) -> Option<String> {
    let mut rest = tag;
    while let Some(found) = rest.find(name) {
        let preceded_by_space = rest[..found].ends_with(char::is_whitespace);
        let value = rest[found + name.len()..].trim_start();
        rest = &rest[found + name.len()..];
        let Some(value) = value.strip_prefix('=').map(str::trim_start) else {
            continue;
        };
        let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        if !preceded_by_space {
            continue;
        }
        let value = &value[1..];
        let end = value.find(quote)?;
        return Some(decode_entities(&value[..end]));
    }
    None
}

/// Plain text of a documentation fragment. Reference tags collapse to the name they point at;
/// other markup is dropped.
fn render(body: &str) -> String {
    let mut text = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let Some(end) = rest[start..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[start + 1..start + end];
        text.push_str(&inline_reference(tag).unwrap_or_else(|| " ".to_string()));
        rest = &rest[start + end + 1..];
    }
    text.push_str(rest);
    normalize(&decode_entities(&text))
}

fn inline_reference(tag: &str) -> Option<String> {
    let name = tag.split(|c: char| c.is_whitespace() || c == '/').next()?;
    match name {
        "see" | "seealso" => attribute(tag, "cref")
            .map(|cref| short_cref(&cref))
            .or_else(|| attribute(tag, "langword"))
            .or_else(|| attribute(tag, "href")),
        "paramref" | "typeparamref" => attribute(tag, "name"),
        _ => None,
    }
}

/// `T:Contoso.Orders.GetOrderRequest` reads as `GetOrderRequest`.
fn short_cref(cref: &str) -> String {
    let without_kind = match cref.split_once(':') {
        Some((kind, rest)) if kind.len() == 1 => rest,
        _ => cref,
    };
    let head = without_kind.split(['(', '{', '`']).next().unwrap_or(without_kind);
    head.rsplit('.').next().unwrap_or(head).to_string()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
