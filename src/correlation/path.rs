use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
}

/// Resolve a dot path such as `data.items[0].id` against a JSON document.
///
/// Each dot-separated part is `name`, `name[i]`, `name[i][j]` or a bare `[i]`.
/// Missing keys, out-of-range indices, malformed segments and JSON `null`
/// all resolve to `None`.
pub fn resolve_path<'v>(root: &'v Value, path: &str) -> Option<&'v Value> {
    let segments = parse_segments(path)?;
    let mut current = root;
    for segment in segments {
        current = match segment {
            Segment::Key(key) => current.as_object()?.get(key)?,
            Segment::Index(idx) => current.as_array()?.get(idx)?,
        };
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

fn parse_segments(path: &str) -> Option<Vec<Segment<'_>>> {
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (name, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if !name.is_empty() {
            segments.push(Segment::Key(name));
        } else if rest.is_empty() {
            // empty segment, e.g. `a..b`
            return None;
        }
        while !rest.is_empty() {
            let close = rest.find(']')?;
            if !rest.starts_with('[') {
                return None;
            }
            let idx = rest[1..close].trim().parse::<usize>().ok()?;
            segments.push(Segment::Index(idx));
            rest = &rest[close + 1..];
        }
    }
    Some(segments)
}
