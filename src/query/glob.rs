/// Case-insensitive glob-lite match of a file name.
///
/// Without `*` the pattern matches as a substring. With `*`, the text before
/// the first star anchors the start, the text after the last star anchors the
/// end, and the segments in between must appear in order without overlapping.
pub fn match_glob(name: &str, pattern: &str) -> bool {
    let name = name.to_lowercase();
    let pattern = pattern.to_lowercase();

    if !pattern.contains('*') {
        return name.contains(&pattern);
    }

    let segments: Vec<&str> = pattern.split('*').collect();
    let (first, rest) = match segments.split_first() {
        Some(split) => split,
        None => return true,
    };
    let (last, middle) = match rest.split_last() {
        Some(split) => split,
        None => return name.starts_with(first),
    };

    if name.len() < first.len() + last.len() {
        return false;
    }
    if !name.starts_with(first) || !name.ends_with(last) {
        return false;
    }

    let mut remaining = &name[first.len()..name.len() - last.len()];
    for segment in middle.iter().filter(|segment| !segment.is_empty()) {
        match remaining.find(segment) {
            Some(index) => remaining = &remaining[index + segment.len()..],
            None => return false,
        }
    }

    true
}
