use reqwest::header::{HeaderMap, LINK};

/// Returns the `rel="next"` target from one or more `Link` headers.
pub(super) fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(parse_next_entry)
}

fn parse_next_entry(entry: &str) -> Option<String> {
    let mut parts = entry.split(';');
    let target = parts.next()?.trim();
    let is_next = parts.any(|parameter| {
        let parameter = parameter.trim().replace(' ', "");
        parameter.eq_ignore_ascii_case("rel=\"next\"") || parameter.eq_ignore_ascii_case("rel=next")
    });
    if !is_next {
        return None;
    }

    target
        .strip_prefix('<')
        .and_then(|target| target.strip_suffix('>'))
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use reqwest::header::HeaderValue;

    use super::*;

    #[test]
    fn finds_next_link_across_separate_headers() {
        let mut headers = HeaderMap::new();
        headers.append(
            LINK,
            HeaderValue::from_static(
                "<https://acme.okta.com/api/v1/groups/g/users?limit=200>; rel=\"self\"",
            ),
        );
        headers.append(
            LINK,
            HeaderValue::from_static(
                "<https://acme.okta.com/api/v1/groups/g/users?after=00u9&limit=200>; rel=\"next\"",
            ),
        );

        assert_eq!(
            next_link(&headers).as_deref(),
            Some("https://acme.okta.com/api/v1/groups/g/users?after=00u9&limit=200")
        );
    }

    #[test]
    fn finds_next_link_in_combined_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static(
                "<https://a.test/self>; rel=\"self\", <https://a.test/next>; rel=\"next\"",
            ),
        );

        assert_eq!(next_link(&headers).as_deref(), Some("https://a.test/next"));
    }

    #[test]
    fn last_page_has_no_next_link() {
        let mut headers = HeaderMap::new();
        headers.insert(
            LINK,
            HeaderValue::from_static("<https://a.test/self>; rel=\"self\""),
        );

        assert_eq!(next_link(&headers), None);
        assert_eq!(next_link(&HeaderMap::new()), None);
    }
}
