use url::Url;

/// Sanitize filename to remove invalid characters
pub fn sanitize_filename(filename: &str) -> String {
    filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Save-dialog default for the results of scraping `target`,
/// e.g. `example.com_phone_numbers.csv`
pub fn suggested_filename(target: Option<&str>) -> String {
    let site = target
        .and_then(|t| Url::parse(t).ok())
        .and_then(|url| url.host_str().map(|host| host.trim_start_matches("www.").to_string()));

    match site {
        Some(site) if !site.is_empty() => {
            format!("{}_phone_numbers.csv", sanitize_filename(&site))
        }
        _ => "phone_numbers.csv".to_string(),
    }
}
