//! Submission attachments are served through the backend's image proxy,
//! authenticated with a query-string token.

pub fn image_proxy_url(
    base_url: &str,
    project_uid: &str,
    submission_id: &str,
    filename: &str,
    token: Option<&str>,
) -> String {
    let mut url = format!(
        "{}/kobo/image/{}/{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(project_uid),
        urlencoding::encode(submission_id),
        urlencoding::encode(filename),
    );
    if let Some(t) = token {
        url.push_str("?token=");
        url.push_str(&urlencoding::encode(t));
    }
    url
}
