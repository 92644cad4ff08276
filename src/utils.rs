pub fn get_md5(s: &str) -> String {
    let digest = md5::compute(s);
    format!("{:x}", digest)
}

/// Make an untrusted title usable as a filename stem
pub fn sanitize_title(title: &str) -> String {
    let cleaned = sanitize_filename::sanitize(title.trim());
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Strip path separators and reserved names so `name` stays inside its directory
pub fn safe_filename(name: &str) -> String {
    let cleaned = sanitize_filename::sanitize(name.trim());
    let cleaned = cleaned.trim().trim_matches('.');
    if cleaned.is_empty() {
        "video.mp4".to_string()
    } else {
        cleaned.to_string()
    }
}
