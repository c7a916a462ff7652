/// Reduce a title to the identifier used for folders, geodatabase files and
/// feature classes. Only alphanumeric characters survive; distinct titles
/// that differ solely in punctuation or whitespace therefore collide.
pub fn sanitize_name(raw: &str) -> String {
    raw.chars().filter(|c| c.is_alphanumeric()).collect()
}

pub fn geodatabase_file_name(service: &str) -> String {
    format!("export_{service}.gdb")
}
