/// Formats whole seconds as abbreviated hours/minutes/seconds, dropping
/// zero-valued units (`3725` → `"1 hr, 2 min, 5 sec"`, `0` → `"0 sec"`).
pub fn format_elapsed(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    let parts: Vec<String> = [(hours, "hr"), (minutes, "min"), (seconds, "sec")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| format!("{} {}", value, unit))
        .collect();

    if parts.is_empty() {
        "0 sec".to_string()
    } else {
        parts.join(", ")
    }
}
