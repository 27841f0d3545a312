pub fn current_user_fixture() -> &'static str {
    return r#"
{
  "error": null,
  "data": {
    "username": "ada",
    "display_name": "Ada L.",
    "full_name": "Ada Lovelace",
    "id": "a1b2c3",
    "photo": "https://example.com/ada.png",
    "last_plugin": "wakabeat/0.1.0",
    "last_heartbeat": "2023-10-01T12:00:00Z"
  }
}
"#
    .trim();
}

pub fn projects_fixture() -> &'static str {
    return r#"
{
  "error": null,
  "data": [
    { "id": "p-1", "name": "Bar" },
    { "id": "p-2", "name": "Foo" },
    { "id": "p-3", "name": "Foo Tools" }
  ]
}
"#
    .trim();
}

pub fn heartbeat_response_fixture(entity: &str, time: i64) -> String {
    return format!(
        r#"{{"error": null, "data": {{"id": "hb-1", "entity": "{entity}", "type": "app", "time": {time}}}}}"#
    );
}

pub fn error_fixture(message: &str) -> String {
    return format!(r#"{{"error": "{message}", "data": null}}"#);
}
