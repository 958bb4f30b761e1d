// src/models/server.rs
use serde::Serialize;
use serde_json::{Number, Value};

/// One live place instance as exposed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRecord {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub playing: u64,
    pub max_players: u64,
    pub ping: Option<Number>,
    pub fps: Option<Number>,
}

impl ServerRecord {
    /// Fills every missing or mistyped field with its default instead of
    /// rejecting the instance.
    fn from_instance(position: usize, instance: &Value) -> Self {
        Self {
            index: position + 1,
            job_id: id_field(instance),
            playing: count_field(instance, "playing"),
            max_players: count_field(instance, "maxPlayers"),
            ping: number_field(instance, "ping"),
            fps: number_field(instance, "fps"),
        }
    }
}

fn id_field(instance: &Value) -> Option<String> {
    match instance.get("id") {
        Some(Value::String(id)) => Some(id.clone()),
        Some(Value::Number(id)) => Some(id.to_string()),
        _ => None,
    }
}

// Non-negative whole numbers only, `5.0` included.
fn count_field(instance: &Value, field: &str) -> u64 {
    let value = match instance.get(field) {
        Some(value) => value,
        None => return 0,
    };
    value
        .as_u64()
        .or_else(|| {
            value
                .as_f64()
                .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= u64::MAX as f64)
                .map(|n| n as u64)
        })
        .unwrap_or(0)
}

fn number_field(instance: &Value, field: &str) -> Option<Number> {
    match instance.get(field) {
        Some(Value::Number(n)) => Some(n.clone()),
        _ => None,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerList {
    pub list: Vec<ServerRecord>,
}

impl ServerList {
    /// Transforms an Open Cloud `instances` payload. A missing or non-array
    /// `data` field yields an empty list.
    pub fn from_instances(body: &Value) -> Self {
        let list = body
            .get("data")
            .and_then(Value::as_array)
            .map(|instances| {
                instances
                    .iter()
                    .enumerate()
                    .map(|(i, instance)| ServerRecord::from_instance(i, instance))
                    .collect()
            })
            .unwrap_or_default();

        Self { list }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    OpenCloud,
}

#[derive(Debug, Serialize)]
pub struct ServerListResponse<'a> {
    pub ok: bool,
    pub source: Source,
    pub data: &'a ServerList,
}

impl<'a> ServerListResponse<'a> {
    pub fn new(source: Source, data: &'a ServerList) -> Self {
        Self { ok: true, source, data }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub ok: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, details: Option<String>) -> Self {
        Self { ok: false, error: error.into(), details }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transforms_full_instance() {
        let body = json!({
            "data": [{ "id": "job1", "playing": 5, "maxPlayers": 10, "ping": 42, "fps": 60 }]
        });
        let servers = ServerList::from_instances(&body);

        assert_eq!(
            serde_json::to_value(&servers).unwrap(),
            json!({
                "list": [{ "index": 1, "jobId": "job1", "playing": 5, "maxPlayers": 10, "ping": 42, "fps": 60 }]
            })
        );
    }

    #[test]
    fn missing_or_malformed_data_is_empty() {
        for body in [
            json!({}),
            json!({ "data": null }),
            json!({ "data": "nope" }),
            json!({ "data": { "id": "job1" } }),
            json!([1, 2, 3]),
        ] {
            assert!(ServerList::from_instances(&body).list.is_empty(), "{}", body);
        }
    }

    #[test]
    fn missing_fields_take_defaults() {
        let body = json!({ "data": [{ "id": "job1", "playing": null }] });
        let record = &ServerList::from_instances(&body).list[0];

        assert_eq!(record.playing, 0);
        assert_eq!(record.max_players, 0);
        assert_eq!(record.ping, None);
        assert_eq!(record.fps, None);
        assert_eq!(
            serde_json::to_value(record).unwrap(),
            json!({ "index": 1, "jobId": "job1", "playing": 0, "maxPlayers": 0, "ping": null, "fps": null })
        );
    }

    #[test]
    fn index_follows_position_not_payload() {
        let body = json!({
            "data": [
                { "id": "c", "index": 99 },
                { "id": "a", "index": -4 },
                "garbage",
                { "id": "b" }
            ]
        });
        let servers = ServerList::from_instances(&body);

        let indices: Vec<usize> = servers.list.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2, 3, 4]);
        assert_eq!(servers.list[2].job_id, None);
        assert_eq!(servers.list[3].job_id.as_deref(), Some("b"));
    }

    #[test]
    fn integral_floats_and_numeric_ids_are_kept() {
        let body = json!({
            "data": [
                { "id": 12345, "playing": 5.0, "maxPlayers": 10.0 },
                { "id": "job2", "playing": 2.5, "maxPlayers": -3 }
            ]
        });
        let servers = ServerList::from_instances(&body);

        assert_eq!(servers.list[0].job_id.as_deref(), Some("12345"));
        assert_eq!(servers.list[0].playing, 5);
        assert_eq!(servers.list[0].max_players, 10);
        assert_eq!(servers.list[1].playing, 0);
        assert_eq!(servers.list[1].max_players, 0);
    }

    #[test]
    fn fractional_ping_passes_through() {
        let body = json!({ "data": [{ "id": "job1", "ping": 12.5, "fps": 59.94 }] });
        let value = serde_json::to_value(&ServerList::from_instances(&body)).unwrap();

        assert_eq!(value["list"][0]["ping"], json!(12.5));
        assert_eq!(value["list"][0]["fps"], json!(59.94));
    }

    #[test]
    fn envelopes_serialize() {
        let servers = ServerList::default();
        assert_eq!(
            serde_json::to_value(ServerListResponse::new(Source::OpenCloud, &servers)).unwrap(),
            json!({ "ok": true, "source": "opencloud", "data": { "list": [] } })
        );
        assert_eq!(
            serde_json::to_value(ErrorResponse::new("boom", None)).unwrap(),
            json!({ "ok": false, "error": "boom" })
        );
    }
}
