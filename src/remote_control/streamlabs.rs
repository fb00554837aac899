//! Streamlabs dialect. JSON-RPC 2.0 requests double encoded into a string
//! frame, replies arriving as framed arrays of JSON encoded strings.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::dialect::{DialectCodec, Inbound, Response, ResponseBody};
use super::Scene;

const ENDPOINT_PATH: &str = "/api/303/jqgvbz3e/websocket";
const TCP_SERVER_SERVICE: &str = "TcpServerService";
const SCENES_SERVICE: &str = "ScenesService";

#[derive(Serialize, Debug)]
struct RpcRequest<'a> {
    id: u64,
    jsonrpc: &'static str,
    method: &'a str,
    params: RpcParams<'a>,
}

#[derive(Serialize, Debug)]
struct RpcParams<'a> {
    resource: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    args: Option<Vec<&'a str>>,
}

#[derive(Deserialize, Debug)]
struct RpcReply {
    id: u64,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct RemoteScene {
    id: String,
    name: String,
}

pub struct StreamlabsCodec {
    auth_secret: String,
}

impl StreamlabsCodec {
    pub fn new(auth_secret: &str) -> Self {
        Self {
            auth_secret: auth_secret.to_string(),
        }
    }

    fn request(&self, id: u64, method: &str, resource: &str, args: Option<Vec<&str>>) -> String {
        let request = RpcRequest {
            id,
            jsonrpc: "2.0",
            method,
            params: RpcParams { resource, args },
        };

        // The remote expects a JSON encoded string whose contents are the
        // JSON encoded request. Both passes matter.
        let body = serde_json::to_string(&request).unwrap();
        serde_json::to_string(&body).unwrap()
    }

    /// Undoes the inbound framing: one leading character, then a JSON pass
    /// that usually yields a one element array of JSON encoded strings,
    /// then a second JSON pass over that string.
    fn reply_payload(raw: &str) -> Option<RpcReply> {
        let body = raw.get(1..)?;
        let first: Value = serde_json::from_str(body).ok()?;

        let inner = match first {
            Value::String(s) => s,
            Value::Array(mut items) => match (items.len(), items.pop()) {
                (1, Some(Value::String(s))) => s,
                _ => return None,
            },
            _ => return None,
        };

        serde_json::from_str(&inner).ok()
    }

    fn classify(reply: RpcReply) -> Inbound {
        let body = if reply.error.is_some() {
            ResponseBody::Ack(false)
        } else {
            match reply.result {
                Value::Bool(ok) => ResponseBody::Ack(ok),
                Value::Array(_) => {
                    let scenes: Vec<RemoteScene> = match serde_json::from_value(reply.result) {
                        Ok(s) => s,
                        Err(_) => return Inbound::Ignored,
                    };

                    ResponseBody::Scenes(
                        scenes
                            .into_iter()
                            .map(|s| Scene {
                                id: s.id,
                                name: s.name,
                            })
                            .collect(),
                    )
                }
                Value::Object(_) => match serde_json::from_value::<RemoteScene>(reply.result) {
                    Ok(s) => ResponseBody::ActiveScene(Some(Scene {
                        id: s.id,
                        name: s.name,
                    })),
                    Err(_) => return Inbound::Ignored,
                },
                Value::Null => ResponseBody::ActiveScene(None),
                _ => return Inbound::Ignored,
            }
        };

        Inbound::Response(Response {
            request_id: reply.id,
            body,
        })
    }
}

impl DialectCodec for StreamlabsCodec {
    fn endpoint_path(&self) -> &'static str {
        ENDPOINT_PATH
    }

    fn open_request(&self, request_id: u64) -> Option<String> {
        Some(self.request(
            request_id,
            "auth",
            TCP_SERVER_SERVICE,
            Some(vec![&self.auth_secret]),
        ))
    }

    fn list_scenes_request(&self, request_id: u64) -> String {
        self.request(request_id, "getScenes", SCENES_SERVICE, None)
    }

    fn active_scene_request(&self, request_id: u64) -> String {
        self.request(request_id, "activeScene", SCENES_SERVICE, None)
    }

    fn set_active_scene_request(&self, request_id: u64, scene: &Scene) -> String {
        // Writes address the scene by id, names are display only here.
        self.request(
            request_id,
            "makeSceneActive",
            SCENES_SERVICE,
            Some(vec![&scene.id]),
        )
    }

    fn parse_message(&self, raw: &str) -> Inbound {
        match Self::reply_payload(raw) {
            Some(reply) => Self::classify(reply),
            None => Inbound::Ignored,
        }
    }
}
