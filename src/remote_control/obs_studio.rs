//! OBS Studio dialect, the native v5 websocket protocol. Every frame is an
//! `{ op, d }` envelope. The remote opens with a Hello carrying the auth
//! challenge, the client answers with Identify, and an Identified frame
//! completes the handshake.

use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::dialect::{DialectCodec, Inbound, Response, ResponseBody};
use super::Scene;

const RPC_VERSION: u64 = 1;

mod op {
    pub const HELLO: u64 = 0;
    pub const IDENTIFY: u64 = 1;
    pub const IDENTIFIED: u64 = 2;
    pub const REQUEST: u64 = 6;
    pub const REQUEST_RESPONSE: u64 = 7;
}

#[derive(Serialize, Debug)]
struct Envelope<D> {
    op: u64,
    d: D,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Identify<'a> {
    rpc_version: u64,
    authentication: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Request<'a> {
    request_id: u64,
    request_type: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_data: Option<RequestData<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RequestData<'a> {
    scene_name: &'a str,
}

#[derive(Deserialize, Debug)]
struct RawEnvelope {
    op: u64,
    #[serde(default)]
    d: Value,
}

#[derive(Deserialize, Debug)]
struct Hello {
    authentication: Option<AuthChallenge>,
}

#[derive(Deserialize, Debug)]
struct AuthChallenge {
    challenge: String,
    salt: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RawResponse {
    request_id: u64,
    request_type: String,
    #[serde(default)]
    response_data: Option<Value>,
    #[serde(default)]
    request_status: Option<RequestStatus>,
}

#[derive(Deserialize, Debug)]
struct RequestStatus {
    result: bool,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct SceneListData {
    scenes: Vec<RemoteScene>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RemoteScene {
    scene_uuid: String,
    scene_name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct ProgramSceneData {
    current_program_scene_uuid: String,
    current_program_scene_name: String,
}

pub struct ObsStudioCodec {
    auth_secret: String,
}

impl ObsStudioCodec {
    pub fn new(auth_secret: &str) -> Self {
        Self {
            auth_secret: auth_secret.to_string(),
        }
    }

    fn request(&self, id: u64, request_type: &str, request_data: Option<RequestData>) -> String {
        let request = Envelope {
            op: op::REQUEST,
            d: Request {
                request_id: id,
                request_type,
                request_data,
            },
        };

        serde_json::to_string(&request).unwrap()
    }

    fn identify(&self, d: Value) -> Inbound {
        let hello: Hello = match serde_json::from_value(d) {
            Ok(h) => h,
            // A hello we cannot read is as fatal as a refusal.
            Err(_) => return Inbound::AuthRejected,
        };

        let auth = match hello.authentication {
            Some(a) => a,
            // No challenge offered means the handshake cannot proceed.
            None => return Inbound::AuthRejected,
        };

        let authentication = auth_response(&self.auth_secret, &auth.salt, &auth.challenge);
        let identify = Envelope {
            op: op::IDENTIFY,
            d: Identify {
                rpc_version: RPC_VERSION,
                authentication: &authentication,
            },
        };

        Inbound::Handshake(serde_json::to_string(&identify).unwrap())
    }

    fn response(d: Value) -> Inbound {
        let response: RawResponse = match serde_json::from_value(d) {
            Ok(r) => r,
            Err(_) => return Inbound::Ignored,
        };

        let body = match response.request_type.as_str() {
            "GetSceneList" => {
                let data: SceneListData = match response
                    .response_data
                    .and_then(|d| serde_json::from_value(d).ok())
                {
                    Some(d) => d,
                    None => return Inbound::Ignored,
                };

                ResponseBody::Scenes(
                    data.scenes
                        .into_iter()
                        .map(|s| Scene {
                            id: s.scene_uuid,
                            name: s.scene_name,
                        })
                        .collect(),
                )
            }
            "GetCurrentProgramScene" => {
                let data: Option<ProgramSceneData> = response
                    .response_data
                    .and_then(|d| serde_json::from_value(d).ok());

                ResponseBody::ActiveScene(data.map(|d| Scene {
                    id: d.current_program_scene_uuid,
                    name: d.current_program_scene_name,
                }))
            }
            "SetCurrentProgramScene" => {
                ResponseBody::Ack(response.request_status.map(|s| s.result).unwrap_or(false))
            }
            _ => return Inbound::Ignored,
        };

        Inbound::Response(Response {
            request_id: response.request_id,
            body,
        })
    }
}

impl DialectCodec for ObsStudioCodec {
    fn endpoint_path(&self) -> &'static str {
        ""
    }

    fn open_request(&self, _request_id: u64) -> Option<String> {
        None
    }

    fn list_scenes_request(&self, request_id: u64) -> String {
        self.request(request_id, "GetSceneList", None)
    }

    fn active_scene_request(&self, request_id: u64) -> String {
        self.request(request_id, "GetCurrentProgramScene", None)
    }

    fn set_active_scene_request(&self, request_id: u64, scene: &Scene) -> String {
        // Writes address the scene by name, reads return uuid and name.
        self.request(
            request_id,
            "SetCurrentProgramScene",
            Some(RequestData {
                scene_name: &scene.name,
            }),
        )
    }

    fn parse_message(&self, raw: &str) -> Inbound {
        let envelope: RawEnvelope = match serde_json::from_str(raw) {
            Ok(e) => e,
            Err(_) => return Inbound::Ignored,
        };

        match envelope.op {
            op::HELLO => self.identify(envelope.d),
            op::IDENTIFIED => Inbound::Authenticated,
            op::REQUEST_RESPONSE => Self::response(envelope.d),
            _ => Inbound::Ignored,
        }
    }
}

/// The v5 auth chain: the secret and salt are hashed, the base64 of that
/// hash is concatenated with the challenge and hashed again.
pub(crate) fn auth_response(secret: &str, salt: &str, challenge: &str) -> String {
    let hash = Sha256::digest(format!("{}{}", secret, salt));
    let hash = general_purpose::STANDARD.encode(hash);

    let response = Sha256::digest(format!("{}{}", hash, challenge));
    general_purpose::STANDARD.encode(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    const AUTH_FIXTURE: &str = "NtGc3MbPN5LC5pswM2YdENjAoMg8UaGMsNsq8iiWYDA=";

    fn codec() -> ObsStudioCodec {
        ObsStudioCodec::new("s3cret")
    }

    #[test]
    fn auth_response_is_deterministic() {
        let first = auth_response("s3cret", "SALT", "CHAL");
        let second = auth_response("s3cret", "SALT", "CHAL");

        assert_eq!(AUTH_FIXTURE, first);
        assert_eq!(first, second);
    }

    #[test]
    fn hello_with_challenge_becomes_identify() {
        let hello = r#"{"op":0,"d":{"obsWebSocketVersion":"5.0.1","rpcVersion":1,"authentication":{"challenge":"CHAL","salt":"SALT"}}}"#;

        let expected = format!(
            r#"{{"op":1,"d":{{"rpcVersion":1,"authentication":"{}"}}}}"#,
            AUTH_FIXTURE
        );

        assert_eq!(
            Inbound::Handshake(expected),
            codec().parse_message(hello)
        );
    }

    #[test]
    fn hello_without_authentication_is_a_rejection() {
        let hello = r#"{"op":0,"d":{"obsWebSocketVersion":"5.0.1","rpcVersion":1}}"#;

        assert_eq!(Inbound::AuthRejected, codec().parse_message(hello));
    }

    #[test]
    fn identified_completes_the_handshake() {
        let identified = r#"{"op":2,"d":{"negotiatedRpcVersion":1}}"#;

        assert_eq!(Inbound::Authenticated, codec().parse_message(identified));
    }

    #[test]
    fn list_scenes_request_has_no_data() {
        assert_eq!(
            r#"{"op":6,"d":{"requestId":250,"requestType":"GetSceneList"}}"#,
            codec().list_scenes_request(250)
        );
    }

    #[test]
    fn scene_list_reply_round_trips() {
        let raw = r#"{"op":7,"d":{"requestId":250,"requestType":"GetSceneList","responseData":{"scenes":[{"sceneUuid":"abc","sceneName":"Main"}]}}}"#;

        assert_eq!(
            Inbound::Response(Response {
                request_id: 250,
                body: ResponseBody::Scenes(vec![Scene {
                    id: "abc".to_string(),
                    name: "Main".to_string()
                }]),
            }),
            codec().parse_message(raw)
        );
    }

    #[test]
    fn set_active_scene_sends_the_name_never_the_id() {
        let scene = Scene {
            id: "uuid-1".to_string(),
            name: "Main".to_string(),
        };

        assert_eq!(
            r#"{"op":6,"d":{"requestId":414,"requestType":"SetCurrentProgramScene","requestData":{"sceneName":"Main"}}}"#,
            codec().set_active_scene_request(414, &scene)
        );
    }

    #[test]
    fn active_scene_reply_maps_uuid_and_name() {
        let raw = r#"{"op":7,"d":{"requestId":301,"requestType":"GetCurrentProgramScene","responseData":{"currentProgramSceneUuid":"u1","currentProgramSceneName":"Main","sceneUuid":"u1","sceneName":"Main"}}}"#;

        assert_eq!(
            Inbound::Response(Response {
                request_id: 301,
                body: ResponseBody::ActiveScene(Some(Scene {
                    id: "u1".to_string(),
                    name: "Main".to_string()
                })),
            }),
            codec().parse_message(raw)
        );
    }

    #[test]
    fn set_active_scene_reply_reports_the_outcome() {
        let refused = r#"{"op":7,"d":{"requestId":400,"requestType":"SetCurrentProgramScene","requestStatus":{"result":false,"code":600}}}"#;

        assert_eq!(
            Inbound::Response(Response {
                request_id: 400,
                body: ResponseBody::Ack(false),
            }),
            codec().parse_message(refused)
        );
    }

    #[test]
    fn unusable_frames_are_ignored() {
        let codec = codec();

        assert_eq!(Inbound::Ignored, codec.parse_message("not json"));
        assert_eq!(Inbound::Ignored, codec.parse_message(r#"{"op":5,"d":{}}"#));
        assert_eq!(Inbound::Ignored, codec.parse_message(r#"{"op":7,"d":{}}"#));
        assert_eq!(Inbound::Ignored, codec.parse_message(r#"{"d":{}}"#));
    }
}
