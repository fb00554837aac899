//! In-process remotes speaking just enough of each dialect for the
//! end to end tests. Each serves a single connection on an ephemeral
//! local port.

use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{tungstenite::Message, WebSocketStream};

use super::obs_studio::auth_response;
use super::Scene;

#[derive(Debug, Clone)]
pub struct RemoteBehavior {
    pub secret: String,
    pub scenes: Vec<Scene>,
    pub active: usize,
    /// When false the OBS Studio hello carries no authentication block.
    pub offer_auth: bool,
    /// Swallow the first get-active-scene request instead of replying.
    pub ignore_first_active_scene: bool,
}

impl Default for RemoteBehavior {
    fn default() -> Self {
        Self {
            secret: "s3cret".to_string(),
            scenes: vec![
                Scene {
                    id: "scene-1".to_string(),
                    name: "Main".to_string(),
                },
                Scene {
                    id: "scene-2".to_string(),
                    name: "Censored".to_string(),
                },
            ],
            active: 0,
            offer_auth: true,
            ignore_first_active_scene: false,
        }
    }
}

pub struct MockRemote {
    pub port: u16,
    /// Scene changing requests, in arrival order, as "type name" lines.
    pub log: Arc<Mutex<Vec<String>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for MockRemote {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn bind() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    (listener, port)
}

async fn accept(listener: TcpListener) -> Option<WebSocketStream<TcpStream>> {
    let (stream, _) = listener.accept().await.ok()?;
    tokio_tungstenite::accept_async(stream).await.ok()
}

/// A remote that completes the websocket handshake and then says nothing.
pub async fn silent() -> MockRemote {
    let (listener, port) = bind().await;
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = tokio::spawn(async move {
        let Some(mut ws) = accept(listener).await else {
            return;
        };
        while ws.next().await.is_some() {}
    });

    MockRemote { port, log, handle }
}

pub async fn obs_studio(behavior: RemoteBehavior) -> MockRemote {
    let (listener, port) = bind().await;
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = tokio::spawn(serve_obs_studio(listener, behavior, log.clone()));

    MockRemote { port, log, handle }
}

pub async fn streamlabs(behavior: RemoteBehavior) -> MockRemote {
    let (listener, port) = bind().await;
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = tokio::spawn(serve_streamlabs(listener, behavior, log.clone()));

    MockRemote { port, log, handle }
}

async fn serve_obs_studio(
    listener: TcpListener,
    mut behavior: RemoteBehavior,
    log: Arc<Mutex<Vec<String>>>,
) {
    let Some(mut ws) = accept(listener).await else {
        return;
    };

    let hello = if behavior.offer_auth {
        json!({"op":0,"d":{"obsWebSocketVersion":"5.1.0","rpcVersion":1,"authentication":{"challenge":"CHAL","salt":"SALT"}}})
    } else {
        json!({"op":0,"d":{"obsWebSocketVersion":"5.1.0","rpcVersion":1}})
    };
    if ws.send(Message::Text(hello.to_string())).await.is_err() {
        return;
    }

    let expected = auth_response(&behavior.secret, "SALT", "CHAL");
    let mut skipped_active = false;

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(frame) = serde_json::from_str::<Value>(&text) else {
            continue;
        };

        match frame["op"].as_u64() {
            Some(1) => {
                if frame["d"]["authentication"].as_str() == Some(expected.as_str()) {
                    let identified = json!({"op":2,"d":{"negotiatedRpcVersion":1}});
                    if ws.send(Message::Text(identified.to_string())).await.is_err() {
                        return;
                    }
                } else {
                    let _ = ws.close(None).await;
                    return;
                }
            }
            Some(6) => {
                let id = frame["d"]["requestId"].clone();
                let reply = match frame["d"]["requestType"].as_str() {
                    Some("GetSceneList") => {
                        let scenes: Vec<Value> = behavior
                            .scenes
                            .iter()
                            .map(|s| json!({"sceneUuid": s.id, "sceneName": s.name, "sceneIndex": 0}))
                            .collect();
                        json!({"op":7,"d":{"requestId":id,"requestType":"GetSceneList","responseData":{"scenes":scenes}}})
                    }
                    Some("GetCurrentProgramScene") => {
                        if behavior.ignore_first_active_scene && !skipped_active {
                            skipped_active = true;
                            continue;
                        }
                        let active = &behavior.scenes[behavior.active];
                        json!({"op":7,"d":{"requestId":id,"requestType":"GetCurrentProgramScene","responseData":{"currentProgramSceneUuid":active.id,"currentProgramSceneName":active.name}}})
                    }
                    Some("SetCurrentProgramScene") => {
                        let name = frame["d"]["requestData"]["sceneName"]
                            .as_str()
                            .unwrap_or_default();
                        log.lock()
                            .unwrap()
                            .push(format!("SetCurrentProgramScene {}", name));

                        let result = match behavior.scenes.iter().position(|s| s.name == name) {
                            Some(index) => {
                                behavior.active = index;
                                true
                            }
                            None => false,
                        };
                        let code = if result { 100 } else { 600 };
                        json!({"op":7,"d":{"requestId":id,"requestType":"SetCurrentProgramScene","requestStatus":{"result":result,"code":code}}})
                    }
                    _ => continue,
                };

                if ws.send(Message::Text(reply.to_string())).await.is_err() {
                    return;
                }
            }
            _ => {}
        }
    }
}

async fn serve_streamlabs(
    listener: TcpListener,
    mut behavior: RemoteBehavior,
    log: Arc<Mutex<Vec<String>>>,
) {
    let Some(mut ws) = accept(listener).await else {
        return;
    };

    // Framing open marker, the client skips it.
    if ws.send(Message::Text("o".to_string())).await.is_err() {
        return;
    }

    let mut skipped_active = false;

    while let Some(Ok(message)) = ws.next().await {
        let Message::Text(text) = message else {
            continue;
        };
        let Ok(outer) = serde_json::from_str::<String>(&text) else {
            continue;
        };
        let Ok(request) = serde_json::from_str::<Value>(&outer) else {
            continue;
        };

        let id = request["id"].clone();
        let reply = match request["method"].as_str() {
            Some("auth") => {
                let ok = request["params"]["args"][0].as_str() == Some(behavior.secret.as_str());
                json!({"id": id, "result": ok})
            }
            Some("getScenes") => {
                let scenes: Vec<Value> = behavior
                    .scenes
                    .iter()
                    .map(|s| json!({"id": s.id, "name": s.name}))
                    .collect();
                json!({"id": id, "result": scenes})
            }
            Some("activeScene") => {
                if behavior.ignore_first_active_scene && !skipped_active {
                    skipped_active = true;
                    continue;
                }
                let active = &behavior.scenes[behavior.active];
                json!({"id": id, "result": {"id": active.id, "name": active.name}})
            }
            Some("makeSceneActive") => {
                let target = request["params"]["args"][0].as_str().unwrap_or_default();

                let result = match behavior.scenes.iter().position(|s| s.id == target) {
                    Some(index) => {
                        log.lock()
                            .unwrap()
                            .push(format!("makeSceneActive {}", behavior.scenes[index].name));
                        behavior.active = index;
                        true
                    }
                    None => {
                        log.lock()
                            .unwrap()
                            .push(format!("makeSceneActive {}", target));
                        false
                    }
                };
                json!({"id": id, "result": result})
            }
            _ => continue,
        };

        let framed = format!("a[{}]", serde_json::to_string(&reply.to_string()).unwrap());
        if ws.send(Message::Text(framed)).await.is_err() {
            return;
        }
    }
}
