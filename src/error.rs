#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Websocket error {0}")]
    Websocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Json error: {0}")]
    Json(#[from] serde_json::error::Error),

    #[error("IO Error")]
    IoError(#[from] std::io::Error),

    #[error("Not connected to the streaming tool")]
    NotConnected,

    #[error("Connection closed before a reply arrived")]
    Disconnected,

    #[error("Request replaced by a newer request of the same kind")]
    Superseded,

    #[error("Remote replied with an unexpected payload")]
    UnexpectedResponse,

    #[error("No scene named {0} on the remote")]
    SceneNotFound(String),

    #[error("Remote refused to switch the scene")]
    SwitchRejected,

    #[error("Timed out waiting for the remote")]
    RemoteTimeout,

    #[error("Remote control is disabled in the config")]
    RemoteDisabled,

    #[error("Config file error")]
    ConfigFileError(#[source] std::io::Error),
}
