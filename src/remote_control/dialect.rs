use super::{Dialect, Scene};

/// One logical reply extracted from one raw inbound frame.
#[derive(Debug, PartialEq)]
pub enum Inbound {
    /// A frame the codec wants sent back to continue the auth handshake.
    Handshake(String),
    /// The remote accepted our credentials.
    Authenticated,
    /// The remote refused our credentials or cannot offer authentication.
    AuthRejected,
    /// A reply correlated to an earlier request.
    Response(Response),
    /// Nothing usable in this frame, skip it.
    Ignored,
}

#[derive(Debug, PartialEq)]
pub struct Response {
    pub request_id: u64,
    pub body: ResponseBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// Plain success or failure acknowledgement.
    Ack(bool),
    Scenes(Vec<Scene>),
    ActiveScene(Option<Scene>),
}

/// Everything one wire dialect knows how to do.
///
/// Codecs are pure translators. They never touch the socket and never keep
/// per-request state, which keeps both implementations testable against
/// fixture frames.
pub trait DialectCodec: Send + Sync {
    /// Path appended to the websocket url.
    fn endpoint_path(&self) -> &'static str;

    /// First frame to send once the socket is open, for dialects where the
    /// client opens the handshake. OBS Studio speaks first, so it has none.
    fn open_request(&self, request_id: u64) -> Option<String>;

    fn list_scenes_request(&self, request_id: u64) -> String;

    fn active_scene_request(&self, request_id: u64) -> String;

    fn set_active_scene_request(&self, request_id: u64, scene: &Scene) -> String;

    /// Parses one raw inbound frame. Frames that do not parse, or parse to
    /// a shape the dialect does not know, come back as `Ignored`.
    fn parse_message(&self, raw: &str) -> Inbound;
}

/// Picks the codec for the configured dialect.
pub fn codec_for(dialect: Dialect, auth_secret: &str) -> Box<dyn DialectCodec> {
    match dialect {
        Dialect::Streamlabs => Box::new(super::streamlabs::StreamlabsCodec::new(auth_secret)),
        Dialect::ObsStudio => Box::new(super::obs_studio::ObsStudioCodec::new(auth_secret)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codec_selection_follows_the_dialect() {
        let streamlabs = codec_for(Dialect::Streamlabs, "secret");
        assert_eq!("/api/303/jqgvbz3e/websocket", streamlabs.endpoint_path());

        let obs = codec_for(Dialect::ObsStudio, "secret");
        assert_eq!("", obs.endpoint_path());
    }
}
