pub mod segment;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::remote_control::{Client, ConnectionState, Scene};

pub use segment::{CensorAction, Schedule, Segment};

pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);

/// The embedded player seam. The extension side implements this against
/// the real video element, tests use a recording double.
#[async_trait]
pub trait PlayerControl: Send + Sync {
    async fn set_blur(&self, on: bool) -> Result<(), Error>;

    async fn set_mute(&self, on: bool) -> Result<(), Error>;

    async fn pause(&self) -> Result<(), Error>;
}

#[derive(Debug, Clone)]
pub struct CensorOptions {
    /// Scene shown while a switch-scene segment is active.
    pub censor_scene: String,
    /// Bound on every remote call made from the tick loop. The client
    /// itself only bounds connecting, not the scene operations.
    pub remote_timeout: Duration,
}

/// Drives censorship from player time.
///
/// Each tick is the player's current position in seconds. Blur and mute
/// follow their windows edge to edge, pause fires once per window entry,
/// and switch-scene swaps the streaming tool to the censor scene and back.
/// When the remote is missing, disconnected, or failing, scene work
/// degrades to pausing the player.
pub struct Supervisor {
    schedule: Schedule,
    player: Arc<dyn PlayerControl>,
    remote: Option<Arc<Client>>,
    options: CensorOptions,

    blurred: bool,
    muted: bool,
    in_pause_window: bool,
    scene_swapped: bool,
    saved_scene: Option<Scene>,
}

impl Supervisor {
    pub fn new(
        schedule: Schedule,
        player: Arc<dyn PlayerControl>,
        remote: Option<Arc<Client>>,
        options: CensorOptions,
    ) -> Self {
        Self {
            schedule,
            player,
            remote,
            options,
            blurred: false,
            muted: false,
            in_pause_window: false,
            scene_swapped: false,
            saved_scene: None,
        }
    }

    /// Runs until the tick stream ends, then releases everything still
    /// applied.
    pub async fn run(mut self, mut ticks: mpsc::Receiver<f64>) {
        info!(
            segments = self.schedule.segments.len(),
            "censor supervisor running"
        );

        while let Some(position) = ticks.recv().await {
            self.apply_at(position).await;
        }

        debug!("tick stream ended");
        self.release_all().await;
    }

    async fn apply_at(&mut self, position: f64) {
        let want_blur = self.schedule.is_active(CensorAction::Blur, position);
        if want_blur != self.blurred {
            if let Err(e) = self.player.set_blur(want_blur).await {
                error!(?e, "player blur failed");
            }
            self.blurred = want_blur;
        }

        let want_mute = self.schedule.is_active(CensorAction::Mute, position);
        if want_mute != self.muted {
            if let Err(e) = self.player.set_mute(want_mute).await {
                error!(?e, "player mute failed");
            }
            self.muted = want_mute;
        }

        let want_pause = self.schedule.is_active(CensorAction::Pause, position);
        if want_pause && !self.in_pause_window {
            // Once per window. Resuming is the viewer's call.
            if let Err(e) = self.player.pause().await {
                error!(?e, "player pause failed");
            }
        }
        self.in_pause_window = want_pause;

        let want_swap = self.schedule.is_active(CensorAction::SwitchScene, position);
        if want_swap && !self.scene_swapped {
            self.enter_censor_scene().await;
            self.scene_swapped = true;
        } else if !want_swap && self.scene_swapped {
            self.leave_censor_scene().await;
            self.scene_swapped = false;
        }
    }

    /// Swaps the streaming tool to the censor scene, remembering what was
    /// active for the restore. Any failure falls back to pausing the
    /// player.
    async fn enter_censor_scene(&mut self) {
        match self.try_enter().await {
            Ok(previous) => {
                self.saved_scene = previous;
                info!(scene = %self.options.censor_scene, "censor scene active");
            }
            Err(e) => {
                warn!(?e, "scene switch unavailable, pausing instead");
                if let Err(e) = self.player.pause().await {
                    error!(?e, "fallback pause failed");
                }
            }
        }
    }

    async fn try_enter(&self) -> Result<Option<Scene>, Error> {
        let remote = self.remote()?;

        tokio::time::timeout(self.options.remote_timeout, async {
            let previous = remote.active_scene().await?;

            let target = remote
                .find_scene(&self.options.censor_scene, &[])
                .await?
                .ok_or_else(|| Error::SceneNotFound(self.options.censor_scene.clone()))?;

            if !remote.set_active_scene(&target).await? {
                return Err(Error::SwitchRejected);
            }

            Ok(previous)
        })
        .await
        .map_err(|_| Error::RemoteTimeout)?
    }

    async fn leave_censor_scene(&mut self) {
        let Some(previous) = self.saved_scene.take() else {
            // Nothing was saved on entry, nothing to restore.
            return;
        };

        let remote = match self.remote() {
            Ok(remote) => remote,
            Err(e) => {
                warn!(?e, "cannot restore the scene");
                return;
            }
        };

        let restored = tokio::time::timeout(
            self.options.remote_timeout,
            remote.set_active_scene(&previous),
        )
        .await;

        match restored {
            Ok(Ok(true)) => debug!(scene = %previous.name, "scene restored"),
            Ok(Ok(false)) => warn!(scene = %previous.name, "remote refused the restore"),
            Ok(Err(e)) => warn!(?e, "scene restore failed"),
            Err(_) => warn!("scene restore timed out"),
        }
    }

    fn remote(&self) -> Result<&Arc<Client>, Error> {
        let remote = self.remote.as_ref().ok_or(Error::RemoteDisabled)?;

        if remote.state() != ConnectionState::Connected {
            return Err(Error::NotConnected);
        }

        Ok(remote)
    }

    async fn release_all(&mut self) {
        if self.blurred {
            if let Err(e) = self.player.set_blur(false).await {
                error!(?e, "player blur failed");
            }
            self.blurred = false;
        }

        if self.muted {
            if let Err(e) = self.player.set_mute(false).await {
                error!(?e, "player mute failed");
            }
            self.muted = false;
        }

        if self.scene_swapped {
            self.leave_censor_scene().await;
            self.scene_swapped = false;
        }
    }
}
