use std::time::Duration;

use anyhow::Result;
use streamcensor::{
    config::{self, ConfigLogic},
    print_logo, Client,
};
use tracing::{debug, info, warn};

/// Upper bound on the whole connection check.
const CHECK_TIMEOUT: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<()> {
    print_logo();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("streamcensor=debug".parse()?),
        )
        .init();

    let config_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.json".to_string());
    let config = config::File {
        name: config_name.into(),
    }
    .load()?;

    info!(user = %config.user.name, "checking the streaming tool connection");

    if !config.remote_control.enabled {
        info!("remote control is disabled, nothing to check");
        return Ok(());
    }

    let options = (&config.remote_control).into();
    let client = match config.remote_control.connect_timeout_ms {
        Some(ms) => Client::with_connect_timeout(options, Duration::from_millis(ms)),
        None => Client::new(options),
    };

    client.on_error(|reason| warn!("remote control error: {}", reason));
    client.on_close(|| info!("remote control connection closed"));

    let checked = tokio::time::timeout(CHECK_TIMEOUT, check_connection(&client, &config)).await;

    client.disconnect();

    match checked {
        Ok(result) => result,
        Err(_) => anyhow::bail!("the check did not finish in {:?}", CHECK_TIMEOUT),
    }
}

async fn check_connection(client: &Client, config: &config::Config) -> Result<()> {
    if !client.connect().await {
        anyhow::bail!("could not connect to the streaming tool");
    }

    let scenes = client.get_scenes().await?;
    info!(count = scenes.len(), "scene list fetched");
    for scene in &scenes {
        debug!(id = %scene.id, name = %scene.name, "scene");
    }

    match client.active_scene().await? {
        Some(scene) => info!(scene = %scene.name, "active scene"),
        None => info!("no scene is active right now"),
    }

    let censor_scene = &config.censor.censor_scene;
    if client.find_scene(censor_scene, &scenes).await?.is_none() {
        anyhow::bail!("the censor scene {:?} does not exist on the remote", censor_scene);
    }
    info!(scene = %censor_scene, "censor scene is available");

    Ok(())
}
