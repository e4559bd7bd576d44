use std::sync::Arc;

use autopost::infrastructure::{config, logging, media};
use autopost::{BrowserDriver, ChromiumDriver, EngineError, MediaSource, Post, PublishEngine};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::setup(!cfg!(debug_assertions));
    config::loader::ensure_config_dir()?;
    config::init();
    let app_config = config::app().clone();

    // Caption comes from the command line; tags are every following arg.
    let mut args = std::env::args().skip(1);
    let caption = args.next().unwrap_or_else(|| "New post".to_string());
    let tags: Vec<String> = args.collect();

    let driver: Arc<dyn BrowserDriver> = Arc::new(ChromiumDriver::new(
        app_config.browser.effective_profile_dir(),
        app_config.browser.headless,
        (
            app_config.browser.viewport_width,
            app_config.browser.viewport_height,
        ),
    ));
    driver.start().await?;

    let engine = PublishEngine::new(driver.clone(), app_config.clone());
    let post = Post::new(MediaSource::Directory(app_config.media.dir.clone()), caption)
        .with_tags(tags);
    tracing::info!(
        media_dir = ?app_config.media.dir,
        extensions = ?media::MEDIA_EXTENSIONS,
        "Publishing from media directory"
    );

    let result = tokio::select! {
        result = engine.publish(&post) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("Interrupted, shutting the browser down");
            driver.stop().await?;
            return Ok(());
        }
    };

    let exit = match result {
        Ok(report) => {
            tracing::info!(
                run_id = %report.run_id,
                session = ?report.session,
                submission = ?report.submission,
                "Run complete"
            );
            for (step, outcome) in &report.steps {
                tracing::info!(step = %step, outcome = ?outcome, "Step result");
            }
            if let Some(png) = report.review_image {
                let path = config::paths::config_dir().join(format!("review-{}.png", report.run_id));
                std::fs::write(&path, png)?;
                tracing::info!(path = ?path, "Review image written");
            }
            Ok(())
        }
        Err(e @ EngineError::MissingCredentials) => {
            tracing::error!("{e}. Add credentials to settings.yaml and retry.");
            Err(e.into())
        }
        Err(e) => {
            tracing::error!("Run failed: {e}");
            Err(e.into())
        }
    };

    driver.stop().await?;
    exit
}
