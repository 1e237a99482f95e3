use std::path::Path;

use eduviz_worker::EngineConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = EngineConfig::from_env();

    println!("worker-selfcheck: starting with job_root={}", config.job_root);
    ensure_job_root(&config.job_root).await?;
    ensure_on_path("ffmpeg")?;
    ensure_on_path("ffprobe")?;
    ensure_on_path(&config.renderer.python_bin)?;
    ensure_env_present(&["GEMINI_API_KEY"])?;

    println!("worker-selfcheck: ok");
    Ok(())
}

async fn ensure_job_root<P: AsRef<Path>>(path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    tokio::fs::create_dir_all(path).await?;
    Ok(())
}

fn ensure_on_path(bin: &str) -> anyhow::Result<()> {
    which::which(bin).map_err(|e| anyhow::anyhow!("{} not on PATH: {}", bin, e))?;
    Ok(())
}

fn ensure_env_present(vars: &[&str]) -> anyhow::Result<()> {
    for var in vars {
        if std::env::var(var).is_err() {
            return Err(anyhow::anyhow!("missing required env var {}", var));
        }
    }
    Ok(())
}
