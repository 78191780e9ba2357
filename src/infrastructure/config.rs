use rand::distr::Alphanumeric;
use rand::Rng;
use std::iter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    #[serde(skip)]
    path: PathBuf,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_database_path")]
    pub database_path: String,
    #[serde(default = "default_create_database")]
    pub create_database: bool,
    #[serde(default = "default_secret")]
    pub secret: String,
    #[serde(default = "default_token_expiry_days")]
    pub token_expiry_days: i64,
    #[serde(default = "default_cover_path")]
    pub cover_path: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: hondana_home().join("config.yml"),
            base_url: None,
            port: default_port(),
            database_path: default_database_path(),
            create_database: default_create_database(),
            secret: default_secret(),
            token_expiry_days: default_token_expiry_days(),
            cover_path: default_cover_path(),
        }
    }
}

impl Config {
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Config, anyhow::Error> {
        let config_path = match path {
            Some(p) => PathBuf::from(p.as_ref()),
            None => hondana_home().join("config.yml"),
        };

        match std::fs::File::open(&config_path) {
            Ok(file) => {
                info!("Open config from {:?}", config_path);
                let mut cfg: Self = serde_yml::from_reader(file)?;
                cfg.path = config_path;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Config {
                    path: config_path,
                    ..Default::default()
                };
                cfg.save()?;
                info!("Write default config at {:?}", cfg.path);
                Ok(cfg)
            }
        }
    }

    fn save(&self) -> Result<(), anyhow::Error> {
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        std::fs::write(&self.path, serde_yml::to_string(self)?)?;

        Ok(())
    }
}

fn hondana_home() -> PathBuf {
    match std::env::var("HONDANA_HOME") {
        Ok(path) => PathBuf::from(path),
        Err(_) => dirs::home_dir()
            .expect("should have home")
            .join(".hondana"),
    }
}

fn default_port() -> u16 {
    8080
}

fn default_database_path() -> String {
    let path = hondana_home();
    if !path.exists() {
        let _ = std::fs::create_dir_all(&path);
    }
    path.join("hondana.db").display().to_string()
}

fn default_create_database() -> bool {
    true
}

fn default_secret() -> String {
    let mut rng = rand::rng();
    let chars: Vec<u8> = iter::repeat(())
        .map(|()| rng.sample(Alphanumeric))
        .take(16)
        .collect();
    String::from_utf8(chars).unwrap_or_default()
}

fn default_token_expiry_days() -> i64 {
    30
}

fn default_cover_path() -> String {
    let path = hondana_home().join("book-covers");
    if !path.exists() {
        let _ = std::fs::create_dir_all(&path);
    }
    path.display().to_string()
}
